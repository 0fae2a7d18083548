// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hand-built roads shared by unit tests.

use nalgebra::Point3;
use roadnet_core::{BoundaryStyle, CurveKind, LaneType};
use roadnet_geometry::{BoundaryLines, Curve3, LocateOptions, StResolver};

use crate::model::{Boundary, Lane, Road, Section};

fn boundary_id(t: f64) -> String {
    format!("b{t}")
}

/// Straight single-section road from `start` to `end`. Each lane is
/// `(id, t_left, t_right)`; boundaries are shared between neighbours.
pub(crate) fn straight_road(id: &str, start: Point3<f64>, end: Point3<f64>, lanes: &[(&str, f64, f64)]) -> Road {
    let curve = Curve3::catmull_rom(vec![start, end], CurveKind::Centripetal, 0.5).unwrap();
    let length = curve.length();
    let resolver = StResolver::new(&curve);
    let along = |t: f64| -> Vec<Point3<f64>> {
        (0..=10)
            .map(|i| resolver.locate(length * i as f64 / 10.0, t, LocateOptions::default()).target_point)
            .collect()
    };

    let mut boundaries: Vec<Boundary> = Vec::new();
    let mut section_lanes = Vec::new();
    for &(lane_id, t_left, t_right) in lanes {
        for t in [t_left, t_right] {
            if boundaries.iter().all(|b| b.id != boundary_id(t)) {
                boundaries.push(Boundary {
                    id: boundary_id(t),
                    mark: 0,
                    style: BoundaryStyle::default(),
                    samples: along(t),
                    lines: BoundaryLines::default(),
                });
            }
        }
        section_lanes.push(Lane {
            id: lane_id.to_string(),
            lane_type: LaneType::Driving,
            left_boundary: boundary_id(t_left),
            right_boundary: boundary_id(t_right),
            speed_limit: 50.0,
            friction: LaneType::Driving.default_friction(),
            s_offset: 0.0,
            samples: along(0.5 * (t_left + t_right)),
            width: None,
            mesh: None,
        });
    }

    Road {
        id: id.to_string(),
        road_type: 0,
        declared_length: length,
        length,
        curve,
        elevation: None,
        arc: None,
        sections: vec![Section {
            id: "0".to_string(),
            start_percent: 0.0,
            end_percent: 1.0,
            length,
            lanes: section_lanes,
            boundaries,
        }],
        link_junctions: Vec::new(),
    }
}

/// Two-way road: lanes 1 on the left and -1, -2 on the right, 3.5 m each.
pub(crate) fn two_way_road(id: &str, start: Point3<f64>, end: Point3<f64>) -> Road {
    straight_road(id, start, end, &[("1", 3.5, 0.0), ("-1", 0.0, -3.5), ("-2", -3.5, -7.0)])
}
