// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end geometry for a single road: reconstruction, ST placement,
//! lane strips and boundary markings.

use approx::assert_relative_eq;
use roadnet_core::style::mask;
use roadnet_core::{BoundaryStyle, ControlPointRecord, ControlType, EngineConfig, MapPoint};
use roadnet_geometry::{
    build_lane_mesh, classify_width, parallel_samples, BoundaryRasterizer, CurveInput, CurveReconstructor,
    LocateOptions, Point3, Side, StResolver, WidthTrend,
};

fn control(x: f64, y: f64) -> ControlPointRecord {
    ControlPointRecord { x, y, z: 0.0, hdg: 0.0 }
}

#[test]
fn length_is_invariant_under_reversal() {
    let config = EngineConfig::default();
    let forward = vec![control(0.0, 0.0), control(30.0, 8.0), control(60.0, 5.0), control(95.0, -12.0)];
    let backward: Vec<ControlPointRecord> = forward.iter().rev().cloned().collect();
    let reconstructor = CurveReconstructor::new(&config);
    let a = reconstructor
        .reconstruct(CurveInput::ControlPoints {
            points: &forward,
            control_type: ControlType::Bezier,
        })
        .unwrap();
    let b = reconstructor
        .reconstruct(CurveInput::ControlPoints {
            points: &backward,
            control_type: ControlType::Bezier,
        })
        .unwrap();
    assert_relative_eq!(a.length, b.length, epsilon = 2e-3);
}

#[test]
fn st_round_trip_on_reconstructed_road() {
    let config = EngineConfig::default();
    let samples: Vec<MapPoint> = (0..=10)
        .map(|i| {
            let x = i as f64 * 12.0;
            MapPoint::new(x, 6.0 * (x / 40.0).sin(), 0.0)
        })
        .collect();
    let road = CurveReconstructor::new(&config)
        .reconstruct(CurveInput::Samples(&samples))
        .unwrap();
    let resolver = StResolver::new(&road.curve);
    for &(s, t) in &[(5.0, 1.5), (33.0, -3.0), (64.5, 2.25), (110.0, -0.75)] {
        let location = resolver.locate(s, t, LocateOptions::default());
        let back = resolver.project(&location.target_point);
        assert_relative_eq!(back.s, s, epsilon = 1e-3);
        assert_relative_eq!(back.t, t, epsilon = 1e-3);
    }
}

#[test]
fn lane_strip_between_parallel_boundaries() {
    let config = EngineConfig::default();
    let samples = [MapPoint::new(0.0, 0.0, 0.0), MapPoint::new(80.0, 0.0, 0.0)];
    let road = CurveReconstructor::new(&config)
        .reconstruct(CurveInput::Samples(&samples))
        .unwrap();

    // first forward lane: between the reference line and 3.5 m to the right
    let inner = parallel_samples(&road.curve, 0.0, Side::Right, 0.0..=1.0, 30, None);
    let outer = parallel_samples(&road.curve, 3.5, Side::Right, 0.0..=1.0, 30, None);
    let mesh = build_lane_mesh(&inner, &outer).unwrap();
    assert_eq!(mesh.triangle_count(), 2 * 30);
    for i in 0..mesh.triangle_count() {
        assert!(mesh.face_normal(i).unwrap().y > 0.0);
    }

    let width = classify_width(&inner, &outer, config.transition_deviation).unwrap();
    assert_eq!(width.trend, WidthTrend::Uniform);
    assert_relative_eq!(width.normal_width, 3.5, epsilon = 1e-3);

    let style = BoundaryStyle::from_mask(mask::SINGLE_DASH_WHITE);
    let lines = BoundaryRasterizer::new(&config).rasterize(&outer, &style).unwrap();
    let dashed = lines.first.unwrap();
    // 80 m at 4 m on / 6 m off
    assert_relative_eq!(dashed.painted_length(), 32.0, epsilon = 1e-6);
    let all_points: Vec<Point3<f64>> = dashed
        .mesh
        .positions
        .chunks_exact(3)
        .map(|c| Point3::new(c[0] as f64, c[1] as f64, c[2] as f64))
        .collect();
    assert!(all_points.iter().all(|p| (p.x + 3.5).abs() < 0.1));
}
