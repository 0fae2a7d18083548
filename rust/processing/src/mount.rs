// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mount point resolution.
//!
//! Devices (signs, lights, sensors) are stored in the map as ST placements.
//! To rebuild the scene each one has to be attached to a pole, either the pole
//! named in its userdata or the best-fitting pole standing on the same road or
//! junction, and expressed in that pole's local frame.
//!
//! Every candidate pole is evaluated independently and ranked; the best
//! ranked, lowest scoring candidate wins, so the result does not depend on
//! candidate order.
//!
//! Angles follow the world convention: the heading of a ground direction is
//! measured from +z towards +x. Objects on a pole face 90° away from the pole
//! itself (the structural bias).

use nalgebra::Vector3;
use roadnet_core::{degree_delta, normalize_degrees, round_to, EngineConfig};
use roadnet_geometry::frame::{unit_or, world_angle_deg};
use roadnet_geometry::{LocateOptions, StLocation, StResolver};

use crate::keys::PoleKey;
use crate::model::{Anchor, MountPlacement, Pole};
use crate::poles::PoleIndex;
use crate::repository::MapRepository;
use crate::{Error, Result};

/// An object waiting for a pole.
#[derive(Debug, Clone, Copy)]
pub struct MountRequest<'a> {
    pub object: &'a str,
    pub s: f64,
    pub t: f64,
    /// Degrees, relative to the reference tangent.
    pub yaw: f64,
    /// Height on the vertical shaft.
    pub z_offset: f64,
    pub target_pole: Option<&'a str>,
}

/// Side of a horizontal arm, named after the object's local angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmSide {
    /// Local angle 0°.
    Left,
    /// Local angle 180°.
    Right,
}

impl ArmSide {
    pub fn local_angle(self) -> f64 {
        match self {
            ArmSide::Left => 0.0,
            ArmSide::Right => 180.0,
        }
    }
}

/// Part of the pole an object hangs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountPart {
    Vertical,
    Arm(ArmSide),
}

/// Quality of a candidate, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    /// Distance and orientation both within tolerance.
    Exact,
    /// On the shaft by distance, orientation off.
    Backup,
    /// Explicitly targeted pole that matched nothing; placed on its shaft.
    Fallback,
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'p> {
    pole: &'p Pole,
    part: MountPart,
    rank: Rank,
    /// Sum of tolerance-normalized deviations, lower is better.
    score: f64,
}

/// Ground offset from a pole to a point, split along and across the pole's
/// facing direction.
#[derive(Debug, Clone, Copy)]
struct PoleOffset {
    vector: Vector3<f64>,
    along: f64,
    across: f64,
}

impl PoleOffset {
    fn new(pole: &Pole, location: &StLocation) -> Self {
        let target = location.target_point;
        let vector = Vector3::new(target.x - pole.position.x, 0.0, target.z - pole.position.z);
        let facing = unit_or(pole.facing(), Vector3::z());
        let along = vector.dot(&facing);
        let across = (vector - facing * along).norm();
        Self { vector, along, across }
    }
}

/// Matches ST-placed devices to poles.
#[derive(Debug, Clone, Copy)]
pub struct MountPointResolver<'a> {
    config: &'a EngineConfig,
    repository: &'a MapRepository,
    index: &'a PoleIndex,
}

impl<'a> MountPointResolver<'a> {
    pub fn new(config: &'a EngineConfig, repository: &'a MapRepository, index: &'a PoleIndex) -> Self {
        Self {
            config,
            repository,
            index,
        }
    }

    /// Find the pole for `request` and its local placement.
    ///
    /// `reference` is the line the request's ST coordinates refer to (the
    /// road or lane link of `anchor`).
    pub fn resolve(&self, reference: &StResolver<'_>, anchor: &Anchor, request: &MountRequest<'_>) -> Result<MountPlacement> {
        let location = reference.locate(request.s, request.t, LocateOptions::default());
        let targeted = request.target_pole.is_some();

        let keys: Vec<PoleKey> = match request.target_pole {
            Some(id) => vec![self
                .repository
                .pole_key(id)
                .ok_or_else(|| Error::UnknownPole(id.to_string()))?],
            None => self.index.candidates(anchor).to_vec(),
        };

        let best = keys
            .iter()
            .filter_map(|key| self.repository.get_pole(*key))
            .filter_map(|pole| self.evaluate(pole, &location, request.yaw, targeted))
            .min_by(|a, b| a.rank.cmp(&b.rank).then(a.score.total_cmp(&b.score)))
            .ok_or_else(|| Error::NoMatchingPole {
                object: request.object.to_string(),
            })?;

        if best.rank != Rank::Exact {
            tracing::debug!(
                object = request.object,
                pole = %best.pole.id,
                rank = ?best.rank,
                "mounting on fallback candidate"
            );
        }
        Ok(self.local_frame(best.pole, best.part, &location, request))
    }

    fn evaluate<'p>(&self, pole: &'p Pole, location: &StLocation, yaw: f64, targeted: bool) -> Option<Candidate<'p>> {
        let config = self.config;
        let structure = &pole.structure;
        let tangent_deg = world_angle_deg(&location.tangent);
        let offset = PoleOffset::new(pole, location);
        let candidate = |part, rank, score| Candidate {
            pole,
            part,
            rank,
            score,
        };

        // shaft test: distance to the axis against the shaft radius, and the
        // bearing from the pole against the object's yaw
        let distance = offset.vector.norm();
        let bearing = normalize_degrees(world_angle_deg(&offset.vector) - tangent_deg);
        let shaft_dev = (distance - structure.shaft_radius).abs() / config.mount_vertical_tolerance;
        let yaw_dev = degree_delta(bearing, yaw) / config.mount_angle_tolerance;
        let on_shaft = shaft_dev <= 1.0;

        let Some(arm) = structure.arm else {
            if targeted {
                return Some(candidate(MountPart::Vertical, Rank::Exact, 0.0));
            }
            if !on_shaft {
                return None;
            }
            return Some(if yaw_dev <= 1.0 {
                candidate(MountPart::Vertical, Rank::Exact, shaft_dev + yaw_dev)
            } else {
                candidate(MountPart::Vertical, Rank::Backup, shaft_dev)
            });
        };

        if on_shaft {
            return Some(candidate(MountPart::Vertical, Rank::Exact, shaft_dev));
        }

        let arm_dev = (offset.across - arm.radius).abs() / config.mount_arm_tolerance;
        if arm_dev <= 1.0 {
            let object_angle = normalize_degrees(tangent_deg + yaw);
            let arm_match = [ArmSide::Left, ArmSide::Right]
                .into_iter()
                .map(|side| {
                    let expected = pole.angle() + config.mount_bias_degrees + side.local_angle();
                    (side, degree_delta(object_angle, expected) / config.mount_angle_tolerance)
                })
                .filter(|(_, dev)| *dev <= 1.0)
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((side, angle_dev)) = arm_match {
                return Some(candidate(MountPart::Arm(side), Rank::Exact, arm_dev + angle_dev));
            }
        }

        targeted.then(|| candidate(MountPart::Vertical, Rank::Fallback, f64::MAX))
    }

    fn local_frame(&self, pole: &Pole, part: MountPart, location: &StLocation, request: &MountRequest<'_>) -> MountPlacement {
        let structure = &pole.structure;
        match (part, structure.arm) {
            (MountPart::Arm(side), Some(arm)) => {
                let offset = PoleOffset::new(pole, location);
                let x = match side {
                    ArmSide::Left => arm.radius,
                    ArmSide::Right => -arm.radius,
                };
                MountPlacement {
                    pole_id: pole.id.clone(),
                    on_vertical_part: false,
                    // arm-mounted objects hang at arm height whatever their z offset
                    local_position: Vector3::new(x, structure.height - arm.radius, offset.along.abs()),
                    local_angle: side.local_angle(),
                }
            }
            _ => {
                let tangent_deg = world_angle_deg(&location.tangent);
                let angle = round_to(
                    normalize_degrees(tangent_deg + request.yaw - self.config.mount_bias_degrees - pole.angle()),
                    3,
                );
                let rad = -angle.to_radians();
                let r = structure.shaft_radius;
                MountPlacement {
                    pole_id: pole.id.clone(),
                    on_vertical_part: true,
                    local_position: Vector3::new(r * rad.cos(), request.z_offset, r * rad.sin()),
                    local_angle: angle,
                }
            }
        }
    }
}
