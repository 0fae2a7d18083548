// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine configuration with environment overrides.

use std::str::FromStr;

/// Catmull-Rom parametrisation used for centerlines and elevation curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurveKind {
    /// Knot spacing by the square root of chord length
    #[default]
    Centripetal,
    /// Knot spacing by chord length
    Chordal,
    /// Uniform knots with an explicit tension
    CatmullRom,
}

impl FromStr for CurveKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "centripetal" => Ok(Self::Centripetal),
            "chordal" => Ok(Self::Chordal),
            "catmullrom" | "uniform" => Ok(Self::CatmullRom),
            _ => Err(()),
        }
    }
}

/// Tunable constants of the reconstruction engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Spline parametrisation for reconstructed curves.
    pub curve_kind: CurveKind,
    /// Tension, only used by [`CurveKind::CatmullRom`].
    pub spline_tension: f64,
    /// Decimals kept when rounding control points before deduplication.
    pub dedup_decimals: u32,
    /// Angular sampling step of reconstructed arcs, in degrees.
    pub arc_step_degrees: f64,
    /// Width of a painted boundary line.
    pub mark_width: f64,
    /// Distance from the boundary to each line of a double boundary.
    pub mark_offset: f64,
    /// Length of a painted dash.
    pub mark_unit_length: f64,
    /// Gap between two dashes.
    pub mark_gap_length: f64,
    /// Head/tail width difference above which a lane counts as a transition.
    pub transition_deviation: f64,
    /// Distance tolerance against a pole shaft radius.
    pub mount_vertical_tolerance: f64,
    /// Distance tolerance against a pole arm radius.
    pub mount_arm_tolerance: f64,
    /// Yaw tolerance for mount matching, in degrees.
    pub mount_angle_tolerance: f64,
    /// Fixed structural bias between an object's facing and its pole, in degrees.
    pub mount_bias_degrees: f64,
    /// Samples per Bézier edge of a junction polygon.
    pub junction_edge_segments: usize,
    /// Control point distance of junction edges as a ratio of the chord.
    pub junction_control_ratio: f64,
    /// Samples per generated lane-link curve.
    pub lane_link_segments: usize,
    /// Number of worker threads for geometry jobs.
    pub worker_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            curve_kind: CurveKind::Centripetal,
            spline_tension: 0.32,
            dedup_decimals: 4,
            arc_step_degrees: 2.0,
            mark_width: 0.15,
            mark_offset: 0.1,
            mark_unit_length: 4.0,
            mark_gap_length: 6.0,
            transition_deviation: 0.5,
            mount_vertical_tolerance: 0.2,
            mount_arm_tolerance: 1.0,
            mount_angle_tolerance: 15.0,
            mount_bias_degrees: 90.0,
            junction_edge_segments: 30,
            junction_control_ratio: 0.5,
            lane_link_segments: 20,
            worker_threads: num_cpus::get(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl EngineConfig {
    /// Load configuration from `ROADNET_*` environment variables,
    /// falling back to the built-in defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            curve_kind: env_or("ROADNET_CURVE_KIND", d.curve_kind),
            spline_tension: env_or("ROADNET_SPLINE_TENSION", d.spline_tension),
            dedup_decimals: env_or("ROADNET_DEDUP_DECIMALS", d.dedup_decimals),
            arc_step_degrees: env_or("ROADNET_ARC_STEP_DEGREES", d.arc_step_degrees),
            mark_width: env_or("ROADNET_MARK_WIDTH", d.mark_width),
            mark_offset: env_or("ROADNET_MARK_OFFSET", d.mark_offset),
            mark_unit_length: env_or("ROADNET_MARK_UNIT_LENGTH", d.mark_unit_length),
            mark_gap_length: env_or("ROADNET_MARK_GAP_LENGTH", d.mark_gap_length),
            transition_deviation: env_or("ROADNET_TRANSITION_DEVIATION", d.transition_deviation),
            mount_vertical_tolerance: env_or(
                "ROADNET_MOUNT_VERTICAL_TOLERANCE",
                d.mount_vertical_tolerance,
            ),
            mount_arm_tolerance: env_or("ROADNET_MOUNT_ARM_TOLERANCE", d.mount_arm_tolerance),
            mount_angle_tolerance: env_or("ROADNET_MOUNT_ANGLE_TOLERANCE", d.mount_angle_tolerance),
            mount_bias_degrees: env_or("ROADNET_MOUNT_BIAS_DEGREES", d.mount_bias_degrees),
            junction_edge_segments: env_or("ROADNET_JUNCTION_EDGE_SEGMENTS", d.junction_edge_segments),
            junction_control_ratio: env_or("ROADNET_JUNCTION_CONTROL_RATIO", d.junction_control_ratio),
            lane_link_segments: env_or("ROADNET_LANE_LINK_SEGMENTS", d.lane_link_segments),
            worker_threads: env_or("ROADNET_WORKER_THREADS", d.worker_threads).max(1),
        }
    }

    /// Configuration with a fixed thread count, handy for deterministic tests.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_kind_parse() {
        assert_eq!("Centripetal".parse::<CurveKind>(), Ok(CurveKind::Centripetal));
        assert_eq!("catmullrom".parse::<CurveKind>(), Ok(CurveKind::CatmullRom));
        assert!("bezier".parse::<CurveKind>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.curve_kind, CurveKind::Centripetal);
        assert_eq!(config.dedup_decimals, 4);
        assert!(config.worker_threads >= 1);
        assert_eq!(config.with_worker_threads(0).worker_threads, 1);
    }

    #[test]
    fn test_env_override_falls_back_on_garbage() {
        assert_eq!(env_or("ROADNET_TEST_UNSET_VARIABLE", 7usize), 7);
    }
}
