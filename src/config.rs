//! Configuration for the driving environment and learning defaults.

use std::f64::consts::{FRAC_PI_4, FRAC_PI_8};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::Vec2;

/// Configuration for the driving environment.
///
/// Controls arena geometry, vehicle dynamics, sensing, and the initial
/// learning hyperparameters. All values have sensible defaults matching a
/// 20×20 arena with a goal in the upper-right corner.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvConfig {
    // --- Arena geometry ---
    /// Half-extent of the square arena; walls sit at ±`arena_half_extent`.
    pub arena_half_extent: f64,
    /// Center of the goal region.
    pub goal_position: Vec2,
    /// Goal radius; the episode ends when the vehicle is closer than this.
    pub goal_radius: f64,

    // --- Vehicle dynamics ---
    /// Maximum forward speed per step. Reverse is capped at half of this.
    pub max_speed: f64,
    /// Forward acceleration per normalized step while accelerating.
    pub acceleration: f64,
    /// Deceleration per normalized step while braking.
    pub brake_strength: f64,
    /// Base turn rate in radians per normalized step.
    pub turn_speed: f64,
    /// Multiplicative speed retention applied every step.
    pub friction: f64,
    /// Lower bound on the speed-dependent steering attenuation factor.
    pub min_turn_factor: f64,
    /// How strongly speed reduces steering authority.
    pub steering_factor: f64,
    /// Lateral drift speed as a fraction of forward speed when turning fast.
    pub drift_factor: f64,
    /// Multiplicative drift retention per step when not turning.
    pub drift_decay: f64,
    /// Collision diameter of the vehicle.
    pub car_size: f64,

    // --- Sensing ---
    /// Maximum ray length; readings are normalized against this.
    pub sensor_range: f64,

    // --- Learning hyperparameters (initial values) ---
    /// Q-learning step size, also coupled into the reward shaping.
    pub learning_rate: f64,
    /// Discount factor, also coupled into the reward shaping.
    pub gamma: f64,
}

impl EnvConfig {
    /// Number of distance sensors.
    pub const SENSOR_COUNT: usize = 5;

    /// Fixed sensor angular offsets relative to the heading, in radians.
    pub const SENSOR_ANGLES: [f64; Self::SENSOR_COUNT] =
        [-FRAC_PI_4, -FRAC_PI_8, 0.0, FRAC_PI_8, FRAC_PI_4];

    /// Upper bound on a single integration step, in seconds.
    ///
    /// Elapsed wall-clock time beyond this is discarded so a paused process
    /// cannot produce one huge physics step on resume.
    pub const MAX_STEP_SECONDS: f64 = 0.1;

    /// Reference tick rate; step deltas are normalized to this.
    pub const BASELINE_HZ: f64 = 60.0;

    /// Below this speed the vehicle snaps to a full stop when coasting.
    pub const STOP_EPSILON: f64 = 0.001;

    /// Minimum speed at which steering has any effect.
    pub const TURN_EPSILON: f64 = 1e-4;

    /// Fraction of `max_speed` above which turning induces lateral drift.
    pub const DRIFT_SPEED_FRACTION: f64 = 0.7;

    /// Reverse speed cap as a fraction of `max_speed`.
    pub const REVERSE_FRACTION: f64 = 0.5;
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            arena_half_extent: 10.0,
            goal_position: Vec2::new(8.0, 8.0),
            goal_radius: 2.0,
            max_speed: 0.25,
            acceleration: 0.02,
            brake_strength: 0.04,
            turn_speed: 0.05,
            friction: 0.98,
            min_turn_factor: 0.01,
            steering_factor: 0.7,
            drift_factor: 0.01,
            drift_decay: 0.9,
            car_size: 1.2,
            sensor_range: 10.0,
            learning_rate: 0.1,
            gamma: 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = EnvConfig::default();
        assert!(cfg.arena_half_extent > 0.0);
        assert!(cfg.goal_radius > 0.0);
        assert!(cfg.max_speed > 0.0);
        assert!(cfg.friction > 0.0 && cfg.friction < 1.0);
        assert!(cfg.learning_rate > 0.0 && cfg.learning_rate <= 1.0);
        assert!(cfg.gamma > 0.0 && cfg.gamma < 1.0);
    }

    #[test]
    fn sensor_angles_are_symmetric() {
        let angles = EnvConfig::SENSOR_ANGLES;
        assert_eq!(angles.len(), EnvConfig::SENSOR_COUNT);
        for i in 0..angles.len() {
            let mirrored = angles[angles.len() - 1 - i];
            assert!((angles[i] + mirrored).abs() < 1e-12);
        }
    }

    #[test]
    fn goal_lies_inside_arena() {
        let cfg = EnvConfig::default();
        assert!(cfg.goal_position.x.abs() < cfg.arena_half_extent);
        assert!(cfg.goal_position.y.abs() < cfg.arena_half_extent);
    }
}
