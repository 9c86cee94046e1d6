//! The driving environment.
//!
//! A deterministic (given inputs and elapsed time) 2D kinematic simulation:
//! the vehicle accelerates, brakes, and steers inside a walled arena, five
//! distance sensors ray-cast against the walls, and a shaped reward guides
//! the agent toward the goal region.

use std::f64::consts::{FRAC_PI_2, PI};
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::EnvConfig;
use crate::geometry::{ray_segment_intersection, Wall};
use crate::types::{Action, KeyState, Pose, Vec2};

/// Cumulative-reward penalty applied when a candidate move is rejected
/// against a wall. Side channel only; not part of the step reward.
const WALL_SCRAPE_PENALTY: f64 = 0.5;

/// Immutable view of the environment after a step.
///
/// This is both the RL state fed to the agent and the view-model handed to
/// rendering collaborators. Consumers receive a copy and must never assume
/// it stays in sync with the live simulation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateSnapshot {
    /// Vehicle position in arena coordinates.
    pub position: Vec2,
    /// Heading angle in radians.
    pub rotation: f64,
    /// Normalized sensor distances in [0, 1]; 1 means nothing in range.
    pub sensors: [f64; EnvConfig::SENSOR_COUNT],
    /// Forward speed.
    pub velocity: f64,
    /// Lateral drift speed.
    pub lateral_velocity: f64,
    /// Whether the goal has been reached this episode.
    pub goal_reached: bool,
    /// Whether the episode ended in a wall collision.
    pub collision: bool,
}

/// Result of a single physics/learning step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Snapshot after the step.
    pub next_state: StateSnapshot,
    /// Scalar reward for this transition.
    pub reward: f64,
    /// Whether the episode has terminated.
    pub done: bool,
}

/// The 2D driving environment.
///
/// Owns the arena geometry, the vehicle pose, the sensor array, and the
/// reward computation. Knows nothing about learning or scheduling.
///
/// # Lifecycle
///
/// 1. Create with [`Environment::new`].
/// 2. Call [`Environment::reset`] at each episode start.
/// 3. Drive with [`Environment::set_key_state`] + [`Environment::update_physics`]
///    (manual control) or [`Environment::step`] (one action per step).
/// 4. Once a step reports `done`, further updates are no-ops until reset.
#[derive(Debug)]
pub struct Environment {
    config: EnvConfig,
    walls: [Wall; 4],
    pose: Pose,
    keys: KeyState,
    sensors: [f64; EnvConfig::SENSOR_COUNT],
    terminated: bool,
    goal_reached: bool,
    collision: bool,
    total_reward: f64,
    learning_rate: f64,
    gamma: f64,
    last_update: Instant,
}

impl Environment {
    /// Creates a new environment and resets it to the canonical start pose.
    pub fn new(config: EnvConfig) -> Self {
        let walls = Wall::arena(config.arena_half_extent);
        let mut env = Self {
            learning_rate: config.learning_rate,
            gamma: config.gamma,
            walls,
            pose: Pose {
                position: Vec2::origin(),
                heading: FRAC_PI_2,
                speed: 0.0,
                lateral_speed: 0.0,
            },
            keys: KeyState::default(),
            sensors: [0.0; EnvConfig::SENSOR_COUNT],
            terminated: false,
            goal_reached: false,
            collision: false,
            total_reward: 0.0,
            last_update: Instant::now(),
            config,
        };
        env.reset();
        env
    }

    /// Updates the learning hyperparameters used by the reward shaping.
    ///
    /// The shaping reads these live, so changing them mid-episode changes
    /// reward semantics within that episode.
    pub fn set_parameters(&mut self, learning_rate: f64, gamma: f64) {
        self.learning_rate = learning_rate;
        self.gamma = gamma;
    }

    /// Re-centers the vehicle at the origin facing the canonical direction,
    /// clears all flags and the cumulative reward, and recomputes sensors.
    pub fn reset(&mut self) -> StateSnapshot {
        self.pose = Pose {
            position: Vec2::origin(),
            heading: FRAC_PI_2,
            speed: 0.0,
            lateral_speed: 0.0,
        };
        self.keys.clear();
        self.terminated = false;
        self.goal_reached = false;
        self.collision = false;
        self.total_reward = 0.0;
        self.last_update = Instant::now();
        self.update_sensors();
        self.state()
    }

    /// Sets or clears one held-control flag.
    pub fn set_key_state(&mut self, action: Action, pressed: bool) {
        self.keys.set(action, pressed);
    }

    /// Index-based variant for untyped callers; unknown ids are ignored.
    pub fn set_key_state_index(&mut self, index: usize, pressed: bool) {
        if let Some(action) = Action::from_index(index) {
            self.keys.set(action, pressed);
        }
    }

    /// Advances the simulation by the wall-clock time elapsed since the
    /// previous update, capped to bound integration error after a pause.
    pub fn update_physics(&mut self) -> StepOutcome {
        let dt = self
            .last_update
            .elapsed()
            .as_secs_f64()
            .min(EnvConfig::MAX_STEP_SECONDS);
        self.last_update = Instant::now();
        self.advance(dt)
    }

    /// Presses one action for exactly a single physics step, then releases it.
    pub fn step(&mut self, action: Action) -> StepOutcome {
        self.keys.set(action, true);
        let outcome = self.update_physics();
        self.keys.set(action, false);
        outcome
    }

    /// Like [`Environment::step`] but with an explicit time delta.
    pub fn step_dt(&mut self, action: Action, dt: f64) -> StepOutcome {
        self.keys.set(action, true);
        let outcome = self.advance(dt);
        self.keys.set(action, false);
        outcome
    }

    /// Advances the simulation by an explicit time delta in seconds.
    ///
    /// Once terminated, returns the final snapshot with zero reward until
    /// the next [`Environment::reset`].
    pub fn advance(&mut self, dt: f64) -> StepOutcome {
        if self.terminated {
            return StepOutcome {
                next_state: self.state(),
                reward: 0.0,
                done: true,
            };
        }

        let collided = self.integrate(dt);
        self.update_sensors();

        let distance_to_goal = self.distance_to_goal();
        let reward = if collided {
            self.terminated = true;
            self.collision = true;
            -10.0 * (1.0 + self.learning_rate)
        } else if distance_to_goal < self.config.goal_radius {
            self.terminated = true;
            self.goal_reached = true;
            10.0 * (1.0 + self.gamma)
        } else {
            // Small step penalty offset by a distance-shaped bonus, both
            // coupled to the live hyperparameters.
            -0.1 * (1.0 - self.learning_rate / 2.0) + self.gamma / (distance_to_goal + 1.0)
        };
        self.total_reward += reward;

        StepOutcome {
            next_state: self.state(),
            reward,
            done: self.terminated,
        }
    }

    /// One kinematic integration step. Returns true when the candidate move
    /// was rejected against a wall.
    fn integrate(&mut self, dt: f64) -> bool {
        let norm = dt * EnvConfig::BASELINE_HZ;

        // Brake is evaluated after accelerate and overwrites it.
        let mut accel = 0.0;
        if self.keys.accelerate {
            accel = self.config.acceleration * norm;
        }
        if self.keys.brake {
            accel = -self.config.brake_strength * norm;
        }

        self.pose.speed += accel;
        self.pose.speed *= self.config.friction;

        // Snap to a full stop when coasting below the stop threshold.
        if self.pose.speed.abs() < EnvConfig::STOP_EPSILON && accel == 0.0 {
            self.pose.speed = 0.0;
        }

        self.pose.speed = self.pose.speed.clamp(
            -self.config.max_speed * EnvConfig::REVERSE_FRACTION,
            self.config.max_speed,
        );

        // Steering authority decreases with speed, bounded below.
        let speed_factor = (self.pose.speed / self.config.max_speed).abs();
        let turn_factor = self.config.min_turn_factor
            + (1.0 - self.config.min_turn_factor) * (1.0 - speed_factor * self.config.steering_factor);

        if self.pose.speed.abs() > EnvConfig::TURN_EPSILON {
            let drift_threshold = self.config.max_speed * EnvConfig::DRIFT_SPEED_FRACTION;
            if self.keys.turn_left {
                self.pose.heading += self.config.turn_speed * turn_factor * norm;
                if self.pose.speed.abs() > drift_threshold {
                    self.pose.lateral_speed = self.config.drift_factor * self.pose.speed;
                }
            } else if self.keys.turn_right {
                self.pose.heading -= self.config.turn_speed * turn_factor * norm;
                if self.pose.speed.abs() > drift_threshold {
                    self.pose.lateral_speed = -self.config.drift_factor * self.pose.speed;
                }
            } else {
                self.pose.lateral_speed *= self.config.drift_decay;
            }
        }

        let forward = Vec2::from_heading(self.pose.heading);
        let lateral = forward.perp_left();
        let candidate =
            self.pose.position + forward * self.pose.speed + lateral * self.pose.lateral_speed;

        let half_size = self.config.car_size / 2.0;
        let hit = self
            .walls
            .iter()
            .any(|wall| wall.distance_to_point(candidate) < half_size);

        if hit {
            // Reject the move entirely rather than bounce or slide.
            self.pose.speed = 0.0;
            self.pose.lateral_speed = 0.0;
            self.total_reward -= WALL_SCRAPE_PENALTY;
            true
        } else {
            self.pose.position = candidate;
            false
        }
    }

    /// Recomputes all sensor readings by ray casting against the walls.
    fn update_sensors(&mut self) {
        for (reading, offset) in self.sensors.iter_mut().zip(EnvConfig::SENSOR_ANGLES) {
            let direction = Vec2::from_heading(self.pose.heading + offset);
            let mut distance = self.config.sensor_range;
            for wall in &self.walls {
                if let Some(d) =
                    ray_segment_intersection(self.pose.position, direction, wall.start, wall.end)
                {
                    if d < distance {
                        distance = d;
                    }
                }
            }
            *reading = distance / self.config.sensor_range;
        }
    }

    /// Euclidean distance from the vehicle to the goal center.
    pub fn distance_to_goal(&self) -> f64 {
        self.pose.position.distance_to(&self.config.goal_position)
    }

    /// Current state snapshot.
    pub fn state(&self) -> StateSnapshot {
        StateSnapshot {
            position: self.pose.position,
            rotation: self.pose.heading,
            sensors: self.sensors,
            velocity: self.pose.speed,
            lateral_velocity: self.pose.lateral_speed,
            goal_reached: self.goal_reached,
            collision: self.collision,
        }
    }

    /// Vehicle position projected into 3D scene coordinates (x, 0, y).
    pub fn position_3d(&self) -> [f64; 3] {
        [self.pose.position.x, 0.0, self.pose.position.y]
    }

    /// Vehicle orientation as 3D Euler angles for rendering.
    pub fn rotation_3d(&self) -> [f64; 3] {
        [0.0, -self.pose.heading + PI, 0.0]
    }

    /// Cumulative reward since the last reset, including side-channel
    /// wall-scrape penalties.
    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    /// Whether the current episode has terminated.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Whether the goal was reached this episode.
    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    /// Environment configuration.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    fn make_env() -> Environment {
        Environment::new(EnvConfig::default())
    }

    #[test]
    fn reset_recenters_vehicle() {
        let mut env = make_env();
        let state = env.reset();
        assert_eq!(state.position, Vec2::origin());
        assert!((state.rotation - FRAC_PI_2).abs() < 1e-12);
        assert_eq!(state.velocity, 0.0);
        assert_eq!(state.lateral_velocity, 0.0);
        assert!(!state.goal_reached);
        assert!(!state.collision);
        // From the arena center, every ray exits the sensor range.
        for s in state.sensors {
            assert!((s - 1.0).abs() < 1e-12);
        }
        assert_eq!(env.total_reward(), 0.0);
    }

    #[test]
    fn speed_stays_within_bounds_for_all_key_combos() {
        let cfg = EnvConfig::default();
        let lower = -cfg.max_speed * EnvConfig::REVERSE_FRACTION;
        for mask in 0u32..16 {
            let mut env = make_env();
            for (bit, action) in Action::all().into_iter().enumerate() {
                env.set_key_state(action, mask & (1 << bit) != 0);
            }
            for _ in 0..300 {
                let outcome = env.advance(EnvConfig::MAX_STEP_SECONDS);
                let v = outcome.next_state.velocity;
                assert!(v <= cfg.max_speed + 1e-12, "mask {mask}: v={v}");
                assert!(v >= lower - 1e-12, "mask {mask}: v={v}");
                if outcome.done {
                    break;
                }
            }
        }
    }

    #[test]
    fn acceleration_friction_recurrence() {
        let cfg = EnvConfig::default();
        let mut env = make_env();
        env.set_key_state(Action::Accelerate, true);

        let norm = DT * EnvConfig::BASELINE_HZ;
        let mut expected = 0.0_f64;
        for _ in 0..20 {
            let outcome = env.advance(DT);
            expected = (expected + cfg.acceleration * norm) * cfg.friction;
            expected = expected.min(cfg.max_speed);
            assert!(
                (outcome.next_state.velocity - expected).abs() < 1e-9,
                "got {}, expected {}",
                outcome.next_state.velocity,
                expected
            );
        }
    }

    #[test]
    fn brake_overrides_acceleration() {
        let mut env = make_env();
        env.set_key_state(Action::Accelerate, true);
        env.set_key_state(Action::Brake, true);
        let outcome = env.advance(DT);
        // Braking from standstill pushes the vehicle into reverse.
        assert!(outcome.next_state.velocity < 0.0);
    }

    #[test]
    fn coasting_snaps_to_zero() {
        let mut env = make_env();
        env.pose.speed = 0.0009;
        let outcome = env.advance(DT);
        assert_eq!(outcome.next_state.velocity, 0.0);
    }

    #[test]
    fn collision_rejection_is_exact() {
        let mut env = make_env();
        env.pose.position = Vec2::new(9.3, 0.0);
        env.pose.speed = 0.2;
        // Heading π/2 points along +x, straight into the east wall.
        let outcome = env.advance(DT);
        assert!(outcome.done);
        assert!(outcome.next_state.collision);
        assert_eq!(outcome.next_state.position, Vec2::new(9.3, 0.0));
        assert_eq!(outcome.next_state.velocity, 0.0);
        assert_eq!(outcome.next_state.lateral_velocity, 0.0);
        assert!((outcome.reward - (-11.0)).abs() < 1e-12); // -10 * (1 + 0.1)
    }

    #[test]
    fn collision_penalty_grows_with_learning_rate() {
        let mut rewards = Vec::new();
        for lr in [0.1, 0.9] {
            let mut env = make_env();
            env.set_parameters(lr, 0.9);
            env.pose.position = Vec2::new(9.3, 0.0);
            env.pose.speed = 0.2;
            rewards.push(env.advance(DT).reward);
        }
        assert!(rewards[0] < 0.0);
        assert!(rewards[1] < rewards[0]);
    }

    #[test]
    fn goal_reward_grows_with_gamma() {
        let mut rewards = Vec::new();
        for gamma in [0.5, 0.9] {
            let mut env = make_env();
            env.set_parameters(0.1, gamma);
            env.pose.position = Vec2::new(7.0, 7.0); // within goal radius
            let outcome = env.advance(DT);
            assert!(outcome.done);
            assert!(outcome.next_state.goal_reached);
            rewards.push(outcome.reward);
        }
        assert!(rewards[0] > 0.0);
        assert!(rewards[1] > rewards[0]);
        assert!((rewards[1] - 19.0).abs() < 1e-12); // 10 * (1 + 0.9)
    }

    #[test]
    fn terminated_updates_are_idempotent() {
        let mut env = make_env();
        env.pose.position = Vec2::new(9.3, 0.0);
        env.pose.speed = 0.2;
        assert!(env.advance(DT).done);

        let before = env.state();
        for _ in 0..5 {
            let outcome = env.advance(DT);
            assert!(outcome.done);
            assert_eq!(outcome.reward, 0.0);
            assert_eq!(outcome.next_state, before);
        }
    }

    #[test]
    fn step_reward_is_shaped_by_goal_distance() {
        let mut env = make_env();
        let far = env.step_dt(Action::Accelerate, DT).reward;

        let mut near = make_env();
        near.pose.position = Vec2::new(5.0, 5.0); // closer, outside the radius
        let near_reward = near.step_dt(Action::Accelerate, DT).reward;
        assert!(near_reward > far);
    }

    #[test]
    fn sensors_read_normalized_wall_distance() {
        let mut env = make_env();
        env.pose.position = Vec2::new(0.0, 5.0);
        env.pose.heading = 0.0; // facing +y, wall 5 units ahead
        env.update_sensors();
        let s = env.state().sensors;
        assert!((s[2] - 0.5).abs() < 1e-9);
        // Symmetric offsets see the same wall at the same slant distance.
        assert!((s[0] - s[4]).abs() < 1e-9);
        assert!((s[1] - s[3]).abs() < 1e-9);
        assert!(s[1] > s[2] && s[0] > s[1]);
    }

    #[test]
    fn step_presses_key_for_exactly_one_update() {
        let mut env = make_env();
        let outcome = env.step_dt(Action::Accelerate, DT);
        assert!(outcome.next_state.velocity > 0.0);
        // Key released after the step: coasting only from here on.
        let keys = env.keys;
        assert_eq!(keys, KeyState::default());
    }

    #[test]
    fn unknown_action_index_is_ignored() {
        let mut env = make_env();
        env.set_key_state_index(17, true);
        assert_eq!(env.keys, KeyState::default());
        env.set_key_state_index(0, true);
        assert!(env.keys.accelerate);
    }

    #[test]
    fn wall_scrape_penalty_hits_cumulative_counter() {
        let mut env = make_env();
        env.pose.position = Vec2::new(9.3, 0.0);
        env.pose.speed = 0.2;
        let outcome = env.advance(DT);
        // Total reward carries both the step reward and the side penalty.
        assert!((env.total_reward() - (outcome.reward - 0.5)).abs() < 1e-12);
    }

    #[test]
    fn stale_clock_is_capped_to_one_bounded_step() {
        use std::time::Duration;

        let mut env = make_env();
        env.set_key_state(Action::Accelerate, true);
        // Pretend the last update happened long ago, as after a pause.
        env.last_update = Instant::now() - Duration::from_secs(5);
        let outcome = env.update_physics();

        // The elapsed time is capped, so this is one MAX_STEP_SECONDS step,
        // not five seconds of accumulated acceleration.
        let cfg = EnvConfig::default();
        let norm = EnvConfig::MAX_STEP_SECONDS * EnvConfig::BASELINE_HZ;
        let expected = (cfg.acceleration * norm * cfg.friction).min(cfg.max_speed);
        assert!((outcome.next_state.velocity - expected).abs() < 1e-9);
        assert!(
            outcome.next_state.position.distance_to(&Vec2::origin()) <= cfg.max_speed + 1e-9
        );
    }

    #[test]
    fn render_projections_match_pose() {
        let mut env = make_env();
        env.pose.position = Vec2::new(2.0, -3.0);
        env.pose.heading = 1.0;
        assert_eq!(env.position_3d(), [2.0, 0.0, -3.0]);
        let rot = env.rotation_3d();
        assert!((rot[1] - (PI - 1.0)).abs() < 1e-12);
    }

    #[cfg(feature = "serde")]
    mod serde_tests {
        use super::*;

        #[test]
        fn snapshot_serialize_deserialize_roundtrip() {
            let mut env = make_env();
            env.set_key_state(Action::Accelerate, true);
            let state = env.advance(DT).next_state;

            let json = serde_json::to_string(&state).unwrap();
            let restored: StateSnapshot = serde_json::from_str(&json).unwrap();
            assert_eq!(restored, state);
        }

        #[test]
        fn snapshot_json_format() {
            let json = serde_json::to_string_pretty(&make_env().reset()).unwrap();
            assert!(json.contains("\"position\""));
            assert!(json.contains("\"sensors\""));
            assert!(json.contains("\"velocity\""));
            assert!(json.contains("\"goal_reached\""));
        }
    }
}
