//! Core value types for the driving simulation.
//!
//! Defines 2D vectors, control actions, held-key state, and the vehicle
//! pose used throughout the environment, agent, and scheduler.

use std::fmt;
use std::ops::{Add, Mul};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 2D point or direction in arena coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// Creates a new vector.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Origin (0, 0).
    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Unit forward vector for a heading angle.
    ///
    /// Heading is measured from the +y axis, so `(sin θ, cos θ)`.
    pub fn from_heading(heading: f64) -> Self {
        Self {
            x: heading.sin(),
            y: heading.cos(),
        }
    }

    /// The left-perpendicular of this vector: `(-y, x)`.
    pub fn perp_left(&self) -> Self {
        Self {
            x: -self.y,
            y: self.x,
        }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Vec2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// A discrete vehicle control.
///
/// The action space is fixed at four controls; invalid numeric action ids
/// from untyped callers are filtered out by [`Action::from_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Action {
    Accelerate,
    Brake,
    TurnLeft,
    TurnRight,
}

impl Action {
    /// Number of possible actions.
    pub const COUNT: usize = 4;

    /// All actions in index order.
    pub fn all() -> [Action; Self::COUNT] {
        [
            Action::Accelerate,
            Action::Brake,
            Action::TurnLeft,
            Action::TurnRight,
        ]
    }

    /// Returns the index of this action (0=Accelerate, 1=Brake, 2=TurnLeft, 3=TurnRight).
    pub fn index(&self) -> usize {
        match self {
            Action::Accelerate => 0,
            Action::Brake => 1,
            Action::TurnLeft => 2,
            Action::TurnRight => 3,
        }
    }

    /// Maps a numeric action id back to an action.
    ///
    /// Returns `None` for unknown ids; callers are expected to ignore those
    /// rather than fail.
    pub fn from_index(index: usize) -> Option<Action> {
        Self::all().get(index).copied()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Accelerate => write!(f, "accelerate"),
            Action::Brake => write!(f, "brake"),
            Action::TurnLeft => write!(f, "turn_left"),
            Action::TurnRight => write!(f, "turn_right"),
        }
    }
}

/// Currently-held control flags.
///
/// In manual mode these mirror the externally supplied key-hold state; in
/// training the environment sets exactly one flag for a single physics step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyState {
    pub accelerate: bool,
    pub brake: bool,
    pub turn_left: bool,
    pub turn_right: bool,
}

impl KeyState {
    /// Sets or clears the flag for one action.
    pub fn set(&mut self, action: Action, pressed: bool) {
        match action {
            Action::Accelerate => self.accelerate = pressed,
            Action::Brake => self.brake = pressed,
            Action::TurnLeft => self.turn_left = pressed,
            Action::TurnRight => self.turn_right = pressed,
        }
    }

    /// Clears all flags.
    pub fn clear(&mut self) {
        *self = KeyState::default();
    }
}

/// Kinematic state of the vehicle.
///
/// Mutated only by the environment's physics step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Position in arena coordinates.
    pub position: Vec2,
    /// Heading angle in radians, measured from the +y axis.
    pub heading: f64,
    /// Forward speed (negative when reversing).
    pub speed: f64,
    /// Lateral drift speed along the left-perpendicular of the heading.
    pub lateral_speed: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec2_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn heading_vector_is_unit() {
        for theta in [0.0, 0.7, std::f64::consts::FRAC_PI_2, 3.1] {
            let v = Vec2::from_heading(theta);
            let len = (v.x * v.x + v.y * v.y).sqrt();
            assert!((len - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn heading_zero_points_along_y() {
        let v = Vec2::from_heading(0.0);
        assert!(v.x.abs() < 1e-12);
        assert!((v.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn perp_left_rotates_ccw() {
        let v = Vec2::new(1.0, 0.0).perp_left();
        assert!((v.x - 0.0).abs() < 1e-12);
        assert!((v.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn action_index_round_trip() {
        for action in Action::all() {
            assert_eq!(Action::from_index(action.index()), Some(action));
        }
    }

    #[test]
    fn action_unknown_index_is_none() {
        assert_eq!(Action::from_index(4), None);
        assert_eq!(Action::from_index(usize::MAX), None);
    }

    #[test]
    fn key_state_set_and_clear() {
        let mut keys = KeyState::default();
        keys.set(Action::Accelerate, true);
        keys.set(Action::TurnLeft, true);
        assert!(keys.accelerate);
        assert!(keys.turn_left);
        assert!(!keys.brake);

        keys.set(Action::Accelerate, false);
        assert!(!keys.accelerate);

        keys.clear();
        assert_eq!(keys, KeyState::default());
    }
}
