//! qdrive - Q-learning driving simulation
//!
//! A 2D point-vehicle driving environment with ray-cast wall sensors, a
//! tabular Q-learning agent, and a two-mode execution scheduler (manual
//! keyboard control or paced episodic training).

pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod geometry;
pub mod metrics;
pub mod scheduler;
pub mod types;

pub use agent::{QAgent, QRow, StateKey};
pub use config::EnvConfig;
pub use environment::{Environment, StateSnapshot, StepOutcome};
pub use error::ParameterError;
pub use geometry::Wall;
pub use metrics::TrainingMetrics;
pub use scheduler::{LoopState, Mode, Scheduler};
pub use types::{Action, KeyState, Pose, Vec2};
