//! Tabular Q-learning agent.
//!
//! The agent quantizes the five sensor readings into a compact table key,
//! selects actions epsilon-greedily, and revises its estimates with the
//! standard Bellman update. Exploration decays multiplicatively toward a
//! fixed floor after every update.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::EnvConfig;
use crate::environment::StateSnapshot;
use crate::types::Action;

/// Number of quantization levels per sensor reading.
const DISCRETIZATION_LEVELS: u8 = 5;

/// Upper bound of the random initial Q-values for unseen states.
const INIT_VALUE_SPREAD: f64 = 0.1;

/// One row of action values.
pub type QRow = [f64; Action::COUNT];

/// Discretized projection of a sensor state, used as the Q-table key.
///
/// Each sensor reading is quantized by `floor(s * levels)`, giving bins
/// `0..DISCRETIZATION_LEVELS` for interior readings plus a distinct top bin
/// for a full-range reading of exactly 1.0 (the common "nothing in range"
/// state keeps its own row). Readings that land in the same bins collapse
/// to the same table entry; the encoding is order-preserving and
/// collision-free by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateKey([u8; EnvConfig::SENSOR_COUNT]);

impl StateKey {
    /// Quantizes normalized sensor readings into a table key.
    pub fn from_sensors(sensors: &[f64; EnvConfig::SENSOR_COUNT]) -> Self {
        let mut bins = [0u8; EnvConfig::SENSOR_COUNT];
        for (bin, s) in bins.iter_mut().zip(sensors) {
            *bin = (s.clamp(0.0, 1.0) * f64::from(DISCRETIZATION_LEVELS)).floor() as u8;
        }
        Self(bins)
    }

    /// The raw bin indices.
    pub fn bins(&self) -> [u8; EnvConfig::SENSOR_COUNT] {
        self.0
    }
}

/// Epsilon-greedy tabular Q-learning agent.
///
/// The table grows lazily: any never-visited state gets a fresh row of small
/// random values, which breaks ties among untried actions and avoids a
/// systematic action bias at cold start.
#[derive(Debug)]
pub struct QAgent {
    learning_rate: f64,
    gamma: f64,
    epsilon: f64,
    epsilon_min: f64,
    epsilon_decay: f64,
    q_table: HashMap<StateKey, QRow>,
    rng: StdRng,
}

impl QAgent {
    /// Creates a new agent with the given hyperparameters and RNG seed.
    pub fn new(learning_rate: f64, gamma: f64, seed: u64) -> Self {
        Self {
            learning_rate,
            gamma,
            epsilon: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.995,
            q_table: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Updates the hyperparameters in place.
    ///
    /// The epsilon decay rate is recomputed from the learning rate: faster
    /// learners also stop exploring sooner.
    pub fn set_parameters(&mut self, learning_rate: f64, gamma: f64) {
        self.learning_rate = learning_rate;
        self.gamma = gamma;
        self.epsilon_decay = 0.99 - 0.05 * learning_rate;
    }

    /// Overrides the current exploration rate.
    ///
    /// Setting 0.0 makes the agent fully greedy, e.g. for evaluation runs.
    pub fn set_exploration(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// Selects an action for the given state.
    ///
    /// With probability epsilon a uniformly random action is returned;
    /// otherwise one of the value-maximizing actions, with ties broken
    /// uniformly at random.
    pub fn act(&mut self, state: &StateSnapshot) -> Action {
        if self.rng.gen::<f64>() < self.epsilon {
            let index = self.rng.gen_range(0..Action::COUNT);
            return Action::all()[index];
        }

        let key = StateKey::from_sensors(&state.sensors);
        let row = *self.row(key);

        let best = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let candidates: Vec<usize> = (0..Action::COUNT).filter(|&i| row[i] == best).collect();
        let pick = candidates[self.rng.gen_range(0..candidates.len())];
        Action::all()[pick]
    }

    /// Applies one Q-learning update for an observed transition, then
    /// decays epsilon toward its floor.
    pub fn update(
        &mut self,
        state: &StateSnapshot,
        action: Action,
        reward: f64,
        next_state: &StateSnapshot,
        done: bool,
    ) {
        let key = StateKey::from_sensors(&state.sensors);
        let next_key = StateKey::from_sensors(&next_state.sensors);

        let next_row = *self.row(next_key);
        let current = self.row(key)[action.index()];

        let target = if done {
            reward
        } else {
            let next_max = next_row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            reward + self.gamma * next_max
        };

        self.row(key)[action.index()] = current + self.learning_rate * (target - current);

        self.epsilon = (self.epsilon * self.epsilon_decay).max(self.epsilon_min);
    }

    /// Looks up the Q-row for a key, lazily initializing unseen states with
    /// small random values.
    fn row(&mut self, key: StateKey) -> &mut QRow {
        let rng = &mut self.rng;
        self.q_table.entry(key).or_insert_with(|| {
            let mut row = [0.0; Action::COUNT];
            for value in &mut row {
                *value = rng.gen::<f64>() * INIT_VALUE_SPREAD;
            }
            row
        })
    }

    /// Current exploration rate.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Current learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Current discount factor.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Read-only view of the Q-table.
    pub fn q_table(&self) -> &HashMap<StateKey, QRow> {
        &self.q_table
    }

    /// Number of distinct states visited so far.
    pub fn states_visited(&self) -> usize {
        self.q_table.len()
    }
}
