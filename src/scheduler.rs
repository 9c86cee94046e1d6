//! Execution scheduler for the simulation.
//!
//! Drives the environment/agent pair in one of two mutually exclusive,
//! time-driven modes: a fixed-rate manual control loop, or an episodic
//! training loop. Only one loop thread is ever alive; switching modes stops
//! and joins the old loop before the new one starts, so no stale tick can
//! observe shared state afterwards.
//!
//! Cancellation is cooperative: the stop flag is polled at step and episode
//! boundaries, never mid-physics-update, so a stop request takes effect
//! within one pacing interval.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::agent::{QAgent, QRow, StateKey};
use crate::config::EnvConfig;
use crate::environment::{Environment, StateSnapshot};
use crate::error::ParameterError;
use crate::metrics::TrainingMetrics;
use crate::types::Action;

/// Period of the manual control loop (~60 Hz).
const MANUAL_TICK: Duration = Duration::from_millis(16);

/// Default number of training episodes.
const DEFAULT_EPISODES: u32 = 100;

/// Upper bound on the configurable episode count.
const MAX_EPISODES: u32 = 1000;

/// Control mode selected by the embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Physics reacts to externally supplied key-hold state.
    Manual,
    /// The agent drives; training only runs after an explicit start.
    Ai,
}

/// Which loop, if any, is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    ManualRunning,
    TrainingRunning,
}

/// Mutable simulation state shared with the active loop thread.
///
/// Only the thread owning the active mode mutates it; the scheduler's
/// getters take the lock briefly to hand out copies.
struct SimCore {
    env: Environment,
    agent: QAgent,
    episode: u32,
    episode_reward: f64,
    goal_reached: bool,
    metrics: TrainingMetrics,
}

#[derive(Debug, Clone, Copy)]
enum LoopKind {
    Manual,
    Training,
}

/// Lifecycle handles for one spawned loop thread.
struct LoopHandle {
    kind: LoopKind,
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Two-mode execution scheduler over an [`Environment`]/[`QAgent`] pair.
///
/// # Lifecycle
///
/// 1. Create with [`Scheduler::new`]; the scheduler starts idle in manual
///    mode.
/// 2. Call [`Scheduler::reset_all`] (or [`Scheduler::set_mode`]) to begin
///    the manual tick loop, or switch to [`Mode::Ai`] and call
///    [`Scheduler::start`] to train.
/// 3. All getters return owned copies safe to hold across steps.
///
/// Dropping the scheduler stops whichever loop is active.
pub struct Scheduler {
    core: Arc<Mutex<SimCore>>,
    mode: Mode,
    episodes: u32,
    active: Option<LoopHandle>,
}

/// Locks the core, recovering the data if a loop thread panicked mid-hold.
fn lock(core: &Mutex<SimCore>) -> MutexGuard<'_, SimCore> {
    core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Delay between training steps: faster learning rate, faster stepping.
fn step_pause(learning_rate: f64) -> Duration {
    Duration::from_secs_f64((50.0 - learning_rate * 40.0).max(10.0) / 1000.0)
}

/// Delay between training episodes: higher gamma, shorter breather.
fn episode_pause(gamma: f64) -> Duration {
    Duration::from_secs_f64((500.0 - gamma * 300.0).max(100.0) / 1000.0)
}

impl Scheduler {
    /// Creates an idle scheduler in manual mode.
    pub fn new(config: EnvConfig, seed: u64) -> Self {
        let agent = QAgent::new(config.learning_rate, config.gamma, seed);
        let env = Environment::new(config);
        Self {
            core: Arc::new(Mutex::new(SimCore {
                env,
                agent,
                episode: 0,
                episode_reward: 0.0,
                goal_reached: false,
                metrics: TrainingMetrics::new(),
            })),
            mode: Mode::Manual,
            episodes: DEFAULT_EPISODES,
            active: None,
        }
    }

    /// Current control mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Which loop is currently active, if any.
    pub fn loop_state(&self) -> LoopState {
        match &self.active {
            None => LoopState::Idle,
            Some(active) if active.finished.load(Ordering::Relaxed) => LoopState::Idle,
            Some(active) => match active.kind {
                LoopKind::Manual => LoopState::ManualRunning,
                LoopKind::Training => LoopState::TrainingRunning,
            },
        }
    }

    /// Whether the training loop is currently running.
    pub fn is_training(&self) -> bool {
        self.loop_state() == LoopState::TrainingRunning
    }

    /// Launches the training loop.
    ///
    /// No-op unless in AI mode with no training already running. Clears the
    /// episode counters and reward history and resets the environment first.
    pub fn start(&mut self) {
        if self.mode != Mode::Ai {
            tracing::warn!("training start ignored: not in AI mode");
            return;
        }
        if self.loop_state() == LoopState::TrainingRunning {
            tracing::warn!("training start ignored: already running");
            return;
        }
        // Reap any finished loop handle before spawning a new one.
        self.stop();

        {
            let mut core = lock(&self.core);
            core.episode = 0;
            core.episode_reward = 0.0;
            core.goal_reached = false;
            core.metrics.clear();
            core.env.reset();
        }
        self.spawn_training();
    }

    /// Requests cancellation of the active loop and waits for it to exit.
    ///
    /// Joining here is what makes mode switches atomic: once `stop` returns,
    /// no tick from the old loop can ever fire again. Idempotent.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop.store(true, Ordering::Relaxed);
            if active.handle.join().is_err() {
                tracing::error!("loop thread panicked");
            }
        }
    }

    /// Stops whichever loop is active, clears all counters and history,
    /// resets the environment, and restarts the manual loop when in manual
    /// mode. AI mode is left idle until an explicit [`Scheduler::start`].
    pub fn reset_all(&mut self) {
        self.stop();
        {
            let mut core = lock(&self.core);
            core.episode = 0;
            core.episode_reward = 0.0;
            core.goal_reached = false;
            core.metrics.clear();
            core.env.reset();
        }
        if self.mode == Mode::Manual {
            self.spawn_manual();
        }
    }

    /// Switches between manual and AI mode.
    ///
    /// Stops the active loop, performs a full reset, and starts the manual
    /// loop only when the new mode is manual.
    pub fn set_mode(&mut self, mode: Mode) {
        self.stop();
        tracing::info!(?mode, "mode switched");
        self.mode = mode;
        self.reset_all();
    }

    /// Forwards key-hold state to the environment.
    pub fn set_key_state(&mut self, action: Action, pressed: bool) {
        lock(&self.core).env.set_key_state(action, pressed);
    }

    /// Index-based variant; unknown action ids are ignored.
    pub fn set_key_state_index(&mut self, index: usize, pressed: bool) {
        lock(&self.core).env.set_key_state_index(index, pressed);
    }

    /// Updates the learning hyperparameters on both the environment and
    /// the agent.
    pub fn set_parameters(&mut self, learning_rate: f64, gamma: f64) -> Result<(), ParameterError> {
        if !(learning_rate > 0.0 && learning_rate <= 1.0) {
            return Err(ParameterError::LearningRateOutOfRange(learning_rate));
        }
        if !(gamma > 0.0 && gamma < 1.0) {
            return Err(ParameterError::GammaOutOfRange(gamma));
        }
        let mut core = lock(&self.core);
        core.env.set_parameters(learning_rate, gamma);
        core.agent.set_parameters(learning_rate, gamma);
        Ok(())
    }

    /// Sets the number of episodes for the next training run.
    pub fn set_episodes(&mut self, episodes: u32) -> Result<(), ParameterError> {
        if !(1..=MAX_EPISODES).contains(&episodes) {
            return Err(ParameterError::EpisodesOutOfRange(episodes));
        }
        self.episodes = episodes;
        Ok(())
    }

    /// Copy of the current environment snapshot.
    pub fn snapshot(&self) -> StateSnapshot {
        lock(&self.core).env.state()
    }

    /// Vehicle position in 3D scene coordinates, for rendering.
    pub fn position_3d(&self) -> [f64; 3] {
        lock(&self.core).env.position_3d()
    }

    /// Vehicle orientation in 3D scene coordinates, for rendering.
    pub fn rotation_3d(&self) -> [f64; 3] {
        lock(&self.core).env.rotation_3d()
    }

    /// Read-only copy of the Q-table, for tabular display.
    pub fn q_table(&self) -> HashMap<StateKey, QRow> {
        lock(&self.core).agent.q_table().clone()
    }

    /// Copy of the episode-reward history and aggregates.
    pub fn metrics(&self) -> TrainingMetrics {
        lock(&self.core).metrics.clone()
    }

    /// Index of the current (or last started) episode; 0 before training.
    pub fn episode(&self) -> u32 {
        lock(&self.core).episode
    }

    /// Cumulative reward of the episode in progress.
    pub fn episode_reward(&self) -> f64 {
        lock(&self.core).episode_reward
    }

    /// Whether the goal was reached in the current run.
    pub fn goal_reached(&self) -> bool {
        lock(&self.core).goal_reached
    }

    /// The agent's current exploration rate.
    pub fn exploration_rate(&self) -> f64 {
        lock(&self.core).agent.epsilon()
    }

    fn spawn_manual(&mut self) {
        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let core = Arc::clone(&self.core);
        let loop_stop = Arc::clone(&stop);
        let loop_finished = Arc::clone(&finished);

        let handle = thread::spawn(move || {
            tracing::info!("manual loop started");
            while !loop_stop.load(Ordering::Relaxed) {
                {
                    let mut core = lock(&core);
                    let outcome = core.env.update_physics();
                    if outcome.next_state.goal_reached {
                        core.goal_reached = true;
                    }
                }
                thread::sleep(MANUAL_TICK);
            }
            loop_finished.store(true, Ordering::Relaxed);
            tracing::info!("manual loop stopped");
        });

        self.active = Some(LoopHandle {
            kind: LoopKind::Manual,
            stop,
            finished,
            handle,
        });
    }

    fn spawn_training(&mut self) {
        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let core = Arc::clone(&self.core);
        let loop_stop = Arc::clone(&stop);
        let loop_finished = Arc::clone(&finished);
        let episodes = self.episodes;

        let handle = thread::spawn(move || {
            tracing::info!(episodes, "training loop started");
            run_training(&core, &loop_stop, episodes);
            loop_finished.store(true, Ordering::Relaxed);
            tracing::info!("training loop stopped");
        });

        self.active = Some(LoopHandle {
            kind: LoopKind::Training,
            stop,
            finished,
            handle,
        });
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the training loop thread.
///
/// The stop flag is checked at every step and episode boundary; a pending
/// pacing sleep is allowed to elapse before the flag is honored.
fn run_training(core: &Mutex<SimCore>, stop: &AtomicBool, episodes: u32) {
    for episode in 1..=episodes {
        if stop.load(Ordering::Relaxed) {
            return;
        }

        let mut state = {
            let mut core = lock(core);
            core.episode = episode;
            core.episode_reward = 0.0;
            core.goal_reached = false;
            core.env.reset()
        };

        loop {
            if stop.load(Ordering::Relaxed) {
                return;
            }

            let (done, pause) = {
                let mut core = lock(core);
                let action = core.agent.act(&state);
                let outcome = core.env.step(action);
                core.agent
                    .update(&state, action, outcome.reward, &outcome.next_state, outcome.done);
                core.episode_reward += outcome.reward;
                if outcome.next_state.goal_reached {
                    core.goal_reached = true;
                }
                state = outcome.next_state;

                if outcome.done {
                    let reward = core.episode_reward;
                    core.metrics.record(reward);
                    tracing::debug!(episode, reward, "episode finished");
                }
                (outcome.done, step_pause(core.agent.learning_rate()))
            };

            if done {
                break;
            }
            thread::sleep(pause);
        }

        if stop.load(Ordering::Relaxed) {
            return;
        }
        let pause = episode_pause(lock(core).agent.gamma());
        thread::sleep(pause);
    }
}
