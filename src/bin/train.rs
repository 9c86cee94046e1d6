//! Headless training run: trains the agent for a fixed number of episodes
//! and prints the reward history summary.

use std::thread;
use std::time::Duration;

use qdrive::{EnvConfig, Mode, Scheduler};

fn main() {
    tracing_subscriber::fmt::init();

    let mut scheduler = Scheduler::new(EnvConfig::default(), 0xD21E);
    scheduler.set_mode(Mode::Ai);
    if let Err(e) = scheduler.set_parameters(0.5, 0.9) {
        eprintln!("invalid parameters: {e}");
        return;
    }
    if let Err(e) = scheduler.set_episodes(30) {
        eprintln!("invalid episode count: {e}");
        return;
    }

    scheduler.start();
    while scheduler.is_training() {
        thread::sleep(Duration::from_millis(500));
        tracing::info!(
            episode = scheduler.episode(),
            reward = scheduler.episode_reward(),
            epsilon = scheduler.exploration_rate(),
            states = scheduler.q_table().len(),
            "training in progress"
        );
    }

    println!("{}", scheduler.metrics());
}
