//! Training metrics: per-episode reward history and simple aggregates.
//!
//! The history is append-only during a run and exists for display
//! collaborators (reward charts, progress readouts); nothing in the
//! learning loop reads it back.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ordered per-episode reward history with summary statistics.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrainingMetrics {
    rewards: Vec<f64>,
}

impl TrainingMetrics {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the cumulative reward of one completed episode.
    pub fn record(&mut self, episode_reward: f64) {
        self.rewards.push(episode_reward);
    }

    /// Clears the history for a fresh run.
    pub fn clear(&mut self) {
        self.rewards.clear();
    }

    /// Number of completed episodes.
    pub fn episodes_completed(&self) -> usize {
        self.rewards.len()
    }

    /// The full reward history, oldest first.
    pub fn rewards(&self) -> &[f64] {
        &self.rewards
    }

    /// Reward of the most recent episode, if any.
    pub fn last_reward(&self) -> Option<f64> {
        self.rewards.last().copied()
    }

    /// Best episode reward so far, if any.
    pub fn best_reward(&self) -> Option<f64> {
        self.rewards
            .iter()
            .copied()
            .fold(None, |best, r| Some(best.map_or(r, |b: f64| b.max(r))))
    }

    /// Mean episode reward, if any episodes completed.
    pub fn mean_reward(&self) -> Option<f64> {
        if self.rewards.is_empty() {
            None
        } else {
            Some(self.rewards.iter().sum::<f64>() / self.rewards.len() as f64)
        }
    }
}

impl fmt::Display for TrainingMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== Training Metrics ({} episodes) ===",
            self.episodes_completed()
        )?;
        writeln!(
            f,
            "  Mean reward:  {:.2}",
            self.mean_reward().unwrap_or(0.0)
        )?;
        writeln!(
            f,
            "  Best reward:  {:.2}",
            self.best_reward().unwrap_or(0.0)
        )?;
        write!(
            f,
            "  Last reward:  {:.2}",
            self.last_reward().unwrap_or(0.0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_has_no_aggregates() {
        let m = TrainingMetrics::new();
        assert_eq!(m.episodes_completed(), 0);
        assert_eq!(m.last_reward(), None);
        assert_eq!(m.best_reward(), None);
        assert_eq!(m.mean_reward(), None);
    }

    #[test]
    fn record_preserves_order() {
        let mut m = TrainingMetrics::new();
        m.record(-3.0);
        m.record(5.0);
        m.record(1.0);
        assert_eq!(m.rewards(), &[-3.0, 5.0, 1.0]);
        assert_eq!(m.last_reward(), Some(1.0));
        assert_eq!(m.best_reward(), Some(5.0));
        assert!((m.mean_reward().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn clear_resets_history() {
        let mut m = TrainingMetrics::new();
        m.record(2.0);
        m.clear();
        assert_eq!(m.episodes_completed(), 0);
    }

    #[test]
    fn display_includes_episode_count() {
        let mut m = TrainingMetrics::new();
        m.record(4.0);
        let s = m.to_string();
        assert!(s.contains("1 episodes"));
        assert!(s.contains("4.00"));
    }

    #[cfg(feature = "serde")]
    mod serde_tests {
        use super::*;

        #[test]
        fn metrics_serialize_deserialize_roundtrip() {
            let mut m = TrainingMetrics::new();
            m.record(-3.5);
            m.record(12.0);

            let json = serde_json::to_string(&m).unwrap();
            let restored: TrainingMetrics = serde_json::from_str(&json).unwrap();
            assert_eq!(restored, m);
        }
    }
}
