use thiserror::Error;

/// Errors returned by the scheduler's validated parameter setters.
///
/// Everything else in the engine is infallible by design: geometry math is
/// total over reachable inputs and unknown action ids are ignored.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    #[error("learning rate must be in (0, 1], got {0}")]
    LearningRateOutOfRange(f64),

    #[error("discount factor must be in (0, 1), got {0}")]
    GammaOutOfRange(f64),

    #[error("episode count must be between 1 and 1000, got {0}")]
    EpisodesOutOfRange(u32),
}
