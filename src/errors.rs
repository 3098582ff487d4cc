//! Error types for the bandit simulation core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BanditError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BanditError {
    /// Malformed priors, rates, or policy parameters. Fatal.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The sample size planner needs at least two arms to compare.
    #[error("Insufficient arms: need at least 2, got {0}")]
    InsufficientArms(usize),

    /// Floating point error exhausted all arms during a weighted choice.
    /// Recoverable by redrawing; callers decide whether to retry or propagate.
    #[error("{relative_frequencies:?} -> Weighted choice failed")]
    WeightedChoice { relative_frequencies: Vec<f64> },

    /// Replicates of one experiment disagree on shape.
    #[error("Configuration error: {0}")]
    Configuration(String),
}
