//! Error type shared by all learners

use thiserror::Error;

/// Errors raised while fitting or predicting with a learner
#[derive(Debug, Error)]
pub enum LearnerError {
    #[error("model has not been fitted")]
    NotFitted,

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("training labels contain a single class ({0}); both classes are required")]
    SingleClass(f64),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("{count} of {total} predicted probabilities are not finite")]
    NonFiniteOutput { count: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, LearnerError>;
