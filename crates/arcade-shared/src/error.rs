use thiserror::Error;

/// Client input that failed validation. Each variant carries a
/// human-readable reason that is safe to return to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}")]
    InvalidUsername(String),

    #[error("{0}")]
    InvalidScore(String),

    #[error("Invalid game mode: {0}")]
    InvalidMode(String),
}
