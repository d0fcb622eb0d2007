//! Username normalization and score bounds checking.
//!
//! Everything here is pure: the bounds are handed in at construction time
//! so the checks can be exercised without any configuration or storage.

use crate::constants::{DEFAULT_MAX_SCORE, DEFAULT_MIN_SCORE, USERNAME_MAX_LEN, USERNAME_MIN_LEN};
use crate::error::ValidationError;

/// Inclusive range of accepted scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBounds {
    pub min: i64,
    pub max: i64,
}

impl Default for ScoreBounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_SCORE,
            max: DEFAULT_MAX_SCORE,
        }
    }
}

/// A username/score pair that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSubmission {
    pub username: String,
    pub score: i64,
}

/// Trim, uppercase and drop every character outside `[A-Z0-9_]`.
pub fn normalize_username(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    bounds: ScoreBounds,
}

impl Validator {
    pub fn new(bounds: ScoreBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> ScoreBounds {
        self.bounds
    }

    pub fn validate(
        &self,
        raw_username: &str,
        raw_score: i64,
    ) -> Result<NormalizedSubmission, ValidationError> {
        let username = normalize_username(raw_username);
        check_username(&username)?;
        self.check_score(raw_score)?;

        Ok(NormalizedSubmission {
            username,
            score: raw_score,
        })
    }

    pub fn check_score(&self, score: i64) -> Result<(), ValidationError> {
        if score < self.bounds.min {
            return Err(ValidationError::InvalidScore(format!(
                "Score must be at least {}",
                self.bounds.min
            )));
        }
        if score > self.bounds.max {
            return Err(ValidationError::InvalidScore(format!(
                "Score must be at most {}",
                self.bounds.max
            )));
        }
        Ok(())
    }
}

/// Validate an already-normalized username.
pub fn check_username(username: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| Err(ValidationError::InvalidUsername(reason.to_string()));

    if username.is_empty() {
        return invalid("Username is required");
    }
    let len = username.chars().count();
    if len < USERNAME_MIN_LEN {
        return invalid("Username must be at least 2 characters");
    }
    if len > USERNAME_MAX_LEN {
        return invalid("Username must be 20 characters or less");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        return invalid("Username must contain only alphanumeric characters and underscores");
    }
    Ok(())
}
