//! # arcade-shared
//!
//! Types shared by the leaderboard store and server: game modes, page
//! windows, the caller-facing entry and stats shapes, and the pure
//! submission validator.

pub mod constants;
pub mod error;
pub mod types;
pub mod validation;

pub use error::ValidationError;
pub use types::*;
pub use validation::{normalize_username, NormalizedSubmission, ScoreBounds, Validator};
