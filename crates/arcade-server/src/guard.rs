//! Rejection of accidental double submissions.

use arcade_shared::constants::MAX_DUPLICATE_WINDOW_SECS;
use arcade_shared::GameMode;
use arcade_store::{Database, StoreError};
use chrono::{DateTime, Duration, Utc};

/// Flags a submission identical to one the same player made within `window`.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateGuard {
    window: Duration,
}

impl DuplicateGuard {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Window of `secs` seconds, clamped to `0..=MAX_DUPLICATE_WINDOW_SECS`.
    pub fn from_secs(secs: i64) -> Self {
        Self::new(Duration::seconds(secs.clamp(0, MAX_DUPLICATE_WINDOW_SECS)))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// `username` must already be normalized. Read-only.
    pub fn is_duplicate(
        &self,
        db: &Database,
        username: &str,
        score: i64,
        mode: GameMode,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let cutoff = now
            .checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        db.has_recent_score(username, score, mode, cutoff)
    }
}
