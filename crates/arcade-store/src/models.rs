//! Records persisted in the leaderboard database.

use arcade_shared::{GameMode, LeaderboardEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A player, created the first time a normalized username submits a score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    /// Normalized (upper-case, `[A-Z0-9_]`) and unique.
    pub username: String,
    /// Inactive users are hidden from every leaderboard read.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// A single immutable score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub score: i64,
    pub mode: GameMode,
    /// When the game was played. Used for ranking.
    pub played_at: DateTime<Utc>,
    /// When the record was written. Used for duplicate detection.
    pub submitted_at: DateTime<Utc>,
}

/// A score joined with its owner's username, as returned by ranked queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedScore {
    pub username: String,
    pub record: ScoreRecord,
}

impl From<RankedScore> for LeaderboardEntry {
    fn from(ranked: RankedScore) -> Self {
        LeaderboardEntry {
            id: ranked.record.id,
            username: ranked.username,
            score: ranked.record.score,
            mode: ranked.record.mode,
            timestamp: ranked.record.played_at,
        }
    }
}
