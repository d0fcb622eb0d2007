use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::error::ValidationError;

/// Game variant a score was achieved in.
///
/// The same string form is used on the wire and in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "walls")]
    Walls,
    #[serde(rename = "walls-through")]
    WallsThrough,
}

impl GameMode {
    pub const ALL: [GameMode; 2] = [GameMode::Walls, GameMode::WallsThrough];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Walls => "walls",
            GameMode::WallsThrough => "walls-through",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "walls" => Ok(GameMode::Walls),
            "walls-through" => Ok(GameMode::WallsThrough),
            other => Err(ValidationError::InvalidMode(other.to_string())),
        }
    }
}

/// Ordering applied to a leaderboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Score descending, most recent first among equal scores.
    #[default]
    Score,
    /// Most recent first, higher score first among equal timestamps.
    Date,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "score" => Ok(SortKey::Score),
            "date" => Ok(SortKey::Date),
            other => Err(format!("sort must be 'score' or 'date', got '{other}'")),
        }
    }
}

/// A page window whose bounds are always within the allowed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    limit: u32,
    offset: u32,
}

impl Pagination {
    /// Clamp a caller-supplied window: `limit` into `[1, 100]`, `offset` to `>= 0`.
    pub fn clamped(limit: i64, offset: i64) -> Self {
        let limit = limit.clamp(1, MAX_PAGE_LIMIT as i64) as u32;
        let offset = offset.clamp(0, u32::MAX as i64) as u32;
        Self { limit, offset }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Whether rows remain past this window given `total` matching rows.
    pub fn has_more(&self, total: u64) -> bool {
        u64::from(self.offset) + u64::from(self.limit) < total
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// One row of a leaderboard as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub username: String,
    pub score: i64,
    pub mode: GameMode,
    pub timestamp: DateTime<Utc>,
}

/// A window of leaderboard entries plus the size of the full result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub entries: Vec<LeaderboardEntry>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

impl Page {
    pub fn new(entries: Vec<LeaderboardEntry>, total: u64, window: Pagination) -> Self {
        Self {
            entries,
            total,
            limit: window.limit(),
            offset: window.offset(),
            has_more: window.has_more(total),
        }
    }
}

/// Aggregate figures over active players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_active_players: u64,
    pub total_score_records: u64,
    pub average_score: f64,
    pub top_score: i64,
}
