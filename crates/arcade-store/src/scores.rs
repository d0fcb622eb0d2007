//! Score insertion and the ranked, paginated read paths.

use arcade_shared::{GameMode, Pagination, SortKey};
use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::{decode_ts, decode_uuid, encode_ts, Database};
use crate::error::Result;
use crate::models::{RankedScore, ScoreRecord};

const RANKED_COLUMNS: &str =
    "s.id, s.user_id, s.score, s.mode, s.played_at, s.submitted_at, u.username";

// The trailing `s.id` keeps pages stable when score and date both tie.
const ORDER_BY_SCORE: &str = "ORDER BY s.score DESC, s.played_at DESC, s.id ASC";
const ORDER_BY_DATE: &str = "ORDER BY s.played_at DESC, s.score DESC, s.id ASC";

impl Database {
    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Persist a new score received at `submitted_at`. `played_at` defaults
    /// to the submission time.
    ///
    /// The caller supplies `submitted_at` so the duplicate window and the
    /// stored row are measured against the same clock.
    pub fn add_score(
        &self,
        user_id: Uuid,
        score: i64,
        mode: GameMode,
        submitted_at: DateTime<Utc>,
        played_at: Option<DateTime<Utc>>,
    ) -> Result<ScoreRecord> {
        let record = ScoreRecord {
            id: Uuid::new_v4(),
            user_id,
            score,
            mode,
            played_at: played_at.unwrap_or(submitted_at),
            submitted_at,
        };

        self.conn().execute(
            "INSERT INTO scores (id, user_id, score, mode, played_at, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                record.user_id.to_string(),
                record.score,
                record.mode.as_str(),
                encode_ts(record.played_at),
                encode_ts(record.submitted_at),
            ],
        )?;

        tracing::debug!(score_id = %record.id, user_id = %user_id, score, mode = %mode, "stored score");
        Ok(record)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Whether `username` already has this exact score in this mode, written
    /// at or after `since`. Unknown users never have one.
    pub fn has_recent_score(
        &self,
        username: &str,
        score: i64,
        mode: GameMode,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let found: bool = self.conn().query_row(
            "SELECT EXISTS (
                 SELECT 1
                 FROM scores s
                 JOIN users u ON u.id = s.user_id
                 WHERE u.username = ?1
                   AND s.score = ?2
                   AND s.mode = ?3
                   AND s.submitted_at >= ?4
             )",
            params![username, score, mode.as_str(), encode_ts(since)],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// Active players' scores, optionally for one mode, ordered by `sort`.
    ///
    /// Returns the requested page plus the count of all matching rows.
    pub fn query_leaderboard(
        &self,
        window: Pagination,
        mode: Option<GameMode>,
        sort: SortKey,
    ) -> Result<(Vec<RankedScore>, u64)> {
        let mode = mode.map(|m| m.as_str());

        let total: i64 = self.conn().query_row(
            "SELECT COUNT(*)
             FROM scores s
             JOIN users u ON u.id = s.user_id
             WHERE u.is_active = 1
               AND (?1 IS NULL OR s.mode = ?1)",
            params![mode],
            |row| row.get(0),
        )?;

        let order_by = match sort {
            SortKey::Score => ORDER_BY_SCORE,
            SortKey::Date => ORDER_BY_DATE,
        };
        let sql = format!(
            "SELECT {RANKED_COLUMNS}
             FROM scores s
             JOIN users u ON u.id = s.user_id
             WHERE u.is_active = 1
               AND (?1 IS NULL OR s.mode = ?1)
             {order_by}
             LIMIT ?2 OFFSET ?3"
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(
            params![mode, window.limit(), window.offset()],
            row_to_ranked,
        )?;

        let mut scores = Vec::new();
        for row in rows {
            scores.push(row?);
        }
        Ok((scores, total as u64))
    }

    /// One active player's scores, best first, then most recent first.
    pub fn query_user_scores(
        &self,
        username: &str,
        window: Pagination,
        mode: Option<GameMode>,
    ) -> Result<(Vec<RankedScore>, u64)> {
        let mode = mode.map(|m| m.as_str());

        let total: i64 = self.conn().query_row(
            "SELECT COUNT(*)
             FROM scores s
             JOIN users u ON u.id = s.user_id
             WHERE u.username = ?1
               AND u.is_active = 1
               AND (?2 IS NULL OR s.mode = ?2)",
            params![username, mode],
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {RANKED_COLUMNS}
             FROM scores s
             JOIN users u ON u.id = s.user_id
             WHERE u.username = ?1
               AND u.is_active = 1
               AND (?2 IS NULL OR s.mode = ?2)
             {ORDER_BY_SCORE}
             LIMIT ?3 OFFSET ?4"
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(
            params![username, mode, window.limit(), window.offset()],
            row_to_ranked,
        )?;

        let mut scores = Vec::new();
        for row in rows {
            scores.push(row?);
        }
        Ok((scores, total as u64))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_ranked(row: &rusqlite::Row<'_>) -> rusqlite::Result<RankedScore> {
    let id_str: String = row.get(0)?;
    let user_id_str: String = row.get(1)?;
    let score: i64 = row.get(2)?;
    let mode_str: String = row.get(3)?;
    let played_str: String = row.get(4)?;
    let submitted_str: String = row.get(5)?;
    let username: String = row.get(6)?;

    let mode: GameMode = mode_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(RankedScore {
        username,
        record: ScoreRecord {
            id: decode_uuid(0, &id_str)?,
            user_id: decode_uuid(1, &user_id_str)?,
            score,
            mode,
            played_at: decode_ts(4, &played_str)?,
            submitted_at: decode_ts(5, &submitted_str)?,
        },
    })
}
