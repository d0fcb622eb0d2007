//! v001 -- Initial schema creation.
//!
//! Creates the `users` and `scores` tables plus the ranking indexes.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id         TEXT PRIMARY KEY NOT NULL,            -- UUID v4
    username   TEXT NOT NULL UNIQUE COLLATE NOCASE,  -- normalized [A-Z0-9_]{2,20}
    is_active  INTEGER NOT NULL DEFAULT 1,           -- boolean 0/1, soft delete
    created_at TEXT NOT NULL,                        -- RFC-3339 UTC, micros
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at);

-- ----------------------------------------------------------------
-- Scores
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS scores (
    id           TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    user_id      TEXT NOT NULL,              -- FK -> users(id)
    score        INTEGER NOT NULL,
    mode         TEXT NOT NULL CHECK (mode IN ('walls', 'walls-through')),
    played_at    TEXT NOT NULL,              -- ranking timestamp
    submitted_at TEXT NOT NULL,              -- write timestamp, duplicate window

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_scores_user_mode_score
    ON scores(user_id, mode, score DESC);

CREATE INDEX IF NOT EXISTS idx_scores_mode_score_played
    ON scores(mode, score DESC, played_at DESC);

CREATE INDEX IF NOT EXISTS idx_scores_played
    ON scores(played_at DESC);

CREATE INDEX IF NOT EXISTS idx_scores_dedup
    ON scores(user_id, score, mode, submitted_at);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
