//! Lookup and lazy creation of [`User`] records.

use chrono::Utc;
use rusqlite::{params, ErrorCode, OptionalExtension};
use uuid::Uuid;

use crate::database::{decode_ts, decode_uuid, encode_ts, Database};
use crate::error::{Result, StoreError};
use crate::models::User;

impl Database {
    /// Return the user with this normalized username, creating it if needed.
    pub fn get_or_create_user(&self, username: &str) -> Result<User> {
        if let Some(user) = self.get_user_by_username(username)? {
            return Ok(user);
        }
        self.insert_or_reread_user(username)
    }

    /// Insert a fresh user row. Two writers racing on the same name both end
    /// up with the same row: the loser hits the unique constraint and re-reads
    /// the winner's user.
    fn insert_or_reread_user(&self, username: &str) -> Result<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let inserted = self.conn().execute(
            "INSERT INTO users (id, username, is_active, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?4)",
            params![
                user.id.to_string(),
                user.username,
                encode_ts(user.created_at),
                encode_ts(user.updated_at),
            ],
        );

        match inserted {
            Ok(_) => {
                tracing::debug!(user_id = %user.id, username = %user.username, "created user");
                Ok(user)
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                tracing::debug!(username, "user created concurrently, re-reading");
                self.get_user_by_username(username)?
                    .ok_or(StoreError::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Case-insensitive lookup by username, regardless of the active flag.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT id, username, is_active, created_at, updated_at
                 FROM users
                 WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Flip the soft-delete flag. Returns `false` if no such user exists.
    pub fn set_user_active(&self, username: &str, active: bool) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE username = ?3",
            params![active, encode_ts(Utc::now()), username],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let username: String = row.get(1)?;
    let is_active: bool = row.get(2)?;
    let created_str: String = row.get(3)?;
    let updated_str: String = row.get(4)?;

    Ok(User {
        id: decode_uuid(0, &id_str)?,
        username,
        is_active,
        created_at: decode_ts(3, &created_str)?,
        updated_at: decode_ts(4, &updated_str)?,
    })
}
