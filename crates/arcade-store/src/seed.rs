//! Demo data for local development.

use arcade_shared::GameMode;
use chrono::{Duration, Utc};

use crate::database::Database;
use crate::error::Result;

const DEMO_PLAYERS: &[(&str, &[i64])] = &[
    ("PLAYER1", &[250, 180, 120]),
    ("GAMER42", &[200, 150]),
    ("SNAKEMASTER", &[300, 250, 200]),
    ("RETRO_FAN", &[150, 100]),
    ("ARCADE_PRO", &[220, 180, 140]),
];

impl Database {
    /// Populate an empty database with a handful of players.
    ///
    /// Scores alternate between modes and are backdated one day apart so
    /// that date ordering has something to show. Returns the number of
    /// scores inserted; a database that already holds users is left alone.
    pub fn seed_demo_data(&self) -> Result<usize> {
        let existing: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        if existing > 0 {
            tracing::info!(users = existing, "database not empty, skipping demo seed");
            return Ok(0);
        }

        let inserted = self.in_transaction(|db| {
            let now = Utc::now();
            let mut inserted = 0;
            for (username, scores) in DEMO_PLAYERS {
                let user = db.get_or_create_user(username)?;
                for (i, score) in scores.iter().enumerate() {
                    let mode = if i % 2 == 0 {
                        GameMode::Walls
                    } else {
                        GameMode::WallsThrough
                    };
                    let played_at = now - Duration::days((scores.len() - i) as i64);
                    db.add_score(user.id, *score, mode, now, Some(played_at))?;
                    inserted += 1;
                }
            }
            Ok::<_, crate::StoreError>(inserted)
        })?;

        tracing::info!(scores = inserted, "seeded demo data");
        Ok(inserted)
    }
}
