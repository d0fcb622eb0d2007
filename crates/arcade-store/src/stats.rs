use arcade_shared::Stats;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Aggregates over active players and their scores.
    ///
    /// The average is rounded to two decimals; average and top score are
    /// both `0` when nothing has been recorded.
    pub fn stats(&self) -> Result<Stats> {
        let active_players: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;

        let (records, average, top): (i64, Option<f64>, Option<i64>) = self.conn().query_row(
            "SELECT COUNT(s.id), AVG(s.score), MAX(s.score)
             FROM scores s
             JOIN users u ON u.id = s.user_id
             WHERE u.is_active = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(Stats {
            total_active_players: active_players as u64,
            total_score_records: records as u64,
            average_score: average.map(round_2dp).unwrap_or(0.0),
            top_score: top.unwrap_or(0),
        })
    }
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
