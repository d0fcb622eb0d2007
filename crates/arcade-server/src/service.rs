//! Leaderboard orchestration.
//!
//! A submission moves through validation, the duplicate guard and
//! persistence in that order; the first gate that fails ends the request
//! with its error and nothing is written. Reads go straight to the store.
//!
//! SQLite calls block, so every store access runs on tokio's blocking pool
//! while holding the shared connection lock.

use std::sync::{Arc, Mutex};

use arcade_shared::{
    normalize_username, GameMode, LeaderboardEntry, Page, Pagination, SortKey, Stats, Validator,
};
use arcade_store::Database;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::ServerError;
use crate::guard::DuplicateGuard;

/// Source of "now" for duplicate-window checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone)]
pub struct LeaderboardService {
    db: Arc<Mutex<Database>>,
    validator: Validator,
    guard: DuplicateGuard,
    clock: Arc<dyn Clock>,
}

impl LeaderboardService {
    pub fn new(db: Arc<Mutex<Database>>, validator: Validator, guard: DuplicateGuard) -> Self {
        Self {
            db,
            validator,
            guard,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run `f` against the store on the blocking pool.
    async fn with_db<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, ServerError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let db = db
                .lock()
                .map_err(|e| ServerError::Internal(format!("Lock poisoned: {e}")))?;
            f(&db)
        })
        .await
        .map_err(|e| ServerError::Internal(format!("Storage task failed: {e}")))?
    }

    /// Validate, de-duplicate and persist one score.
    ///
    /// The duplicate check, user creation and insert share one transaction,
    /// so the score is either fully recorded or not at all.
    pub async fn submit_score(
        &self,
        raw_username: &str,
        raw_score: i64,
        raw_mode: &str,
    ) -> Result<LeaderboardEntry, ServerError> {
        let submission = self.validator.validate(raw_username, raw_score)?;
        let mode: GameMode = raw_mode.parse()?;
        debug!(username = %submission.username, score = submission.score, mode = %mode, "submission validated");

        let now = self.clock.now();
        let guard = self.guard;
        let entry = self
            .with_db(move |db| {
                db.in_transaction(|db| {
                    if guard.is_duplicate(db, &submission.username, submission.score, mode, now)? {
                        info!(
                            username = %submission.username,
                            score = submission.score,
                            mode = %mode,
                            "rejected duplicate submission"
                        );
                        return Err(ServerError::DuplicateSubmission);
                    }
                    debug!(username = %submission.username, "duplicate check passed");

                    let user = db.get_or_create_user(&submission.username)?;
                    let record = db.add_score(user.id, submission.score, mode, now, None)?;

                    Ok(LeaderboardEntry {
                        id: record.id,
                        username: user.username,
                        score: record.score,
                        mode: record.mode,
                        timestamp: record.played_at,
                    })
                })
            })
            .await?;

        info!(
            id = %entry.id,
            username = %entry.username,
            score = entry.score,
            mode = %entry.mode,
            "score submitted"
        );
        Ok(entry)
    }

    pub async fn get_leaderboard(
        &self,
        limit: i64,
        offset: i64,
        mode: Option<GameMode>,
        sort: SortKey,
    ) -> Result<Page, ServerError> {
        let window = Pagination::clamped(limit, offset);
        let (rows, total) = self
            .with_db(move |db| Ok(db.query_leaderboard(window, mode, sort)?))
            .await?;
        let entries = rows.into_iter().map(LeaderboardEntry::from).collect();
        Ok(Page::new(entries, total, window))
    }

    /// Scores for one player. Zero matching records is reported as
    /// [`ServerError::NotFound`], whether the player never played or only
    /// has scores in another mode.
    pub async fn get_user_scores(
        &self,
        username: &str,
        limit: i64,
        offset: i64,
        mode: Option<GameMode>,
    ) -> Result<Page, ServerError> {
        let window = Pagination::clamped(limit, offset);
        let normalized = normalize_username(username);
        let (rows, total) = self
            .with_db(move |db| Ok(db.query_user_scores(&normalized, window, mode)?))
            .await?;

        if total == 0 {
            return Err(ServerError::NotFound(format!(
                "No scores found for user: {username}"
            )));
        }

        let entries = rows.into_iter().map(LeaderboardEntry::from).collect();
        Ok(Page::new(entries, total, window))
    }

    pub async fn get_stats(&self) -> Result<Stats, ServerError> {
        self.with_db(|db| Ok(db.stats()?)).await
    }

    /// Whether the store answers a trivial query.
    pub async fn database_healthy(&self) -> bool {
        match self.with_db(|db| Ok(db.ping()?)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "database health check failed");
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn database(&self) -> Arc<Mutex<Database>> {
        self.db.clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;

    use arcade_shared::ScoreBounds;
    use chrono::Duration;

    use super::*;

    /// A clock that only moves when told to.
    pub(crate) struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self(Mutex::new(Utc::now()))
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    pub(crate) fn test_service() -> (LeaderboardService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("service.db")).unwrap();
        let service = LeaderboardService::new(
            Arc::new(Mutex::new(db)),
            Validator::new(ScoreBounds::default()),
            DuplicateGuard::from_secs(60),
        );
        (service, dir)
    }

    fn scores(page: &Page) -> Vec<i64> {
        page.entries.iter().map(|e| e.score).collect()
    }

    #[tokio::test]
    async fn test_usernames_normalize_to_one_player() {
        let (service, _dir) = test_service();
        let a = service.submit_score("player1", 250, "walls").await.unwrap();
        let b = service.submit_score("PLAYER1 ", 180, "walls").await.unwrap();
        assert_eq!(a.username, "PLAYER1");
        assert_eq!(b.username, "PLAYER1");

        let page = service.get_user_scores("player1", 10, 0, None).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(scores(&page), [250, 180]);

        let stats = service.get_stats().await.unwrap();
        assert_eq!(stats.total_active_players, 1);
    }

    #[tokio::test]
    async fn test_score_bounds() {
        let (service, _dir) = test_service();
        assert!(service.submit_score("edge", 0, "walls").await.is_ok());
        assert!(service.submit_score("edge", 999_999, "walls").await.is_ok());
        assert!(matches!(
            service.submit_score("edge", -1, "walls").await,
            Err(ServerError::InvalidScore(_))
        ));
        assert!(matches!(
            service.submit_score("edge", 1_000_000, "walls").await,
            Err(ServerError::InvalidScore(_))
        ));
    }

    #[tokio::test]
    async fn test_rejections_write_nothing() {
        let (service, _dir) = test_service();
        assert!(matches!(
            service.submit_score("x", 10, "walls").await,
            Err(ServerError::InvalidUsername(_))
        ));
        assert!(matches!(
            service.submit_score("ace", 10, "portal").await,
            Err(ServerError::InvalidMode(_))
        ));

        let stats = service.get_stats().await.unwrap();
        assert_eq!(stats.total_active_players, 0);
        assert_eq!(stats.total_score_records, 0);
    }

    #[tokio::test]
    async fn test_duplicate_within_window_then_allowed() {
        let clock = Arc::new(ManualClock::new());
        let (service, _dir) = test_service();
        let service = service.with_clock(clock.clone());

        service.submit_score("ace", 100, "walls").await.unwrap();
        assert!(matches!(
            service.submit_score(" Ace", 100, "walls").await,
            Err(ServerError::DuplicateSubmission)
        ));

        // different mode or score is not a duplicate
        service.submit_score("ace", 100, "walls-through").await.unwrap();
        service.submit_score("ace", 101, "walls").await.unwrap();

        clock.advance(Duration::seconds(61));
        service.submit_score("ace", 100, "walls").await.unwrap();

        let page = service.get_user_scores("ACE", 10, 0, None).await.unwrap();
        assert_eq!(page.total, 4);
    }

    #[tokio::test]
    async fn test_window_follows_injected_clock() {
        let clock = Arc::new(ManualClock::new());
        let (service, _dir) = test_service();
        let service = service.with_clock(clock.clone());

        clock.advance(Duration::seconds(61));
        let entry = service.submit_score("ace", 100, "walls").await.unwrap();
        assert_eq!(entry.timestamp, clock.now());

        assert!(matches!(
            service.submit_score("ace", 100, "walls").await,
            Err(ServerError::DuplicateSubmission)
        ));

        clock.advance(Duration::seconds(59));
        assert!(matches!(
            service.submit_score("ace", 100, "walls").await,
            Err(ServerError::DuplicateSubmission)
        ));

        clock.advance(Duration::seconds(2));
        service.submit_score("ace", 100, "walls").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_identical_submissions_store_one() {
        let (service, _dir) = test_service();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.submit_score("ace", 500, "walls").await })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(ServerError::DuplicateSubmission) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(accepted, 1);

        let stats = service.get_stats().await.unwrap();
        assert_eq!(stats.total_score_records, 1);
        assert_eq!(stats.total_active_players, 1);
    }

    #[tokio::test]
    async fn test_two_record_pagination() {
        let (service, _dir) = test_service();
        service.submit_score("first", 300, "walls").await.unwrap();
        service.submit_score("second", 200, "walls-through").await.unwrap();

        let full = service.get_leaderboard(10, 0, None, SortKey::Score).await.unwrap();
        let p0 = service.get_leaderboard(1, 0, None, SortKey::Score).await.unwrap();
        let p1 = service.get_leaderboard(1, 1, None, SortKey::Score).await.unwrap();

        assert_eq!((p0.total, p1.total), (2, 2));
        assert!(p0.has_more);
        assert!(!p1.has_more);
        assert_eq!(p0.entries[0], full.entries[0]);
        assert_eq!(p1.entries[0], full.entries[1]);
    }

    #[tokio::test]
    async fn test_leaderboard_clamps_window() {
        let (service, _dir) = test_service();
        service.submit_score("ace", 1, "walls").await.unwrap();

        let page = service.get_leaderboard(0, -4, None, SortKey::Score).await.unwrap();
        assert_eq!((page.limit, page.offset), (1, 0));

        let page = service.get_leaderboard(1000, 0, None, SortKey::Score).await.unwrap();
        assert_eq!(page.limit, 100);
    }

    #[tokio::test]
    async fn test_empty_leaderboard_is_not_an_error() {
        let (service, _dir) = test_service();
        let page = service
            .get_leaderboard(10, 0, Some(GameMode::Walls), SortKey::Date)
            .await
            .unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.total, 0);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_user_scores_not_found() {
        let (service, _dir) = test_service();
        assert!(matches!(
            service.get_user_scores("ghost", 10, 0, None).await,
            Err(ServerError::NotFound(_))
        ));

        service.submit_score("ace", 10, "walls").await.unwrap();
        assert!(matches!(
            service
                .get_user_scores("ace", 10, 0, Some(GameMode::WallsThrough))
                .await,
            Err(ServerError::NotFound(_))
        ));

        // past the end of a populated scope is an empty page, not NotFound
        let page = service.get_user_scores("ace", 10, 50, None).await.unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_sorted_pages_cover_everything() {
        let (service, _dir) = test_service();
        let submissions = [
            ("aa", 30, "walls"),
            ("bb", 20, "walls"),
            ("cc", 20, "walls-through"),
            ("dd", 20, "walls"),
            ("aa", 10, "walls-through"),
            ("bb", 45, "walls-through"),
            ("cc", 5, "walls"),
        ];
        for (name, score, mode) in submissions {
            service.submit_score(name, score, mode).await.unwrap();
        }

        let total = service
            .get_leaderboard(1, 0, None, SortKey::Score)
            .await
            .unwrap()
            .total;
        let mut seen = Vec::new();
        let mut offset = 0;
        while offset < total as i64 {
            let page = service
                .get_leaderboard(3, offset, None, SortKey::Score)
                .await
                .unwrap();
            seen.extend(page.entries);
            offset += 3;
        }

        assert_eq!(seen.len() as u64, total);
        let ids: HashSet<_> = seen.iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), seen.len());
        assert!(seen.windows(2).all(|w| {
            w[0].score > w[1].score
                || (w[0].score == w[1].score && w[0].timestamp >= w[1].timestamp)
        }));
    }

    #[tokio::test]
    async fn test_stats_passthrough() {
        let (service, _dir) = test_service();
        service.submit_score("aa", 10, "walls").await.unwrap();
        service.submit_score("bb", 25, "walls").await.unwrap();

        let stats = service.get_stats().await.unwrap();
        assert_eq!(stats.total_score_records, 2);
        assert_eq!(stats.top_score, 25);
        assert_eq!(stats.average_score, 17.5);
    }

    #[tokio::test]
    async fn test_deactivated_player_hidden() {
        let (service, _dir) = test_service();
        service.submit_score("gone", 500, "walls").await.unwrap();
        service.submit_score("here", 10, "walls").await.unwrap();
        service
            .database()
            .lock()
            .unwrap()
            .set_user_active("GONE", false)
            .unwrap();

        let page = service.get_leaderboard(10, 0, None, SortKey::Score).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.entries[0].username, "HERE");
        assert!(matches!(
            service.get_user_scores("gone", 10, 0, None).await,
            Err(ServerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_health() {
        let (service, _dir) = test_service();
        assert!(service.database_healthy().await);
    }
}
