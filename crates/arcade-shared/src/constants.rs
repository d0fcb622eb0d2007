/// Application name
pub const APP_NAME: &str = "Snake Arcade Leaderboard";

/// Minimum normalized username length
pub const USERNAME_MIN_LEN: usize = 2;

/// Maximum normalized username length
pub const USERNAME_MAX_LEN: usize = 20;

/// Default lowest accepted score
pub const DEFAULT_MIN_SCORE: i64 = 0;

/// Default highest accepted score
pub const DEFAULT_MAX_SCORE: i64 = 999_999;

/// Page size used when the caller does not ask for one
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Largest page a caller can request
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Window during which an identical submission is rejected, in seconds
pub const DEFAULT_DUPLICATE_WINDOW_SECS: i64 = 60;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Default score submissions allowed per client per minute
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;

/// Longest duplicate window the server accepts, in seconds (one year)
pub const MAX_DUPLICATE_WINDOW_SECS: i64 = 365 * 24 * 60 * 60;
