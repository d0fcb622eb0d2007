//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development. A `.env` file in the working
//! directory is read first when present.
//!
//! Configuration is read before the tracing subscriber exists, so unusable
//! values are returned as [`ConfigWarning`]s and logged by the caller once
//! logging is up.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use arcade_shared::constants::{
    DEFAULT_DUPLICATE_WINDOW_SECS, DEFAULT_HTTP_PORT, DEFAULT_RATE_LIMIT_PER_MINUTE,
    MAX_DUPLICATE_WINDOW_SECS,
};
use arcade_shared::ScoreBounds;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines for development.
    Text,
    /// One JSON object per event, for log shipping.
    Json,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8000`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None` (platform data directory).
    pub database_path: Option<PathBuf>,

    /// Origins allowed by CORS.
    /// Env: `CORS_ORIGINS` (comma separated)
    /// Default: the two local frontend dev servers.
    pub cors_origins: Vec<String>,

    /// Env: `LOG_FORMAT` (`text` or `json`)
    /// Default: `text`
    pub log_format: LogFormat,

    /// Score submissions allowed per client IP per minute.
    /// Env: `RATE_LIMIT_PER_MINUTE`
    /// Default: `60`
    pub rate_limit_per_minute: u32,

    /// Identify clients by `X-Forwarded-For` / `X-Real-IP` instead of the
    /// peer address. Only safe behind a reverse proxy that sets them.
    /// Env: `TRUST_PROXY_HEADERS` (true/false)
    /// Default: `false`
    pub trust_proxy_headers: bool,

    /// Inclusive range of accepted scores.
    /// Env: `MIN_SCORE`, `MAX_SCORE`
    /// Default: `0..=999999`
    pub score_bounds: ScoreBounds,

    /// Seconds during which an identical (user, score, mode) submission is
    /// rejected. Capped at one year.
    /// Env: `DUPLICATE_WINDOW_SECS`
    /// Default: `60`
    pub duplicate_window_secs: i64,

    /// Insert demo players into an empty database at startup.
    /// Env: `SEED_DEMO_DATA` (true/false)
    /// Default: `false`
    pub seed_demo_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            cors_origins: vec![
                "http://localhost:8080".to_string(),
                "http://localhost:5173".to_string(),
            ],
            log_format: LogFormat::Text,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            trust_proxy_headers: false,
            score_bounds: ScoreBounds::default(),
            duplicate_window_secs: DEFAULT_DUPLICATE_WINDOW_SECS,
            seed_demo_data: false,
        }
    }
}

/// A setting that was present but could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: &'static str,
    pub value: String,
    pub message: &'static str,
}

impl ConfigWarning {
    pub fn log(&self) {
        tracing::warn!(key = self.key, value = %self.value, "{}", self.message);
    }
}

#[derive(Default)]
struct Warnings(Vec<ConfigWarning>);

impl Warnings {
    fn push(&mut self, key: &'static str, value: impl ToString, message: &'static str) {
        self.0.push(ConfigWarning {
            key,
            value: value.to_string(),
            message,
        });
    }

    fn parse_into<T: FromStr>(&mut self, slot: &mut T, key: &'static str, raw: &str) {
        match raw.trim().parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => self.push(key, raw, "Invalid value, using default"),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> (Self, Vec<ConfigWarning>) {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Invalid values leave the default in place and are reported in the
    /// returned warnings.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> (Self, Vec<ConfigWarning>) {
        let mut config = Self::default();
        let mut warnings = Warnings::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            warnings.parse_into(&mut config.http_addr, "HTTP_ADDR", &addr);
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.trim().is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(origins) = lookup("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            match format.trim().to_ascii_lowercase().as_str() {
                "json" => config.log_format = LogFormat::Json,
                "text" => config.log_format = LogFormat::Text,
                _ => warnings.push("LOG_FORMAT", &format, "Invalid LOG_FORMAT, using default"),
            }
        }

        if let Some(val) = lookup("RATE_LIMIT_PER_MINUTE") {
            warnings.parse_into(&mut config.rate_limit_per_minute, "RATE_LIMIT_PER_MINUTE", &val);
        }

        if let Some(val) = lookup("TRUST_PROXY_HEADERS") {
            config.trust_proxy_headers = val == "true" || val == "1";
        }

        let mut bounds = config.score_bounds;
        if let Some(val) = lookup("MIN_SCORE") {
            warnings.parse_into(&mut bounds.min, "MIN_SCORE", &val);
        }
        if let Some(val) = lookup("MAX_SCORE") {
            warnings.parse_into(&mut bounds.max, "MAX_SCORE", &val);
        }
        if bounds.min <= bounds.max {
            config.score_bounds = bounds;
        } else {
            warnings.push(
                "MIN_SCORE",
                format!("{}..{}", bounds.min, bounds.max),
                "MIN_SCORE exceeds MAX_SCORE, using default bounds",
            );
        }

        if let Some(val) = lookup("DUPLICATE_WINDOW_SECS") {
            let mut secs = config.duplicate_window_secs;
            warnings.parse_into(&mut secs, "DUPLICATE_WINDOW_SECS", &val);
            if secs < 0 {
                warnings.push("DUPLICATE_WINDOW_SECS", secs, "Negative window, using default");
            } else if secs > MAX_DUPLICATE_WINDOW_SECS {
                warnings.push("DUPLICATE_WINDOW_SECS", secs, "Window too long, capped at one year");
                config.duplicate_window_secs = MAX_DUPLICATE_WINDOW_SECS;
            } else {
                config.duplicate_window_secs = secs;
            }
        }

        if let Some(val) = lookup("SEED_DEMO_DATA") {
            config.seed_demo_data = val == "true" || val == "1";
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        (config, warnings.0)
    }
}
