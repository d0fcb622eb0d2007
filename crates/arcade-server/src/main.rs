//! # arcade-server
//!
//! HTTP backend for the snake arcade leaderboard.
//!
//! This binary provides:
//! - **Score submission** with username normalization, score bounds and
//!   duplicate rejection
//! - **Ranked, paginated reads** of the global leaderboard and of a single
//!   player's scores
//! - **Aggregate statistics** over active players
//! - **Per-IP rate limiting** on submissions to protect against abuse

mod api;
mod config;
mod error;
mod guard;
mod rate_limit;
mod service;

use std::sync::{Arc, Mutex};

use arcade_shared::Validator;
use arcade_store::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::{LogFormat, ServerConfig};
use crate::guard::DuplicateGuard;
use crate::rate_limit::RateLimiter;
use crate::service::LeaderboardService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Load configuration (.env first, then the process environment)
    // -----------------------------------------------------------------------
    dotenv::dotenv().ok();
    let (config, config_warnings) = ServerConfig::from_env();

    // -----------------------------------------------------------------------
    // 2. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,arcade_server=debug,arcade_store=debug"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    info!("Starting leaderboard server v{}", env!("CARGO_PKG_VERSION"));
    for warning in &config_warnings {
        warning.log();
    }
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the store
    // -----------------------------------------------------------------------
    let database = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::open_default()?,
    };

    if config.seed_demo_data {
        database.seed_demo_data()?;
    }

    let service = LeaderboardService::new(
        Arc::new(Mutex::new(database)),
        Validator::new(config.score_bounds),
        DuplicateGuard::from_secs(config.duplicate_window_secs),
    );

    let rate_limiter = RateLimiter::per_minute(config.rate_limit_per_minute)
        .trust_proxy_headers(config.trust_proxy_headers);

    let app_state = AppState {
        service,
        rate_limiter: rate_limiter.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, drop expired windows)
    let rl = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_expired().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
