//! # arcade-store
//!
//! Durable storage for the leaderboard, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection`. It owns identity assignment for users and score
//! records and answers the ranked, paginated and aggregate queries. Inactive
//! users are filtered out of every read.

pub mod database;
pub mod migrations;
pub mod models;
pub mod scores;
pub mod seed;
pub mod stats;
pub mod users;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
