//! Database layer
//!
//! Libris persists everything in SQLite through sqlx. The layer is split into:
//! - `pool`: connection pool construction
//! - `migrations`: embedded schema migrations
//! - `repositories`: one repository trait plus sqlx implementation per entity
//!
//! # Usage
//!
//! ```ignore
//! use libris::config::DatabaseConfig;
//! use libris::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, ping, DbPool};
