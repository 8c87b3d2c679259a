//! Database layer
//!
//! Posts are stored in either SQLite (default, single-file deployment) or
//! MySQL. The driver is chosen by configuration and hidden behind the
//! `DatabasePool` trait, so repositories never depend on a concrete backend.
//!
//! ```ignore
//! use blog_platform::config::DatabaseConfig;
//! use blog_platform::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
