//! # ponicwatch-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `EntityStore` and `LogSink` ports defined in
//!   `ponicwatch-app`
//! - Manage the `SQLite` connection pool lifecycle (a single connection;
//!   `SQLite` is this process's only writer)
//! - Run database migrations (sqlx embedded migrations)
//! - Map between domain records and database rows
//!
//! ## Dependency rule
//! Depends on `ponicwatch-app` (port traits) and `ponicwatch-domain`
//! (record types). Those crates must never reference this adapter.

pub mod entity_store;
pub mod error;
pub mod log_sink;
pub mod pool;

pub use entity_store::SqliteEntityStore;
pub use log_sink::SqliteLogSink;
pub use pool::{Config, Database};
