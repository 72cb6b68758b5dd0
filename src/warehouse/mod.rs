//! Warehouse side of the pipeline
//!
//! PostgreSQL access through Diesel: connection pooling, the star schema,
//! the transactional loader and the canned analytics queries.

pub mod analytics;
pub mod database;
pub mod loader;
pub mod models;
pub mod schema;

// Re-export key types
pub use analytics::AnalyticsReport;
pub use database::{Database, DatabaseConfig, DbConnection, Pool, PooledConnection};
pub use loader::{load, LoadSummary};
pub use schema::ensure_tables;
