//! Database Module
//!
//! Connection management, migrations and pagination for the league service.

pub mod connection;

// Re-export commonly used types
pub use connection::{run_migrations, DatabaseConfig, DatabasePool, Pagination};
