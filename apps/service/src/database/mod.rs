/// Database abstraction layer
///
/// Storage is the only shared resource in the system; everything goes
/// through the `Database` repository trait so the evaluation core stays
/// free of persistence concerns.
pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::{Database, DatabaseImpl};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
