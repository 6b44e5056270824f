use anyhow::Result;
use libsql::Connection;

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 2;

/// Run database migrations.
///
/// This is the single source of truth for the database schema; provisioning
/// tooling only writes monitor rows and must not alter tables.
pub async fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL,
            description TEXT
        )",
        (),
    )
    .await?;

    let current_version = get_current_version(conn).await?;

    if current_version >= SCHEMA_VERSION {
        tracing::info!("Database schema is up to date (version {})", current_version);
        return Ok(());
    }

    tracing::info!("Running migrations from version {} to {}", current_version, SCHEMA_VERSION);

    if current_version < 1 {
        run_migration_v1(conn).await?;
        record_migration(conn, 1, "Initial schema").await?;
    }

    if current_version < 2 {
        run_migration_v2(conn).await?;
        record_migration(conn, 2, "Add health check entries support").await?;
    }

    tracing::info!("Database migrations completed (now at version {})", SCHEMA_VERSION);
    Ok(())
}

/// Get current schema version from database
async fn get_current_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn.query("SELECT MAX(version) FROM schema_migrations", ()).await?;

    if let Some(row) = rows.next().await? {
        let version: Option<i32> = row.get(0)?;
        Ok(version.unwrap_or(0))
    } else {
        Ok(0)
    }
}

/// Record that a migration was applied
async fn record_migration(conn: &Connection, version: i32, description: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?, ?, ?)",
        libsql::params![version, now, description],
    )
    .await?;

    tracing::info!("Applied migration v{}: {}", version, description);
    Ok(())
}

/// Migration v1: monitors and heartbeats tables
async fn run_migration_v1(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS monitors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            url TEXT NOT NULL,
            check_type TEXT NOT NULL,
            interval_seconds INTEGER NOT NULL DEFAULT 60,
            retry_interval_seconds INTEGER NOT NULL DEFAULT 60,
            resend_interval_seconds INTEGER NOT NULL DEFAULT 0,
            max_retries INTEGER NOT NULL DEFAULT 0,
            timeout_seconds INTEGER NOT NULL DEFAULT 10,
            enabled INTEGER NOT NULL DEFAULT 1,
            accepted_status_ranges TEXT NOT NULL DEFAULT '[\"200-299\"]',
            ignore_tls INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS heartbeats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            monitor_uuid TEXT NOT NULL,
            time INTEGER NOT NULL,
            status TEXT NOT NULL,
            message TEXT NOT NULL DEFAULT '',
            ping_ms INTEGER,
            important INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (monitor_uuid) REFERENCES monitors(uuid) ON DELETE CASCADE
        )",
        (),
    )
    .await?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_monitors_uuid ON monitors(uuid)", ()).await?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_monitors_enabled ON monitors(enabled)", ())
        .await?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_heartbeats_monitor_uuid ON heartbeats(monitor_uuid)",
        (),
    )
    .await?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_heartbeats_time ON heartbeats(time DESC)", ())
        .await?;

    Ok(())
}

/// Migration v2: multi-entry health check support.
///
/// Adds the health-check config columns to monitors, the nullable entry key
/// to heartbeats (NULL is the monitor-level roll-up row), and the composite
/// index serving per-entry history and latest-heartbeat lookups.
async fn run_migration_v2(conn: &Connection) -> Result<()> {
    // JSON array of entry keys to monitor; NULL means evaluate all entries
    conn.execute("ALTER TABLE monitors ADD COLUMN health_check_entries TEXT", ()).await?;

    // Path to the entries container in the response body
    conn.execute(
        "ALTER TABLE monitors ADD COLUMN health_entries_path TEXT NOT NULL DEFAULT 'entries'",
        (),
    )
    .await?;

    // Status field within each entry document
    conn.execute(
        "ALTER TABLE monitors ADD COLUMN health_status_field TEXT NOT NULL DEFAULT 'status'",
        (),
    )
    .await?;

    // Expected value for a healthy entry
    conn.execute(
        "ALTER TABLE monitors ADD COLUMN health_expected_value TEXT NOT NULL DEFAULT 'Healthy'",
        (),
    )
    .await?;

    // Entry key for multi-entry heartbeats; NULL for the roll-up row
    conn.execute("ALTER TABLE heartbeats ADD COLUMN entry_key TEXT", ()).await?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS monitor_entry_time_index
         ON heartbeats(monitor_uuid, entry_key, time)",
        (),
    )
    .await?;

    tracing::info!("Added multi-entry health check columns");
    Ok(())
}
