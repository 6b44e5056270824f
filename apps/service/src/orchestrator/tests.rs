/// Integration tests for the check pipeline and its persistence:
/// - repository round-trips for monitors
/// - atomic heartbeat batches and per-key time ordering
/// - importance marking across consecutive cycles
/// - executor scenarios against a local HTTP responder
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tempfile::{TempDir, tempdir};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use crate::database::models::{Heartbeat, Monitor};
use crate::database::{Database, DatabaseImpl};
use crate::monitoring::recorder::HeartbeatRecorder;
use crate::monitoring::types::{CheckReport, CheckStatus, EntryVerdict};
use crate::monitoring::CheckExecutor;
use crate::pool::{LibsqlManager, LibsqlPool};

/// Helper to create a test database pool backed by a scratch file
async fn create_test_database() -> Result<(LibsqlPool, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");

    let db = libsql::Builder::new_local(&db_path).build().await?;
    let manager = LibsqlManager::new(db);
    let pool: LibsqlPool = deadpool::managed::Pool::builder(manager)
        .config(deadpool::managed::PoolConfig::default())
        .build()?;

    let conn = pool.get().await?;
    crate::database::initialize_database(&conn).await?;
    drop(conn);

    Ok((pool, temp_dir))
}

fn report(monitor_uuid: Uuid, entries: Vec<EntryVerdict>) -> CheckReport {
    let (status, message) = crate::monitoring::evaluator::aggregate(&entries);
    CheckReport { monitor_uuid, status, message, entries, duration_ms: 5 }
}

/// Minimal HTTP responder serving a fixed body on every connection
async fn spawn_http_responder(body: &'static str) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    Ok(addr)
}

#[tokio::test]
async fn monitor_round_trip() -> Result<()> {
    let (pool, _dir) = create_test_database().await?;
    let database = DatabaseImpl::new_from_pool(pool);

    let mut monitor = Monitor::new("carriers", "https://example.com/fedex/health");
    monitor.max_retries = 2;
    monitor.health_check.entries = vec!["FedEx".to_string(), "UPS".to_string()];
    monitor.health_check.entries_path = "data.services".to_string();

    let id = database.save_monitor(&monitor).await?;
    assert!(id > 0);

    let loaded = database.get_monitor_by_uuid(monitor.uuid).await?.expect("monitor not found");
    assert_eq!(loaded.name, "carriers");
    assert_eq!(loaded.max_retries, 2);
    assert_eq!(loaded.health_check.entries, vec!["FedEx", "UPS"]);
    assert_eq!(loaded.health_check.entries_path, "data.services");
    assert_eq!(loaded.health_check.status_field, "status");
    assert_eq!(loaded.health_check.expected_value, "Healthy");
    assert_eq!(loaded.accepted_status_ranges, vec!["200-299"]);

    let enabled = database.get_enabled_monitors().await?;
    assert_eq!(enabled.len(), 1);

    let mut paused = loaded.clone();
    paused.enabled = false;
    database.save_monitor(&paused).await?;
    assert!(database.get_enabled_monitors().await?.is_empty());

    database.delete_monitor(monitor.uuid).await?;
    assert!(database.get_monitor_by_uuid(monitor.uuid).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn heartbeat_batch_is_all_or_nothing() -> Result<()> {
    let (pool, _dir) = create_test_database().await?;
    let database = DatabaseImpl::new_from_pool(pool);

    let monitor = Monitor::new("svc", "https://example.com/health");
    database.save_monitor(&monitor).await?;

    let heartbeat = |id: Option<i64>, entry_key: Option<&str>| Heartbeat {
        id,
        monitor_uuid: monitor.uuid,
        entry_key: entry_key.map(str::to_string),
        time: chrono::Utc::now(),
        status: CheckStatus::Up,
        message: "all 1 entries healthy".to_string(),
        ping_ms: Some(10),
        important: true,
    };

    // Second row collides with the first on the primary key, so the insert
    // fails mid-batch; the transaction must leave zero rows behind.
    let batch = vec![heartbeat(Some(7), Some("a")), heartbeat(Some(7), None)];
    assert!(database.record_heartbeats(&batch).await.is_err());

    assert!(database.latest_heartbeat(monitor.uuid, None).await?.is_none());
    assert!(database.latest_heartbeat(monitor.uuid, Some("a")).await?.is_none());

    let valid = vec![heartbeat(None, Some("a")), heartbeat(None, None)];
    database.record_heartbeats(&valid).await?;
    assert!(database.latest_heartbeat(monitor.uuid, None).await?.is_some());

    Ok(())
}

#[tokio::test]
async fn heartbeat_times_strictly_increase_per_key() -> Result<()> {
    let (pool, _dir) = create_test_database().await?;
    let database = Arc::new(DatabaseImpl::new_from_pool(pool));
    let recorder = HeartbeatRecorder::new(database.clone());

    let monitor = Monitor::new("svc", "https://example.com/health");
    database.save_monitor(&monitor).await?;

    // Back-to-back cycles land within the same wall-clock millisecond; the
    // recorder must still hand out strictly increasing timestamps.
    for _ in 0..3 {
        let cycle = report(monitor.uuid, vec![EntryVerdict::up("x", "Healthy")]);
        recorder.record_cycle(&cycle, cycle.status).await?;
    }

    for key in [None, Some("x")] {
        let history = database.recent_heartbeats(monitor.uuid, key, 10).await?;
        assert_eq!(history.len(), 3);
        assert!(
            history.windows(2).all(|pair| pair[0].time > pair[1].time),
            "times must strictly decrease newest-first for key {key:?}"
        );
    }

    Ok(())
}

#[tokio::test]
async fn only_status_transitions_are_important() -> Result<()> {
    let (pool, _dir) = create_test_database().await?;
    let database = Arc::new(DatabaseImpl::new_from_pool(pool));
    let recorder = HeartbeatRecorder::new(database.clone());

    let monitor = Monitor::new("svc", "https://example.com/health");
    database.save_monitor(&monitor).await?;

    // Three consecutive healthy cycles: only the first heartbeat per key is
    // a transition (from no prior state).
    for _ in 0..3 {
        let cycle = report(monitor.uuid, vec![EntryVerdict::up("x", "Healthy")]);
        recorder.record_cycle(&cycle, cycle.status).await?;
    }

    let history = database.recent_heartbeats(monitor.uuid, Some("x"), 10).await?;
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|h| h.status == CheckStatus::Up));
    let important: Vec<bool> = history.iter().map(|h| h.important).collect();
    assert_eq!(important, vec![false, false, true], "newest first");

    // A failing cycle is a transition again.
    let failing = report(monitor.uuid, vec![EntryVerdict::down("x", "Down")]);
    recorder.record_cycle(&failing, failing.status).await?;

    let latest = database.latest_heartbeat(monitor.uuid, Some("x")).await?.unwrap();
    assert_eq!(latest.status, CheckStatus::Down);
    assert!(latest.important);

    Ok(())
}

#[tokio::test]
async fn cycle_failure_records_only_the_rollup() -> Result<()> {
    let (pool, _dir) = create_test_database().await?;
    let database = Arc::new(DatabaseImpl::new_from_pool(pool));
    let recorder = HeartbeatRecorder::new(database.clone());

    let monitor = Monitor::new("svc", "https://example.com/health");
    database.save_monitor(&monitor).await?;

    let failure = CheckReport {
        monitor_uuid: monitor.uuid,
        status: CheckStatus::Down,
        message: "entries path not found: data.services".to_string(),
        entries: Vec::new(),
        duration_ms: 3,
    };
    recorder.record_cycle(&failure, failure.status).await?;

    let rollup = database.latest_heartbeat(monitor.uuid, None).await?.unwrap();
    assert_eq!(rollup.status, CheckStatus::Down);
    assert!(rollup.message.contains("entries path not found"));

    // No per-entry rows may exist for a cycle that failed before entries
    // could be determined.
    let all = database.recent_heartbeats(monitor.uuid, Some("x"), 10).await?;
    assert!(all.is_empty());

    Ok(())
}

#[tokio::test]
async fn executor_evaluates_mixed_entries() -> Result<()> {
    let addr = spawn_http_responder(
        r#"{"entries":[{"name":"a","status":"Healthy"},{"name":"b","status":"Down"}]}"#,
    )
    .await?;

    let monitor = Monitor::new("svc", format!("http://{addr}/health"));
    let executor = CheckExecutor::new(10)?;

    let report = executor.execute_check(&monitor).await;
    assert_eq!(report.status, CheckStatus::Down);
    assert!(report.message.contains('b'), "message should name the down entry: {}", report.message);
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.entries[0].status, CheckStatus::Up);
    assert_eq!(report.entries[1].status, CheckStatus::Down);

    Ok(())
}

#[tokio::test]
async fn executor_synthesizes_missing_allow_listed_entries() -> Result<()> {
    let addr = spawn_http_responder(
        r#"{"entries":[{"name":"a","status":"Healthy"},{"name":"b","status":"Down"}]}"#,
    )
    .await?;

    let mut monitor = Monitor::new("svc", format!("http://{addr}/health"));
    monitor.health_check.entries = vec!["a".to_string(), "c".to_string()];
    let executor = CheckExecutor::new(10)?;

    let report = executor.execute_check(&monitor).await;
    assert_eq!(report.status, CheckStatus::Down);
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.entries[0].entry_key, "a");
    assert_eq!(report.entries[0].status, CheckStatus::Up);
    assert_eq!(report.entries[1].entry_key, "c");
    assert_eq!(report.entries[1].status, CheckStatus::Down);
    assert_eq!(report.entries[1].message, "entry not present in response");

    Ok(())
}

#[tokio::test]
async fn executor_fails_cycle_when_entries_path_is_absent() -> Result<()> {
    let addr = spawn_http_responder(r#"{"entries":[{"name":"a","status":"Healthy"}]}"#).await?;

    let mut monitor = Monitor::new("svc", format!("http://{addr}/health"));
    monitor.health_check.entries_path = "data.services".to_string();
    let executor = CheckExecutor::new(10)?;

    let report = executor.execute_check(&monitor).await;
    assert_eq!(report.status, CheckStatus::Down);
    assert!(report.message.contains("entries path not found"), "got: {}", report.message);
    assert!(report.entries.is_empty());

    Ok(())
}

#[tokio::test]
async fn executor_fails_cycle_on_malformed_body() -> Result<()> {
    let addr = spawn_http_responder("not json at all").await?;

    let monitor = Monitor::new("svc", format!("http://{addr}/health"));
    let executor = CheckExecutor::new(10)?;

    let report = executor.execute_check(&monitor).await;
    assert_eq!(report.status, CheckStatus::Down);
    assert!(report.message.contains("not valid JSON"), "got: {}", report.message);
    assert!(report.entries.is_empty());

    Ok(())
}
