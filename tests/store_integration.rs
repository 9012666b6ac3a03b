//! Integration tests for the settings and log store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use recruit_bridge::store::{
    LogLevel, SettingKind, SettingValue, Store, DEFAULT_SETTINGS, WORKER_DB_FILE,
};
use rusqlite::{params, Connection};
use serde_json::json;
use tempfile::TempDir;

/// Helper to create a unique database path in a temp directory.
fn temp_db_path(temp_dir: &TempDir, name: &str) -> PathBuf {
    temp_dir
        .path()
        .join(format!("{}-{}.db", name, std::process::id()))
}

#[tokio::test]
async fn test_store_creates_nested_directories() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("a").join("b").join("store.db");

    let store = Store::open(&db_path).await.expect("Failed to open store");

    assert!(db_path.exists());
    assert_eq!(store.path(), Some(db_path.as_path()));
}

#[tokio::test]
async fn test_defaults_seeded_on_first_open() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = Store::open(temp_db_path(&temp_dir, "defaults"))
        .await
        .expect("Failed to open store");

    let settings = store.get_all_settings().await.unwrap();
    assert_eq!(settings.len(), DEFAULT_SETTINGS.len());
    assert_eq!(settings["schedule_frequency"], SettingValue::from("weekly"));
    assert_eq!(settings["client_emails"], SettingValue::Json(json!([])));
    assert!(settings["email_template"]
        .as_text()
        .unwrap()
        .contains("{project_name}"));
}

#[tokio::test]
async fn test_settings_survive_reopen_and_defaults_do_not_overwrite() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_db_path(&temp_dir, "reopen");

    {
        let store = Store::open(&db_path).await.unwrap();
        store
            .upsert_setting("schedule_day", &SettingValue::from("friday"), Utc::now())
            .await
            .unwrap();
    }

    let store = Store::open(&db_path).await.unwrap();
    assert_eq!(
        store.get_setting("schedule_day").await.unwrap(),
        Some(SettingValue::from("friday"))
    );
}

#[tokio::test]
async fn test_settings_round_trip_per_kind() {
    let store = Store::open_in_memory().await.unwrap();

    let mut settings = BTreeMap::new();
    settings.insert("text".to_string(), SettingValue::from("{not json}"));
    settings.insert("number".to_string(), SettingValue::from(json!(2.5)));
    settings.insert("list".to_string(), SettingValue::from(json!(["a", "b"])));
    settings.insert("object".to_string(), SettingValue::from(json!({"k": 1})));
    settings.insert("flag".to_string(), SettingValue::from(json!(true)));

    assert_eq!(store.upsert_settings(&settings).await.unwrap(), 5);

    let stored = store.get_all_settings().await.unwrap();
    for (key, value) in &settings {
        assert_eq!(&stored[key], value, "mismatch for {key}");
    }
    assert_eq!(stored["text"].kind(), SettingKind::Text);
    assert_eq!(stored["number"].kind(), SettingKind::Number);
    assert_eq!(stored["flag"].kind(), SettingKind::Json);
}

#[tokio::test]
async fn test_upsert_replaces_kind() {
    let store = Store::open_in_memory().await.unwrap();
    store
        .upsert_setting("retries", &SettingValue::from("three"), Utc::now())
        .await
        .unwrap();
    store
        .upsert_setting("retries", &SettingValue::from(json!(3)), Utc::now())
        .await
        .unwrap();

    let value = store.get_setting("retries").await.unwrap().unwrap();
    assert_eq!(value.kind(), SettingKind::Number);
    assert_eq!(value.to_json(), json!(3));
}

#[tokio::test]
async fn test_missing_setting_is_none() {
    let store = Store::open_in_memory().await.unwrap();
    assert_eq!(store.get_setting("no_such_key").await.unwrap(), None);
}

#[tokio::test]
async fn test_logs_ordered_newest_first() {
    let store = Store::open_in_memory().await.unwrap();
    let first = store.append_log(LogLevel::Info, "started").await.unwrap();
    let second = store
        .append_log(LogLevel::Error, "report failed")
        .await
        .unwrap();
    assert!(second > first);

    let logs = store.recent_logs(10).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].id, second);
    assert_eq!(logs[0].level, LogLevel::Error);
    assert_eq!(logs[1].message, "started");
    assert!(!logs[1].created_at.is_empty());
}

#[tokio::test]
async fn test_logs_limit_and_non_ascii() {
    let store = Store::open_in_memory().await.unwrap();
    for i in 0..10 {
        store.record(LogLevel::Info, format!("entry {i}")).await;
    }
    store.record(LogLevel::Warning, "Überprüfung läuft").await;

    let logs = store.recent_logs(3).await.unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].message, "Überprüfung läuft");
    assert_eq!(logs[0].level, LogLevel::Warning);
    assert_eq!(logs[2].message, "entry 8");
}

#[tokio::test]
async fn test_concurrent_writes_through_clones() {
    let store = Store::open_in_memory().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .append_log(LogLevel::Info, format!("writer {i}"))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.recent_logs(100).await.unwrap().len(), 8);
}

/// Read a setting the way the worker does.
fn worker_get_setting(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT setting_value FROM admin_settings WHERE setting_key = ?",
        params![key],
        |row| row.get(0),
    )
    .ok()
}

#[tokio::test]
async fn test_worker_reads_settings_written_by_store() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join(WORKER_DB_FILE);
    let store = Store::open(&db_path).await.unwrap();

    store
        .upsert_setting("anthropic_api_key", &SettingValue::from("sk-test"), Utc::now())
        .await
        .unwrap();
    store
        .upsert_setting(
            "client_emails",
            &SettingValue::from(json!(["a@example.com", "b@example.com"])),
            Utc::now(),
        )
        .await
        .unwrap();

    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(
        worker_get_setting(&conn, "anthropic_api_key").as_deref(),
        Some("sk-test")
    );

    // The worker runs json.loads on this value
    let emails = worker_get_setting(&conn, "client_emails").unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&emails).unwrap();
    assert_eq!(parsed, json!(["a@example.com", "b@example.com"]));
}

#[tokio::test]
async fn test_store_reads_rows_written_by_worker() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join(WORKER_DB_FILE);
    let store = Store::open(&db_path).await.unwrap();

    {
        let conn = Connection::open(&db_path).unwrap();
        // The worker's own update_setting and log_message statements
        conn.execute(
            "INSERT OR REPLACE INTO admin_settings (setting_key, setting_value, updated_at)
             VALUES (?, ?, ?)",
            params!["client_emails", r#"["ops@example.com"]"#, "2026-10-17 09:00:00.000000"],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO system_logs (log_level, message) VALUES (?, ?)",
            params!["INFO", "Email sent successfully to ops@example.com"],
        )
        .unwrap();
    }

    assert_eq!(
        store.get_setting("client_emails").await.unwrap(),
        Some(SettingValue::Json(json!(["ops@example.com"])))
    );

    let logs = store.recent_logs(1).await.unwrap();
    assert_eq!(logs[0].message, "Email sent successfully to ops@example.com");
    assert_eq!(logs[0].level, LogLevel::Info);
}
