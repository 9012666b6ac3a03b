//! Database schema for settings and logs.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;

/// File name the worker opens relative to its working directory.
pub const WORKER_DB_FILE: &str = "recruitment_web.db";

/// SQL schema for the web database.
///
/// Table and column names are the ones the worker reads and writes, so both
/// processes share settings and the system log.
pub const SCHEMA: &str = r"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS admin_settings (
    id INTEGER PRIMARY KEY,
    setting_key TEXT UNIQUE,
    setting_value TEXT,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS system_logs (
    id INTEGER PRIMARY KEY,
    log_level TEXT,
    message TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

-- Schema version table for migrations
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_system_logs_created_at ON system_logs(created_at);
";

/// Kind tag column added to the worker's settings table.
///
/// Rows the worker writes itself leave it NULL.
pub const ADD_KIND_COLUMN: &str = "ALTER TABLE admin_settings ADD COLUMN setting_kind TEXT \
     CHECK (setting_kind IS NULL OR setting_kind IN ('text', 'number', 'json'))";

/// Kind of a built-in setting, used when a row carries no kind tag.
#[must_use]
pub fn default_kind(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS
        .iter()
        .find(|(name, _, _)| *name == key)
        .map(|(_, kind, _)| *kind)
}

/// Settings inserted on first open; existing values are never overwritten.
pub const DEFAULT_SETTINGS: &[(&str, &str, &str)] = &[
    ("anthropic_api_key", "text", ""),
    ("email_user", "text", ""),
    ("email_password", "text", ""),
    ("client_emails", "json", "[]"),
    ("schedule_frequency", "text", "weekly"),
    ("schedule_day", "text", "tuesday"),
    ("schedule_time", "text", "09:00"),
    ("claude_model", "text", "claude-3-sonnet-20240229"),
    (
        "system_prompt",
        "text",
        "Analyze this pharmaceutical survey recruitment status and provide professional insights.",
    ),
    ("email_template", "text", DEFAULT_EMAIL_TEMPLATE),
];

const DEFAULT_EMAIL_TEMPLATE: &str = "Subject: Weekly Recruitment Update - {project_name}

Dear Valued Client,

Weekly recruitment progress update for {project_name}:

RECRUITMENT SUMMARY:
================================================================

Total Target: {total_quota} respondents
Current Completes: {overall_completes} respondents
Completion Rate: {completion_percentage}%

SEGMENT BREAKDOWN:
{segments_summary}

AI ANALYSIS:
{analysis}

Report generated: {analysis_date}

Best regards,
Survey Operations Team";

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_schema_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        for table in ["admin_settings", "system_logs", "schema_version"] {
            assert!(table_exists(&conn, table), "Table {table} should exist");
        }
    }

    #[test]
    fn test_kind_column_rejects_unknown_kind() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(ADD_KIND_COLUMN, []).unwrap();

        let result = conn.execute(
            "INSERT INTO admin_settings (setting_key, setting_value, setting_kind) VALUES ('a', 'x', 'blob')",
            [],
        );
        assert!(result.is_err());

        conn.execute(
            "INSERT INTO admin_settings (setting_key, setting_value) VALUES ('b', 'x')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(table_exists(&conn, "admin_settings"));
    }

    #[test]
    fn test_default_kind() {
        assert_eq!(default_kind("client_emails"), Some("json"));
        assert_eq!(default_kind("schedule_day"), Some("text"));
        assert_eq!(default_kind("unknown"), None);
    }

    #[test]
    fn test_default_settings_have_known_kinds() {
        for (key, kind, _) in DEFAULT_SETTINGS {
            assert!(
                ["text", "number", "json"].contains(kind),
                "{key} has unknown kind {kind}"
            );
        }
    }
}
