//! Append-only system log.

use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::db::Store;
use super::error::StoreError;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    /// A level written by another process that this crate does not know.
    Unknown,
}

impl LogLevel {
    /// Returns the string representation for database storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a stored level, ignoring case; `WARN` is accepted for `WARNING`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARNING" | "WARN" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One stored log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub level: LogLevel,
    pub message: String,
    pub created_at: String,
}

impl Store {
    /// Append a log entry and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be inserted.
    pub async fn append_log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Result<i64, StoreError> {
        let message = message.into();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO system_logs (log_level, message) VALUES (?1, ?2)",
                params![level.as_str(), message],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Append a log entry, reporting failure through `tracing` instead of
    /// returning it.
    pub async fn record(&self, level: LogLevel, message: impl Into<String>) {
        if let Err(e) = self.append_log(level, message).await {
            tracing::warn!(error = %e, "Failed to write system log entry");
        }
    }

    /// The most recent `limit` entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, log_level, message, created_at
                 FROM system_logs ORDER BY id DESC LIMIT ?1",
            )?;
            let entries = stmt
                .query_map(params![limit], |row| {
                    let id: i64 = row.get(0)?;
                    let raw: Option<String> = row.get(1)?;
                    let level = raw.as_deref().and_then(LogLevel::parse).unwrap_or_else(|| {
                        tracing::warn!(id, level = ?raw, "Unrecognised log level in system_logs");
                        LogLevel::Unknown
                    });
                    Ok(LogEntry {
                        id,
                        level,
                        message: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        created_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
    }
}
