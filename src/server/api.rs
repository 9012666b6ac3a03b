//! Request and response types for the HTTP endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bridge::StructuredResult;
use crate::store::{LogEntry, SettingValue};

/// Body returned by admin command endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandReply {
    /// The worker's own result object, passed through unchanged.
    Worker(StructuredResult),
    /// The bridge failed before a result was produced.
    Failed(CommandFailure),
}

/// Failure body for admin command endpoints.
///
/// Admin callers get the diagnostic text; handlers still answer HTTP 200.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandFailure {
    pub success: bool,
    pub error: String,
    /// Machine-readable failure tag, e.g. `non_zero_exit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl CommandFailure {
    #[must_use]
    pub fn new(error: impl Into<String>, kind: Option<&str>) -> Self {
        Self {
            success: false,
            error: error.into(),
            kind: kind.map(str::to_string),
        }
    }
}

/// Response for GET /api/admin/settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub settings: BTreeMap<String, SettingValue>,
}

/// Body for POST /api/admin/settings.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSettingsRequest {
    pub settings: BTreeMap<String, SettingValue>,
}

/// Response for POST /api/admin/settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettingsResponse {
    pub success: bool,
    pub updated: usize,
}

/// Query parameters for GET /api/admin/logs.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsQuery {
    /// Maximum number of entries to return.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl LogsQuery {
    /// Get the effective limit, capped at `MAX_LOGS_LIMIT`.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.min(MAX_LOGS_LIMIT)
    }
}

impl Default for LogsQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

/// Maximum allowed limit for log reads.
pub const MAX_LOGS_LIMIT: usize = 500;

const fn default_limit() -> usize {
    50
}

/// Response for GET /api/admin/logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResponse {
    pub success: bool,
    pub logs: Vec<LogEntry>,
}

/// Body for POST /api/client/chat.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Response for GET /api/health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_logs_query_limit_capped() {
        let query = LogsQuery { limit: 10_000 };
        assert_eq!(query.effective_limit(), MAX_LOGS_LIMIT);
        assert_eq!(LogsQuery::default().effective_limit(), 50);
    }

    #[test]
    fn test_command_failure_serialization() {
        let body = CommandFailure::new("Worker 'send_emails' exited with code 1: boom", Some("non_zero_exit"));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["kind"], json!("non_zero_exit"));

        let value = serde_json::to_value(CommandFailure::new("x", None)).unwrap();
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn test_update_settings_request_kinds() {
        let request: UpdateSettingsRequest = serde_json::from_value(json!({
            "settings": {
                "schedule_day": "friday",
                "client_emails": ["a@example.com"],
                "retries": 3
            }
        }))
        .unwrap();
        assert_eq!(request.settings["schedule_day"], SettingValue::from("friday"));
        assert_eq!(
            request.settings["client_emails"],
            SettingValue::Json(json!(["a@example.com"]))
        );
        assert!(matches!(request.settings["retries"], SettingValue::Number(_)));
    }

    #[test]
    fn test_chat_request_defaults_message() {
        let request: ChatRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.message.is_empty());
    }
}
