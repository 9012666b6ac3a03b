//! Worker output capture and structured-result extraction.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Everything the bridge collected from a worker that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code, or `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutcome {
    /// Decode raw stream buffers as UTF-8.
    ///
    /// Invalid sequences are replaced rather than dropped, and reported so a
    /// misconfigured worker locale shows up in the logs.
    #[must_use]
    pub fn from_raw(exit_code: Option<i32>, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            exit_code,
            stdout: decode_utf8("stdout", stdout),
            stderr: decode_utf8("stderr", stderr),
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

fn decode_utf8(stream: &'static str, bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            tracing::warn!(
                stream,
                valid_up_to = e.valid_up_to(),
                "Worker output is not valid UTF-8, replacing invalid sequences"
            );
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// The JSON value a worker prints to report completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredResult(serde_json::Value);

impl StructuredResult {
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The worker's `success` flag, if present and boolean.
    #[must_use]
    pub fn success(&self) -> Option<bool> {
        self.0.get("success").and_then(serde_json::Value::as_bool)
    }

    /// The worker's `error` message, if it reported one.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.0.get("error").and_then(serde_json::Value::as_str)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Deserialize the payload into a command-specific type.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not have the expected shape.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.0)
    }
}

/// Payload of a successful `generate_report` run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportPayload {
    pub project_data: ProjectData,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub report: Option<String>,
}

/// Recruitment progress figures inside a report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectData {
    #[serde(default)]
    pub project_name: Option<String>,
    pub overall_completes: u64,
    pub total_quota: u64,
    /// Fraction in `[0, 1]`.
    pub completion_percentage: f64,
    /// Segment name to category counts.
    #[serde(default)]
    pub segments: serde_json::Map<String, serde_json::Value>,
}

impl ProjectData {
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.total_quota.saturating_sub(self.overall_completes)
    }
}

/// Why no structured result could be pulled out of stdout.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Stdout held nothing but whitespace.
    #[error("worker printed nothing to stdout")]
    Empty,
    /// The selected line, or the whole buffer, was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(String),
}

/// Pull the structured result out of a worker's stdout.
///
/// The first line whose trimmed text starts with `{` is taken as the result
/// line, and scanning stops there even if that line fails to parse. When no
/// line looks like an object, the whole trimmed buffer is parsed instead.
///
/// # Errors
///
/// Returns `ExtractError` if stdout is empty or the candidate is not JSON.
pub fn extract_structured_result(stdout: &str) -> Result<StructuredResult, ExtractError> {
    if let Some(line) = stdout.lines().map(str::trim).find(|l| l.starts_with('{')) {
        return serde_json::from_str(line)
            .map(StructuredResult)
            .map_err(|e| ExtractError::Json(e.to_string()));
    }

    let whole = stdout.trim();
    if whole.is_empty() {
        return Err(ExtractError::Empty);
    }
    serde_json::from_str(whole)
        .map(StructuredResult)
        .map_err(|e| ExtractError::Json(e.to_string()))
}
