//! Bridge error types.

use std::time::Duration;

/// Terminal failure of a worker invocation.
///
/// Every variant carries the command name so callers can log the failure
/// without holding on to the invocation. The type is `Clone` because a
/// coalesced invocation hands the same outcome to every waiting caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The worker process could not be started at all.
    #[error("Failed to start worker for '{command}': {reason}")]
    SpawnFailure { command: String, reason: String },

    /// The worker ran and exited unsuccessfully.
    #[error("Worker '{command}' exited with {}: {stderr}", describe_exit(.exit_code))]
    NonZeroExit {
        command: String,
        /// `None` when the process was terminated by a signal.
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The worker exited cleanly but printed no recognizable result.
    #[error("Worker '{command}' produced no structured result: {reason}")]
    UnparsableOutput {
        command: String,
        reason: String,
        stdout: String,
    },

    /// The worker ran past its deadline and was terminated.
    #[error("Worker '{command}' timed out after {}s", secs(.after))]
    Timeout {
        command: String,
        after: Duration,
        stderr: String,
    },

    /// The task driving the invocation died before producing an outcome.
    #[error("Invocation of '{command}' aborted: {reason}")]
    Aborted { command: String, reason: String },
}

impl BridgeError {
    /// Name of the command whose invocation failed.
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::SpawnFailure { command, .. }
            | Self::NonZeroExit { command, .. }
            | Self::UnparsableOutput { command, .. }
            | Self::Timeout { command, .. }
            | Self::Aborted { command, .. } => command,
        }
    }

    /// Short machine-readable tag for logs and API payloads.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SpawnFailure { .. } => "spawn_failure",
            Self::NonZeroExit { .. } => "non_zero_exit",
            Self::UnparsableOutput { .. } => "unparsable_output",
            Self::Timeout { .. } => "timeout",
            Self::Aborted { .. } => "aborted",
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

fn secs(after: &Duration) -> f64 {
    after.as_secs_f64()
}

/// Rejected attempt to build a [`CommandInvocation`](super::CommandInvocation).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInvocation {
    #[error("Command name must not be empty")]
    EmptyCommand,

    #[error("Command name '{0}' must not contain whitespace")]
    Whitespace(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_failure_display() {
        let err = BridgeError::SpawnFailure {
            command: "generate_report".to_string(),
            reason: "No such file or directory (os error 2)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to start worker for 'generate_report': No such file or directory (os error 2)"
        );
        assert_eq!(err.kind(), "spawn_failure");
    }

    #[test]
    fn test_non_zero_exit_display() {
        let err = BridgeError::NonZeroExit {
            command: "send_emails".to_string(),
            exit_code: Some(2),
            stderr: "Traceback".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Worker 'send_emails' exited with code 2: Traceback"
        );
    }

    #[test]
    fn test_signal_exit_display() {
        let err = BridgeError::NonZeroExit {
            command: "init_db".to_string(),
            exit_code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("exited with a signal"));
    }

    #[test]
    fn test_timeout_display() {
        let err = BridgeError::Timeout {
            command: "generate_report".to_string(),
            after: Duration::from_millis(1500),
            stderr: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "Worker 'generate_report' timed out after 1.5s"
        );
        assert_eq!(err.command(), "generate_report");
    }

    #[test]
    fn test_invalid_invocation_display() {
        assert_eq!(
            InvalidInvocation::EmptyCommand.to_string(),
            "Command name must not be empty"
        );
        assert!(InvalidInvocation::Whitespace("a b".to_string())
            .to_string()
            .contains("'a b'"));
    }
}
