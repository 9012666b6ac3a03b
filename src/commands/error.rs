//! Errors surfaced by the CLI subcommands.

use std::path::PathBuf;

use crate::bridge::InvalidInvocation;
use crate::config::ConfigError;
use crate::server::ServerError;
use crate::store::StoreError;

/// Failure of a whole subcommand.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Server(#[from] ServerError),

    /// The command given on the command line is not a usable worker command.
    #[error("Invalid worker command: {0}")]
    Invocation(#[from] InvalidInvocation),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_error_display() {
        let err = AppError::from(InvalidInvocation::Whitespace("send emails".to_string()));
        assert_eq!(
            err.to_string(),
            "Invalid worker command: Command name 'send emails' must not contain whitespace"
        );
    }

    #[test]
    fn test_store_error_keeps_source() {
        let err = AppError::from(StoreError::TaskCancelled);
        assert_eq!(err.to_string(), "Blocking task cancelled");
        assert!(matches!(err, AppError::Store(StoreError::TaskCancelled)));
    }
}
