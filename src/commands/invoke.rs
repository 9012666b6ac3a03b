//! Config loading and the one-shot `invoke` subcommand.

use std::path::PathBuf;

use super::error::AppError;
use crate::bridge::{CommandBridge, CommandInvocation, CommandRunner};
use crate::config::{AppConfig, ConfigLoader, WorkerConfig};
use crate::display;

/// Load configuration from `path`, or from the default search paths.
///
/// # Errors
///
/// Returns an error if `path` is given but missing, or a config file cannot
/// be parsed.
pub fn load_config(path: Option<PathBuf>) -> Result<AppConfig, AppError> {
    let loader = match path {
        Some(path) if !path.exists() => return Err(AppError::ConfigNotFound(path)),
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    Ok(loader.load()?)
}

/// Run one worker command and print its outcome.
///
/// Returns whether the worker reported success. The command name is
/// validated before anything is spawned.
///
/// # Errors
///
/// Returns `AppError::Invocation` if the command name is empty or contains
/// whitespace.
pub async fn invoke(
    worker: &WorkerConfig,
    command: String,
    args: Vec<String>,
) -> Result<bool, AppError> {
    let invocation = CommandInvocation::new(command, args)?;
    let bridge = CommandBridge::from_config(worker);

    display::print_invocation_start(&invocation);
    match bridge.invoke(invocation).await {
        Ok(result) => {
            display::print_result(&result);
            Ok(result.success() == Some(true))
        }
        Err(e) => {
            display::print_failure(&e);
            Ok(false)
        }
    }
}
