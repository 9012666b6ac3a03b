//! The `settings` and `logs` subcommands.

use super::error::AppError;
use crate::config::AppConfig;
use crate::display;
use crate::server::MAX_LOGS_LIMIT;
use crate::store::Store;

/// Print every stored setting.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or read.
pub async fn show_settings(config: &AppConfig) -> Result<(), AppError> {
    let store = Store::open(config.store_path()).await?;
    let settings = store.get_all_settings().await?;
    display::print_settings(&settings);
    Ok(())
}

/// Print the most recent `limit` log entries.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or read.
pub async fn show_logs(config: &AppConfig, limit: usize) -> Result<(), AppError> {
    let store = Store::open(config.store_path()).await?;
    let logs = store.recent_logs(limit.min(MAX_LOGS_LIMIT)).await?;
    display::print_logs(&logs);
    Ok(())
}
