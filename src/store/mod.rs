//! `SQLite`-backed settings and log storage, shared with the worker.

mod db;
mod error;
mod logs;
mod schema;
mod settings;

pub use db::Store;
pub use error::StoreError;
pub use logs::{LogEntry, LogLevel};
pub use schema::{default_kind, DEFAULT_SETTINGS, SCHEMA, SCHEMA_VERSION, WORKER_DB_FILE};
pub use settings::{SettingKind, SettingValue};
