//! CLI subcommand implementations.

mod error;
mod inspect;
mod invoke;
mod serve;

pub use error::AppError;
pub use inspect::{show_logs, show_settings};
pub use invoke::{invoke, load_config};
pub use serve::{initialise_worker, serve};
