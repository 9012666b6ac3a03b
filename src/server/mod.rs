//! HTTP surface: admin endpoints, client chat and health.

mod api;
mod app;
mod error;
mod handlers;

pub use api::{
    ChatRequest, CommandFailure, CommandReply, HealthResponse, LogsQuery, LogsResponse,
    SettingsResponse, UpdateSettingsRequest, UpdateSettingsResponse, MAX_LOGS_LIMIT,
};
pub use app::Server;
pub use error::ServerError;
pub use handlers::{AppState, ApiResult};
