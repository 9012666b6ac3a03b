//! HTTP handlers for the admin and client API.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;

use super::api::{
    ChatRequest, CommandFailure, CommandReply, HealthResponse, LogsQuery, LogsResponse,
    SettingsResponse, UpdateSettingsRequest, UpdateSettingsResponse,
};
use crate::bridge::{CommandInvocation, CommandRunner};
use crate::chat::{ChatReply, ChatResponder};
use crate::store::{LogLevel, Store};

/// Result type for handlers whose failures still answer HTTP 200.
pub type ApiResult<T> = Result<Json<T>, Json<CommandFailure>>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runs worker commands.
    pub runner: Arc<dyn CommandRunner>,
    /// Settings and system log storage.
    pub store: Store,
    /// Answers client chat messages.
    pub chat: ChatResponder,
}

impl AppState {
    /// Create app state; the chat responder shares `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, store: Store) -> Self {
        let chat = ChatResponder::new(Arc::clone(&runner));
        Self {
            runner,
            store,
            chat,
        }
    }

    /// Invoke a worker command and record the outcome in the log store.
    async fn run_admin_command(&self, invocation: CommandInvocation, label: &str) -> CommandReply {
        let command = invocation.command().to_string();
        self.store
            .record(LogLevel::Info, format!("{label} requested"))
            .await;

        match self.runner.invoke(invocation).await {
            Ok(result) => {
                if result.success() == Some(true) {
                    self.store
                        .record(LogLevel::Info, format!("{label} completed"))
                        .await;
                } else {
                    let reason = result.error_message().unwrap_or("no error message");
                    tracing::warn!(command = %command, error = %reason, "Worker reported failure");
                    self.store
                        .record(LogLevel::Error, format!("{label} failed: {reason}"))
                        .await;
                }
                CommandReply::Worker(result)
            }
            Err(e) => {
                tracing::error!(command = %command, error = %e, kind = e.kind(), "Admin command failed");
                self.store
                    .record(LogLevel::Error, format!("{label} failed: {e}"))
                    .await;
                CommandReply::Failed(CommandFailure::new(e.to_string(), Some(e.kind())))
            }
        }
    }
}

/// POST /api/admin/generate-report - Run the report worker.
pub async fn post_generate_report(State(state): State<AppState>) -> Json<CommandReply> {
    Json(
        state
            .run_admin_command(CommandInvocation::generate_report(), "Report generation")
            .await,
    )
}

/// POST /api/admin/send-emails - Run the email worker.
pub async fn post_send_emails(State(state): State<AppState>) -> Json<CommandReply> {
    Json(
        state
            .run_admin_command(CommandInvocation::send_emails(), "Email delivery")
            .await,
    )
}

/// POST /api/admin/init-db - Initialise the worker's database.
pub async fn post_init_db(State(state): State<AppState>) -> Json<CommandReply> {
    Json(
        state
            .run_admin_command(CommandInvocation::init_db(), "Database initialisation")
            .await,
    )
}

/// GET /api/admin/settings - All settings as typed values.
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<SettingsResponse> {
    match state.store.get_all_settings().await {
        Ok(settings) => Ok(Json(SettingsResponse {
            success: true,
            settings,
        })),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read settings");
            Err(Json(CommandFailure::new(e.to_string(), None)))
        }
    }
}

/// POST /api/admin/settings - Upsert the given settings.
pub async fn post_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> ApiResult<UpdateSettingsResponse> {
    match state.store.upsert_settings(&request.settings).await {
        Ok(updated) => {
            let keys: Vec<&str> = request.settings.keys().map(String::as_str).collect();
            state
                .store
                .record(
                    LogLevel::Info,
                    format!("Settings updated: {}", keys.join(", ")),
                )
                .await;
            Ok(Json(UpdateSettingsResponse {
                success: true,
                updated,
            }))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update settings");
            state
                .store
                .record(LogLevel::Error, format!("Settings update failed: {e}"))
                .await;
            Err(Json(CommandFailure::new(e.to_string(), None)))
        }
    }
}

/// GET /api/admin/logs - Most recent system log entries.
pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<LogsResponse> {
    match state.store.recent_logs(query.effective_limit()).await {
        Ok(logs) => Ok(Json(LogsResponse {
            success: true,
            logs,
        })),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read system logs");
            Err(Json(CommandFailure::new(e.to_string(), None)))
        }
    }
}

/// POST /api/client/chat - Answer a client question.
pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatReply> {
    Json(state.chat.respond(&request.message).await)
}

/// GET /api/health - Liveness probe.
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
