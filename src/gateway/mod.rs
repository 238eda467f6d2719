//! HTTP API server for the gateway.
//!
//! REST endpoints for chatting with the assistant and for managing tasks
//! directly. Every route except health requires a bearer token; the token's
//! subject is the acting user.

pub mod auth;

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{FromRef, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::agent::AgentLoop;
use crate::errors::TaskpilotError;
use crate::store::tasks::normalize_title;
use crate::store::{ConversationStore, Database, TaskStatus, TaskUpdate};
use auth::{AuthUser, JwtAuth};

/// Max message size for the chat API: 1 MB.
const MAX_MESSAGE_SIZE: usize = 1_048_576;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AgentLoop>,
    pub db: Arc<Database>,
    pub auth: Arc<JwtAuth>,
}

impl FromRef<AppState> for Arc<JwtAuth> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Request body for POST /api/chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Continue this conversation; a new one is started when omitted.
    pub conversation_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub status: Option<String>,
}

/// Error response: `{"error": ..., "detail": ...}` with a matching status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    detail: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            detail: None,
        }
    }

    fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    fn task_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Task not found")
    }
}

impl From<TaskpilotError> for ApiError {
    fn from(err: TaskpilotError) -> Self {
        match &err {
            TaskpilotError::AccessDenied { .. } => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            TaskpilotError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            TaskpilotError::Auth(msg) => Self::new(StatusCode::UNAUTHORIZED, msg.clone()),
            _ => {
                error!("request failed: {}", err);
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: "Agent failed to process the request".to_string(),
                    detail: Some(err.to_string()),
                }
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        TaskpilotError::from_anyhow(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.detail {
            Some(detail) => serde_json::json!({"error": self.error, "detail": detail}),
            None => serde_json::json!({"error": self.error}),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Build the HTTP API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/conversations", get(list_conversations_handler))
        .route(
            "/api/conversations/{id}/messages",
            get(conversation_messages_handler),
        )
        .route("/api/tasks", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/api/tasks/{id}",
            get(get_task_handler)
                .patch(update_task_handler)
                .delete(delete_task_handler),
        )
        .route("/api/tasks/{id}/toggle", post(toggle_task_handler))
        .with_state(state)
}

/// GET /api/health — health check endpoint with completion provider counters.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = state.agent.provider_metrics();
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "completions": {
            "requests": metrics.request_count,
            "tokens": metrics.token_count,
            "errors": metrics.error_count
        }
    }))
}

/// POST /api/chat — send a message and receive the assistant's reply.
async fn chat_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if body.message.len() > MAX_MESSAGE_SIZE {
        return Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "message too large",
        ));
    }
    if body.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    debug!(
        "chat request: user={}, conversation={:?}, content_len={}",
        user_id,
        body.conversation_id,
        body.message.len()
    );
    let reply = state
        .agent
        .process_exchange(&user_id, &body.message, body.conversation_id)
        .await
        .inspect_err(|e| {
            if e.is_user_facing() {
                warn!("chat request rejected for {}: {}", user_id, e);
            }
        })?;
    Ok(Json(reply).into_response())
}

/// GET /api/conversations — the caller's conversations, most recent first.
async fn list_conversations_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Response, ApiError> {
    let conversations = state.db.list_conversations(&user_id).await?;
    Ok(Json(conversations).into_response())
}

/// GET /api/conversations/{id}/messages
async fn conversation_messages_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(conversation_id): Path<i64>,
) -> Result<Response, ApiError> {
    match state.db.get_conversation(conversation_id)? {
        None => {
            return Err(TaskpilotError::NotFound(conversation_id.to_string()).into());
        }
        Some(conv) if conv.owner_id != user_id => {
            return Err(TaskpilotError::AccessDenied { conversation_id }.into());
        }
        Some(_) => {}
    }
    let messages = state.db.load_history(conversation_id).await?;
    Ok(Json(messages).into_response())
}

/// GET /api/tasks?status=
async fn list_tasks_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<TaskQuery>,
) -> Result<Response, ApiError> {
    let status = match query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(raw.parse::<TaskStatus>().map_err(ApiError::bad_request)?),
        None => None,
    };
    let tasks = state.db.list_tasks(&user_id, status)?;
    Ok(Json(tasks).into_response())
}

/// POST /api/tasks
async fn create_task_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateTaskRequest>,
) -> Result<Response, ApiError> {
    normalize_title(&body.title).map_err(ApiError::bad_request)?;
    let task = state
        .db
        .create_task(&user_id, &body.title, &body.description)?;
    info!("task {} created for {}", task.id, user_id);
    Ok((StatusCode::CREATED, Json(task)).into_response())
}

/// GET /api/tasks/{id}
async fn get_task_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<i64>,
) -> Result<Response, ApiError> {
    let task = state
        .db
        .get_task(&user_id, task_id)?
        .ok_or_else(ApiError::task_not_found)?;
    Ok(Json(task).into_response())
}

/// PATCH /api/tasks/{id} — only the fields present in the body change.
async fn update_task_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<i64>,
    Json(update): Json<TaskUpdate>,
) -> Result<Response, ApiError> {
    if let Some(title) = &update.title {
        normalize_title(title).map_err(ApiError::bad_request)?;
    }
    let task = state
        .db
        .update_task(&user_id, task_id, &update)?
        .ok_or_else(ApiError::task_not_found)?;
    Ok(Json(task).into_response())
}

/// DELETE /api/tasks/{id}
async fn delete_task_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<i64>,
) -> Result<Response, ApiError> {
    if !state.db.delete_task(&user_id, task_id)? {
        return Err(ApiError::task_not_found());
    }
    info!("task {} deleted for {}", task_id, user_id);
    Ok(Json(serde_json::json!({"message": "Task deleted"})).into_response())
}

/// POST /api/tasks/{id}/toggle — flip between PENDING and COMPLETED.
async fn toggle_task_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<i64>,
) -> Result<Response, ApiError> {
    let task = state
        .db
        .toggle_task(&user_id, task_id)?
        .ok_or_else(ApiError::task_not_found)?;
    Ok(Json(task).into_response())
}

/// Start the HTTP API server and return its join handle.
pub async fn start(
    host: &str,
    port: u16,
    state: AppState,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = build_router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP API listening on {}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP API server error: {}", e);
        }
    });

    Ok(handle)
}
