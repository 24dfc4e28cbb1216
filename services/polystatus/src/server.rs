//! HTTP API: push ingestion, read-only views and channel tests

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::channel::{ChannelConfig, ChannelId};
use crate::dispatcher::NotificationDispatcher;
use crate::monitor::{
    ActiveTarget, Monitor, MonitorId, MonitorKind, MonitorLog, MonitorStatus, OwnerId,
};
use crate::recorder::HeartbeatRecorder;
use crate::store::Store;
use crate::PolyStatusError;

/// Number of log entries shown on a monitor's detail view
pub const RECENT_LOG_LIMIT: usize = 50;

/// Shared handles for the request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub recorder: Arc<HeartbeatRecorder>,
    pub dispatcher: Arc<NotificationDispatcher>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    pub total: usize,
    pub up: usize,
    pub down: usize,
    pub pending: usize,
}

impl MonitorStats {
    pub fn from_monitors(monitors: &[Monitor]) -> Self {
        let count = |status| monitors.iter().filter(|m| m.status == status).count();
        Self {
            total: monitors.len(),
            up: count(MonitorStatus::Up),
            down: count(MonitorStatus::Down),
            pending: count(MonitorStatus::Pending),
        }
    }
}

/// Kind as shown to API clients; the push key stays server side
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KindView {
    Active(ActiveTarget),
    Passive,
}

#[derive(Debug, Serialize)]
struct MonitorView {
    id: MonitorId,
    owner_id: OwnerId,
    name: String,
    kind: KindView,
    status: MonitorStatus,
    is_paused: bool,
    timeout_seconds: u64,
    last_check_at: Option<DateTime<Utc>>,
    last_latency_ms: Option<u64>,
}

impl From<Monitor> for MonitorView {
    fn from(monitor: Monitor) -> Self {
        let kind = match monitor.kind {
            MonitorKind::Active(target) => KindView::Active(target),
            MonitorKind::Passive { .. } => KindView::Passive,
        };
        Self {
            id: monitor.id,
            owner_id: monitor.owner_id,
            name: monitor.name,
            kind,
            status: monitor.status,
            is_paused: monitor.is_paused,
            timeout_seconds: monitor.timeout_seconds,
            last_check_at: monitor.last_check_at,
            last_latency_ms: monitor.last_latency_ms,
        }
    }
}

#[derive(Serialize)]
struct MonitorList {
    stats: MonitorStats,
    monitors: Vec<MonitorView>,
}

#[derive(Serialize)]
struct MonitorDetail {
    monitor: MonitorView,
    logs: Vec<MonitorLog>,
}

/// Error wrapper mapping crate errors onto HTTP statuses
#[derive(Debug)]
pub struct ApiError(PolyStatusError);

impl From<PolyStatusError> for ApiError {
    fn from(e: PolyStatusError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PolyStatusError::NotFound(_) => StatusCode::NOT_FOUND,
            PolyStatusError::Config(_)
            | PolyStatusError::ChannelConfig(_)
            | PolyStatusError::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/push/{key}", post(push_handler))
        .route("/api/v1/monitors", get(list_monitors_handler))
        .route("/api/v1/monitors/{id}", get(monitor_detail_handler))
        .route("/api/v1/notifications", get(history_handler))
        .route("/api/v1/channels/test", post(test_config_handler))
        .route(
            "/api/v1/owners/{owner}/channels/{id}/test",
            post(test_channel_handler),
        )
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

async fn push_handler(
    State(app): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    crate::push::ingest(app.store.as_ref(), &app.recorder, &key, &body).await?;
    Ok(Json(json!({ "success": true })))
}

async fn list_monitors_handler(State(app): State<AppState>) -> ApiResult<impl IntoResponse> {
    let monitors = app.store.list_monitors().await?;
    Ok(Json(MonitorList {
        stats: MonitorStats::from_monitors(&monitors),
        monitors: monitors.into_iter().map(MonitorView::from).collect(),
    }))
}

async fn monitor_detail_handler(
    State(app): State<AppState>,
    Path(id): Path<MonitorId>,
) -> ApiResult<impl IntoResponse> {
    let monitor = app
        .store
        .get_monitor(id)
        .await?
        .ok_or_else(|| PolyStatusError::NotFound(format!("Monitor {}", id)))?;
    let logs = app.store.recent_logs(id, RECENT_LOG_LIMIT).await?;

    Ok(Json(MonitorDetail {
        monitor: monitor.into(),
        logs,
    }))
}

async fn history_handler(State(app): State<AppState>) -> impl IntoResponse {
    Json(app.dispatcher.history().await)
}

async fn test_config_handler(
    State(app): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let config: ChannelConfig =
        serde_json::from_slice(&body).map_err(PolyStatusError::from)?;
    app.dispatcher.test_with_config(&config).await?;
    Ok(Json(json!({ "success": true, "message": "Test message sent" })))
}

async fn test_channel_handler(
    State(app): State<AppState>,
    Path((owner, id)): Path<(OwnerId, ChannelId)>,
) -> ApiResult<Json<serde_json::Value>> {
    app.dispatcher.send_test(owner, id).await?;
    Ok(Json(json!({ "success": true, "message": "Test message sent" })))
}
