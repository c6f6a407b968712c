//! REST endpoints for task submission, polling, listing and deletion.

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};
use uuid::Uuid;

use super::model::{Counts, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT, TaskQuery, TaskStatus};
use super::service::TaskService;
use crate::error::{ServiceError, ValidationError};

/// Shared state for task routes.
#[derive(Clone)]
pub struct TaskRouteState {
    pub service: TaskService,
}

// ── Request / response bodies ───────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// QASM3 source.
    pub qc: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub task_id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Counts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListItem {
    pub id: Uuid,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub items: Vec<TaskListItem>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskDeleteResponse {
    pub task_id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Raw list parameters; validated by hand so bad values get an [`ErrorResponse`].
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

// ── Errors ──────────────────────────────────────────────────────────

/// An error rendered as `ErrorResponse` JSON.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.to_string(),
                message: message.into(),
                detail: None,
            },
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.body.detail = Some(detail.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", err.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => e.into(),
            ServiceError::NotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "not_found", "Task not found.")
            }
            ServiceError::Database(e) => {
                error!(error = %e, "Database error while handling request");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred.",
                )
                .with_detail(e.to_string())
            }
        }
    }
}

fn parse_task_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| {
        ApiError::new(StatusCode::BAD_REQUEST, "invalid_task_id", "Task id must be a UUID.")
            .with_detail(e.to_string())
    })
}

fn invalid_query(field: &str, reason: impl Into<String>) -> ApiError {
    ValidationError::InvalidQuery {
        field: field.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl ListParams {
    fn into_query(self) -> Result<TaskQuery, ApiError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<TaskStatus>()
                    .map_err(|e| invalid_query("status", e))?,
            ),
        };

        let limit = match self.limit.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_LIST_LIMIT,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if (1..=MAX_LIST_LIMIT).contains(&n) => n,
                _ => {
                    return Err(invalid_query(
                        "limit",
                        format!("must be an integer between 1 and {MAX_LIST_LIMIT}"),
                    ));
                }
            },
        };

        let offset = match self.offset.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| invalid_query("offset", "must be a non-negative integer"))?,
        };

        Ok(TaskQuery {
            status,
            limit,
            offset,
        })
    }
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /tasks
///
/// Creates a pending task and starts its run. Returns immediately.
async fn submit_task(
    State(state): State<TaskRouteState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        ApiError::new(status, "invalid_request", "Request body must be JSON with a 'qc' string.")
            .with_detail(rejection.body_text())
    })?;

    let task = state.service.submit(request.qc).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            task_id: task.id,
            message: "Task submitted successfully.".to_string(),
        }),
    ))
}

/// GET /tasks/{id}
///
/// Status plus counts once completed.
async fn get_task(
    State(state): State<TaskRouteState>,
    Path(id): Path<String>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    let id = parse_task_id(&id)?;
    let task = state.service.get(id).await?;
    debug!(task_id = %id, status = %task.status, "Task polled");

    Ok(Json(TaskStatusResponse {
        status: task.status,
        message: task.status_message().map(str::to_string),
        result: task.result,
    }))
}

/// GET /tasks?status=&limit=&offset=
async fn list_tasks(
    State(state): State<TaskRouteState>,
    Query(params): Query<ListParams>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let query = params.into_query()?;
    let page = state.service.list(&query).await?;

    Ok(Json(TaskListResponse {
        items: page
            .items
            .into_iter()
            .map(|task| TaskListItem {
                id: task.id,
                status: task.status,
                created_at: task.created_at,
                updated_at: task.updated_at,
            })
            .collect(),
        total: page.total,
        limit: query.limit,
        offset: query.offset,
    }))
}

/// DELETE /tasks/{id}
///
/// Cancels a pending task's run (best-effort), then removes the task.
async fn delete_task(
    State(state): State<TaskRouteState>,
    Path(id): Path<String>,
) -> Result<Json<TaskDeleteResponse>, ApiError> {
    let id = parse_task_id(&id)?;
    state.service.delete(id).await?;
    Ok(Json(TaskDeleteResponse {
        task_id: id,
        message: "Task deleted successfully.".to_string(),
    }))
}

/// GET /health
async fn health(State(state): State<TaskRouteState>) -> impl IntoResponse {
    let (database, orchestrator) = state.service.health().await;
    let healthy = database && orchestrator;
    let component = |ok: bool| if ok { "ok" } else { "error" };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "database": component(database),
            "orchestrator": component(orchestrator),
        })),
    )
}

/// GET /
async fn root() -> impl IntoResponse {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "links": {
            "tasks": "/tasks",
            "health": "/health",
        },
    }))
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the task REST routes.
pub fn task_routes(state: TaskRouteState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(submit_task))
        .route("/tasks/{id}", get(get_task).delete(delete_task))
        .with_state(state)
}

/// CORS for the configured origins; any origin when none parse.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|s| s.parse().ok()).collect();
    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };
    cors.allow_headers(Any).allow_methods(Any).max_age(Duration::from_secs(600))
}

/// The full HTTP application: routes plus request-id, tracing, CORS and
/// body-size layers.
pub fn app(service: TaskService, cors_origins: &[String]) -> Router {
    let request_id = HeaderName::from_static("x-request-id");
    // JSON escaping can double a payload; the service enforces the real limit.
    let body_limit = service
        .max_payload_bytes()
        .saturating_mul(2)
        .saturating_add(4096);

    task_routes(TaskRouteState { service })
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(cors_layer(cors_origins)),
        )
}
