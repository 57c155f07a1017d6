//! HTTP request handlers for the labeling API.
//!
//! This module holds the shared application state, the JSON error shape and
//! the handlers backed by the annotation store.
//!
//! # Endpoints
//!
//! - `GET /api/elements` - Elements sorted by area
//! - `GET /api/get-labels` - Stored labels
//! - `POST /api/save-labels` - Merge labels
//! - `GET|POST /api/save-annotation?file=` - Read or replace an annotation file
//! - `POST /api/append` - Merge records into an annotation file
//! - `POST /api/remove-annotation?file=` - Remove one label of a selector
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::auth::AuthService;
use crate::db::Database;
use crate::error::{AuthError, DbError, ProxyError, StoreError};
use crate::proxy::{UpstreamClient, UpstreamReply};
use crate::store::{AnnotationStore, Record};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<D: Database> {
    /// Flat-file element, label and annotation collections
    pub store: Arc<AnnotationStore>,

    /// Users and bearer tokens
    pub auth: Arc<AuthService<D>>,

    /// Client for the upstream annotation API
    pub upstream: Arc<UpstreamClient>,
}

impl<D: Database> AppState<D> {
    pub fn new(store: AnnotationStore, auth: AuthService<D>, upstream: UpstreamClient) -> Self {
        Self {
            store: Arc::new(store),
            auth: Arc::new(auth),
            upstream: Arc::new(upstream),
        }
    }
}

impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            auth: Arc::clone(&self.auth),
            upstream: Arc::clone(&self.upstream),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// `?file=<name>.json` query parameter.
#[derive(Debug, Deserialize)]
pub struct FileQueryParams {
    #[serde(default)]
    pub file: Option<String>,
}

impl FileQueryParams {
    fn file(&self) -> &str {
        self.file.as_deref().unwrap_or("")
    }
}

/// Body of `POST /api/append`.
#[derive(Debug, Deserialize)]
pub struct AppendRequest {
    /// Page URL or path; its basename names the annotation file
    #[serde(default)]
    pub filename: Option<String>,

    /// Records to merge
    #[serde(default)]
    pub data: Option<Value>,
}

/// Body of `POST /api/remove-annotation`.
#[derive(Debug, Deserialize)]
pub struct RemoveAnnotationRequest {
    #[serde(default)]
    pub selector: Option<String>,

    #[serde(default)]
    pub label: Option<Value>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Response from `POST /api/save-labels`.
#[derive(Debug, Serialize)]
pub struct SaveLabelsResponse {
    pub success: bool,
    pub message: String,
    pub count: usize,
    pub updated: usize,
    pub added: usize,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Log an error by severity and render it as an [`ErrorResponse`].
///
/// 5xx is logged at ERROR, 404 at DEBUG and other 4xx at WARN.
pub(crate) fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let error_response = ErrorResponse::with_status(error_type, message, status);
    (status, Json(error_response)).into_response()
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            StoreError::InvalidFileName(_) => (StatusCode::BAD_REQUEST, "invalid_file_name"),
            StoreError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            StoreError::InvalidData(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            StoreError::Io { .. } | StoreError::Json { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
        };

        error_response(status, error_type, self.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AuthError::MissingCredentials => (StatusCode::BAD_REQUEST, "invalid_request"),
            AuthError::AlreadyRegistered => (StatusCode::CONFLICT, "conflict"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AuthError::Hashing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AuthError::Database(DbError::Duplicate(_)) => (StatusCode::CONFLICT, "conflict"),
            AuthError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        };

        error_response(status, error_type, self.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ProxyError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ProxyError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            ProxyError::InvalidBaseUrl { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        error_response(status, error_type, self.to_string())
    }
}

impl IntoResponse for UpstreamReply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Any error a handler can return.
pub enum ApiError {
    Store(StoreError),
    Auth(AuthError),
    Proxy(ProxyError),
    /// The request body is not the expected JSON
    Body(JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Store(e) => e.into_response(),
            ApiError::Auth(e) => e.into_response(),
            ApiError::Proxy(e) => e.into_response(),
            ApiError::Body(rejection) => error_response(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                rejection.body_text(),
            ),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        ApiError::Proxy(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::Body(err)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/elements`
///
/// Returns the elements sorted by area, largest first. `404` when no element
/// file exists.
pub async fn elements_handler<D: Database>(
    State(state): State<AppState<D>>,
) -> Result<Json<Vec<Record>>, ApiError> {
    Ok(Json(state.store.get_elements().await?))
}

/// `GET /api/get-labels`
///
/// Always `200`; an empty list when no labels have been saved.
pub async fn get_labels_handler<D: Database>(
    State(state): State<AppState<D>>,
) -> Json<Vec<Value>> {
    Json(state.store.get_labels().await)
}

/// `POST /api/save-labels`
///
/// Body is an array of `{selector, label, timestamp?}` records.
pub async fn save_labels_handler<D: Database>(
    State(state): State<AppState<D>>,
    body: Result<Json<Vec<Record>>, JsonRejection>,
) -> Result<Json<SaveLabelsResponse>, ApiError> {
    let Json(labels) = body?;
    let outcome = state.store.save_labels(labels).await?;

    Ok(Json(SaveLabelsResponse {
        success: true,
        message: "Labels saved successfully".to_string(),
        count: outcome.count,
        updated: outcome.updated,
        added: outcome.added,
    }))
}

/// `GET /api/save-annotation?file=<name>.json`
///
/// Returns the file's content, or `[]` when it does not exist yet.
pub async fn get_annotation_handler<D: Database>(
    State(state): State<AppState<D>>,
    Query(query): Query<FileQueryParams>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.store.get_annotations(query.file()).await?))
}

/// `POST /api/save-annotation?file=<name>.json`
///
/// Replaces the file with the request body as submitted.
pub async fn save_annotation_handler<D: Database>(
    State(state): State<AppState<D>>,
    Query(query): Query<FileQueryParams>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(data) = body?;
    state.store.save_annotations(query.file(), &data).await?;
    Ok(Json(json!({ "status": "success" })))
}

/// `POST /api/append`
///
/// Body `{filename, data}`. Records without a selector or label are skipped.
pub async fn append_handler<D: Database>(
    State(state): State<AppState<D>>,
    body: Result<Json<AppendRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;
    let outcome = state
        .store
        .append_annotations(request.filename.as_deref().unwrap_or(""), request.data)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": format!("Updated annotations for {} elements", outcome.submitted),
        "file": outcome.file,
        "written": outcome.written,
        "skipped": outcome.skipped,
    })))
}

/// `POST /api/remove-annotation?file=<name>.json`
///
/// Body `{selector, label}`.
pub async fn remove_annotation_handler<D: Database>(
    State(state): State<AppState<D>>,
    Query(query): Query<FileQueryParams>,
    body: Result<Json<RemoveAnnotationRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;
    let outcome = state
        .store
        .remove_annotation(
            query.file(),
            request.selector.as_deref().unwrap_or(""),
            &request.label.unwrap_or(Value::Null),
        )
        .await?;

    Ok(Json(json!({ "status": "success", "result": outcome })))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
