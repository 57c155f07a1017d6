//! Handlers forwarding to the upstream annotation API.
//!
//! Each handler validates the request, calls [`UpstreamClient`] and replies
//! with the upstream status and JSON body.
//!
//! [`UpstreamClient`]: crate::proxy::UpstreamClient

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::db::Database;
use crate::proxy::UpstreamReply;

use super::handlers::{ApiError, AppState};

/// Body of `POST /api/proxy/get-user-tasks`.
#[derive(Debug, Deserialize)]
pub struct UserTasksRequest {
    /// String or number
    #[serde(default)]
    pub contact_number: Option<Value>,
}

/// Body of `POST /api/proxy/create`.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    #[serde(default)]
    pub filename: Option<String>,
}

/// Body of `POST /api/proxy/append`.
#[derive(Debug, Deserialize)]
pub struct ProxyAppendRequest {
    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default)]
    pub data: Option<Value>,
}

/// Query of `GET /api/proxy/get-bounding-boxes`.
#[derive(Debug, Deserialize)]
pub struct BoundingBoxesQuery {
    #[serde(default)]
    pub json_name: Option<String>,
}

/// `POST /api/proxy/get-user-tasks`
pub async fn user_tasks_handler<D: Database>(
    State(state): State<AppState<D>>,
    body: Result<Json<UserTasksRequest>, JsonRejection>,
) -> Result<UpstreamReply, ApiError> {
    let Json(request) = body?;
    Ok(state
        .upstream
        .get_user_tasks(request.contact_number.as_ref())
        .await?)
}

/// `POST /api/proxy/create`
pub async fn create_handler<D: Database>(
    State(state): State<AppState<D>>,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<UpstreamReply, ApiError> {
    let Json(request) = body?;
    Ok(state.upstream.create(request.filename.as_deref()).await?)
}

/// `POST /api/proxy/append`
///
/// One record without a selector or label rejects the whole batch with `400`.
pub async fn proxy_append_handler<D: Database>(
    State(state): State<AppState<D>>,
    body: Result<Json<ProxyAppendRequest>, JsonRejection>,
) -> Result<UpstreamReply, ApiError> {
    let Json(request) = body?;
    Ok(state
        .upstream
        .append(request.filename.as_deref(), request.data)
        .await?)
}

/// `GET /api/proxy/get-bounding-boxes?json_name=<name>.json`
pub async fn bounding_boxes_handler<D: Database>(
    State(state): State<AppState<D>>,
    Query(query): Query<BoundingBoxesQuery>,
) -> Result<UpstreamReply, ApiError> {
    Ok(state
        .upstream
        .get_bounding_boxes(query.json_name.as_deref())
        .await?)
}
