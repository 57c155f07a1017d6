//! Bearer token authentication endpoints.
//!
//! Clients log in with a contact number and password and receive an opaque
//! token, which they send back as `Authorization: Bearer <token>`.
//!
//! ```text
//! POST /api/register  {contactNumber, password}  -> {success, message, userId}
//! POST /api/login     {contactNumber, password}  -> {success, message, user, auth_token}
//! POST /api/logout    Bearer                     -> {success, message}
//! GET  /api/user      Bearer                     -> {success, user}
//! ```
//!
//! `/api/user` never answers 401. An unauthenticated caller gets
//! `200 {success: false, error, auth_required: true}` so browser clients can
//! redirect to the login page without tripping CORS preflight handling.

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::auth::{Identity, TokenResolution};
use crate::db::Database;

use super::handlers::{ApiError, AppState};

// =============================================================================
// Bearer Token Extraction
// =============================================================================

/// The bearer token of a request, if it carries one.
///
/// Extraction never fails: a missing header or one that is not of the form
/// `Bearer <token>` yields `BearerToken(None)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Parse an `Authorization` header value.
pub fn parse_bearer(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_bearer)
            .map(str::to_string);

        Ok(BearerToken(token))
    }
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body of register and login requests.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(rename = "contactNumber", default)]
    pub contact_number: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// Response from `POST /api/register`.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Response from `POST /api/login`.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: Identity,
    pub auth_token: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/register`
pub async fn register_handler<D: Database>(
    State(state): State<AppState<D>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Json(credentials) = body?;
    let user_id = state
        .auth
        .register(
            credentials.contact_number.as_deref().unwrap_or(""),
            credentials.password.as_deref().unwrap_or(""),
        )
        .await?;

    Ok(Json(RegisterResponse {
        success: true,
        message: "User registered successfully".to_string(),
        user_id: user_id.to_string(),
    }))
}

/// `POST /api/login`
///
/// Unknown contact numbers and wrong passwords both get
/// `401 invalid_credentials`.
pub async fn login_handler<D: Database>(
    State(state): State<AppState<D>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(credentials) = body?;
    let session = state
        .auth
        .login(
            credentials.contact_number.as_deref().unwrap_or(""),
            credentials.password.as_deref().unwrap_or(""),
        )
        .await?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        user: Identity {
            user_id: session.user_id,
            contact_number: session.contact_number,
        },
        auth_token: session.token,
    }))
}

/// `POST /api/logout`
///
/// Succeeds whether or not the token was known.
pub async fn logout_handler<D: Database>(
    State(state): State<AppState<D>>,
    token: BearerToken,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.auth.logout(token.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Logged out successfully",
    })))
}

/// `GET /api/user`
///
/// Returns the caller's identity, or a soft `200` failure with
/// `auth_required: true`. Storage failures answer
/// `500 {success: false, error}`.
pub async fn user_handler<D: Database>(
    State(state): State<AppState<D>>,
    token: BearerToken,
) -> Response {
    match state.auth.resolve_token(token.as_deref()).await {
        Ok(TokenResolution::Authenticated(identity)) => {
            Json(json!({ "success": true, "user": identity })).into_response()
        }
        Ok(TokenResolution::Unauthenticated(reason)) => {
            debug!(reason = ?reason, "Unauthenticated user lookup");
            Json(json!({
                "success": false,
                "error": reason.message(),
                "auth_required": true,
            }))
            .into_response()
        }
        Err(e) => {
            error!(status = 500, "User lookup failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
