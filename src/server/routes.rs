//! Router configuration for the labeling server.
//!
//! This module defines the HTTP routes and applies CORS, request tracing and
//! static file serving.
//!
//! # Route Structure
//!
//! ```text
//! /health                              - Health check
//! /api/elements                        - Elements sorted by area
//! /api/get-labels, /api/save-labels    - Label collection
//! /api/save-annotation?file=           - Read / replace annotation file
//! /api/append                          - Merge annotation records
//! /api/remove-annotation?file=         - Remove one label
//! /api/register, /api/login            - Accounts and tokens
//! /api/logout, /api/user               - Bearer token session
//! /api/proxy/*                         - Upstream API forwarding
//! /login, /logout, /user, /proxy/*     - Aliases of the /api routes
//! /*                                   - Static assets
//! ```
//!
//! # Example
//!
//! ```ignore
//! use element_labeler::server::{create_router, AppState, RouterConfig};
//!
//! let state = AppState::new(store, auth, upstream);
//! let config = RouterConfig::new("public")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(state, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5001").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::auth::{login_handler, logout_handler, register_handler, user_handler};
use super::handlers::{
    append_handler, elements_handler, get_annotation_handler, get_labels_handler, health_handler,
    remove_annotation_handler, save_annotation_handler, save_labels_handler, AppState,
};
use super::proxy::{bounding_boxes_handler, create_handler, proxy_append_handler, user_tasks_handler};
use crate::db::Database;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Directory served for paths no API route matches (None = no static files)
    pub static_dir: Option<PathBuf>,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a configuration serving static assets from `static_dir`.
    ///
    /// By default CORS allows any origin and tracing is enabled.
    pub fn new(static_dir: impl Into<PathBuf>) -> Self {
        Self {
            static_dir: Some(static_dir.into()),
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Create a configuration that serves only the API.
    pub fn api_only() -> Self {
        Self {
            static_dir: None,
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Session and proxy routes are mounted twice, under `/api` and at the root,
/// so older clients that call `/login` or `/proxy/...` keep working.
pub fn create_router<D: Database>(state: AppState<D>, config: RouterConfig) -> Router {
    let api = Router::new()
        .route("/elements", get(elements_handler::<D>))
        .route("/get-labels", get(get_labels_handler::<D>))
        .route("/save-labels", post(save_labels_handler::<D>))
        .route(
            "/save-annotation",
            get(get_annotation_handler::<D>).post(save_annotation_handler::<D>),
        )
        .route("/append", post(append_handler::<D>))
        .route("/remove-annotation", post(remove_annotation_handler::<D>))
        .route("/register", post(register_handler::<D>))
        .merge(session_routes::<D>())
        .nest("/proxy", proxy_routes::<D>());

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .merge(session_routes::<D>())
        .nest("/proxy", proxy_routes::<D>())
        .with_state(state);

    if let Some(static_dir) = &config.static_dir {
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    let router = router.layer(build_cors_layer(&config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Login, logout and current-user routes.
fn session_routes<D: Database>() -> Router<AppState<D>> {
    Router::new()
        .route("/login", post(login_handler::<D>))
        .route("/logout", post(logout_handler::<D>))
        .route("/user", get(user_handler::<D>))
}

/// Upstream forwarding routes.
fn proxy_routes<D: Database>() -> Router<AppState<D>> {
    Router::new()
        .route("/get-user-tasks", post(user_tasks_handler::<D>))
        .route("/create", post(create_handler::<D>))
        .route("/append", post(proxy_append_handler::<D>))
        .route("/get-bounding-boxes", get(bounding_boxes_handler::<D>))
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
