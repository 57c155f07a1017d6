//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │            /api/*   /login /logout /user   /proxy/*             │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────┐  ┌──────────┐   │
//! │  │  handlers   │  │    auth     │  │  proxy   │  │  routes  │   │
//! │  │ (store API) │  │ (bearer)    │  │(upstream)│  │ (router) │   │
//! │  └─────────────┘  └─────────────┘  └──────────┘  └──────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod proxy;
pub mod routes;

pub use auth::{parse_bearer, BearerToken, Credentials, LoginResponse, RegisterResponse};
pub use handlers::{
    health_handler, ApiError, AppState, ErrorResponse, FileQueryParams, HealthResponse,
    SaveLabelsResponse,
};
pub use routes::{create_router, RouterConfig};
