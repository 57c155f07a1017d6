//! # Element Labeler
//!
//! Backend for a web tool that labels UI elements of captured pages.
//!
//! The server keeps element metadata, labels and per-page annotation files as
//! JSON collections on disk, authenticates users with opaque bearer tokens
//! stored in a database, and forwards task and annotation operations to an
//! upstream annotation API.
//!
//! ## Features
//!
//! - **Label storage**: labels are enriched with the metadata of the element
//!   they name and merged by selector
//! - **Annotation files**: per-page records normalized and merged by selector
//! - **Token auth**: Argon2id password hashes, one expiring token per user
//! - **Upstream proxy**: validated forwarding with status passthrough
//!
//! ## Architecture
//!
//! - [`store`] - Flat-file JSON collections and record normalization
//! - [`db`] - User and token storage behind the [`Database`] trait
//! - [`auth`] - Registration, login and token resolution
//! - [`proxy`] - Client for the upstream annotation API
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use element_labeler::{
//!     create_router, AnnotationStore, AppState, AuthService, MemoryDatabase, RouterConfig,
//!     UpstreamClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(MemoryDatabase::new());
//!     let state = AppState::new(
//!         AnnotationStore::new("."),
//!         AuthService::new(db),
//!         UpstreamClient::new("http://localhost:8000")?,
//!     );
//!
//!     let router = create_router(state, RouterConfig::new("public"));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5001").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod proxy;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use auth::{AuthService, Identity, LoginSession, TokenResolution, Unauthenticated};
pub use config::{BackendArgs, CheckConfig, Cli, Command, Environment, ServeConfig};
pub use db::{AuthToken, Database, DatabaseUrl, MemoryDatabase, PgDatabase, User};
pub use error::{AuthError, DbError, ProxyError, StoreError};
pub use proxy::{UpstreamClient, UpstreamReply};
pub use server::{create_router, health_handler, AppState, ErrorResponse, RouterConfig};
pub use store::{
    AnnotationStore, AppendOutcome, NormalizePolicy, Record, RemoveOutcome, SaveLabelsOutcome,
};
