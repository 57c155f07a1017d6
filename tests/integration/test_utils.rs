//! Test utilities for integration tests.
//!
//! Builds routers over a temporary data directory and an in-memory database,
//! and runs a stub upstream API on an ephemeral port.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::{header, Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Mutex;

use element_labeler::{
    create_router, AnnotationStore, AppState, AuthService, MemoryDatabase, RouterConfig,
    UpstreamClient,
};

/// Base URL used when a test never reaches the upstream.
pub const UNUSED_UPSTREAM: &str = "http://127.0.0.1:9";

// =============================================================================
// Router Setup
// =============================================================================

/// A router over a fresh temp dir, plus handles to inspect its state.
pub struct TestApp {
    pub router: Router,
    pub data_dir: TempDir,
    pub db: Arc<MemoryDatabase>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_upstream(UNUSED_UPSTREAM)
    }

    pub fn with_upstream(api_url: &str) -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        let db = Arc::new(MemoryDatabase::new());
        let router = build_router(data_dir.path(), db.clone(), api_url, RouterConfig::api_only());

        Self {
            router,
            data_dir,
            db,
        }
    }

    pub fn path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Write `value` as a pretty JSON file in the data dir.
    pub fn write_json(&self, name: &str, value: &Value) {
        std::fs::write(
            self.path().join(name),
            serde_json::to_vec_pretty(value).unwrap(),
        )
        .unwrap();
    }

    /// Read a JSON file from the data dir.
    pub fn read_json(&self, name: &str) -> Value {
        let bytes = std::fs::read(self.path().join(name)).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Send a request and return status and parsed JSON body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        use tower::ServiceExt;

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }
}

/// Build a router over `data_dir` with the given database and upstream.
pub fn build_router(
    data_dir: &Path,
    db: Arc<MemoryDatabase>,
    api_url: &str,
    config: RouterConfig,
) -> Router {
    let state = AppState::new(
        AnnotationStore::new(data_dir),
        AuthService::new(db),
        UpstreamClient::new(api_url).unwrap(),
    );
    create_router(state, config.with_tracing(false))
}

// =============================================================================
// Requests and Responses
// =============================================================================

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap(),
    );
    request
}

/// Collect a response body as JSON (`Null` for an empty body).
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

/// Register and log in a user, returning the token.
pub async fn login_user(app: &TestApp, contact_number: &str, password: &str) -> String {
    let credentials = json!({"contactNumber": contact_number, "password": password});

    let (status, _) = app.send(post_json("/api/register", &credentials)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(post_json("/api/login", &credentials)).await;
    assert_eq!(status, StatusCode::OK);
    body["auth_token"].as_str().unwrap().to_string()
}

// =============================================================================
// Stub Upstream
// =============================================================================

/// A request received by the stub upstream.
#[derive(Debug, Clone)]
pub struct Received {
    pub path: String,
    pub body: Value,
}

/// Requests seen by a running stub upstream.
#[derive(Clone, Default)]
pub struct UpstreamLog(Arc<Mutex<Vec<Received>>>);

impl UpstreamLog {
    async fn push(&self, path: &str, body: Value) {
        self.0.lock().await.push(Received {
            path: path.to_string(),
            body,
        });
    }

    pub async fn requests(&self) -> Vec<Received> {
        self.0.lock().await.clone()
    }
}

/// Start a stub upstream API on 127.0.0.1 and return its base URL.
///
/// - `POST /get-user-tasks` answers `{tasks: [...]}`
/// - `POST /create` answers `201 {created: <filename>}`
/// - `POST /append` answers `{ok: true}`
/// - `GET /get/{name}` answers `{name, boxes}`; the name `broken` answers HTML
pub async fn spawn_upstream() -> (String, UpstreamLog) {
    let log = UpstreamLog::default();

    let app = Router::new()
        .route("/get-user-tasks", routing::post(stub_user_tasks))
        .route("/create", routing::post(stub_create))
        .route("/append", routing::post(stub_append))
        .route("/get/{name}", routing::get(stub_get))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), log)
}

async fn stub_user_tasks(State(log): State<UpstreamLog>, Json(body): Json<Value>) -> Json<Value> {
    log.push("/get-user-tasks", body.clone()).await;
    Json(json!({
        "tasks": [{"id": 1, "contact_number": body["contact_number"]}]
    }))
}

async fn stub_create(
    State(log): State<UpstreamLog>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    log.push("/create", body.clone()).await;
    (StatusCode::CREATED, Json(json!({"created": body["filename"]})))
}

async fn stub_append(State(log): State<UpstreamLog>, Json(body): Json<Value>) -> Json<Value> {
    log.push("/append", body).await;
    Json(json!({"ok": true}))
}

async fn stub_get(State(log): State<UpstreamLog>, UrlPath(name): UrlPath<String>) -> Response<Body> {
    log.push(&format!("/get/{}", name), Value::Null).await;
    if name == "broken" {
        return (StatusCode::OK, "<html>maintenance</html>").into_response();
    }
    Json(json!({"name": name, "boxes": [[0, 0, 10, 10]]})).into_response()
}
