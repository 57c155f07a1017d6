//! Registration, login and bearer token endpoints.

use axum::http::StatusCode;
use serde_json::json;

use element_labeler::Database;

use super::test_utils::{get, login_user, post_json, with_bearer, TestApp};

#[tokio::test]
async fn test_register_and_login() {
    let app = TestApp::new();
    let credentials = json!({"contactNumber": "5550001", "password": "secret"});

    let (status, body) = app.send(post_json("/api/register", &credentials)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User registered successfully");
    assert!(body["userId"].is_string());

    let (status, body) = app.send(post_json("/api/login", &credentials)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"], json!({"contactNumber": "5550001"}));
    assert_eq!(body["auth_token"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_register_duplicate_is_409() {
    let app = TestApp::new();
    let credentials = json!({"contactNumber": "5550001", "password": "secret"});
    app.send(post_json("/api/register", &credentials)).await;

    let (status, body) = app.send(post_json("/api/register", &credentials)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
    assert_eq!(body["message"], "User with this contact number already exists");
}

#[tokio::test]
async fn test_register_missing_fields_is_400() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json("/api/register", &json!({"contactNumber": "5550001"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Contact number and password are required");
}

#[tokio::test]
async fn test_login_failures_are_identical() {
    let app = TestApp::new();
    login_user(&app, "5550001", "secret").await;

    let wrong_password = app
        .send(post_json(
            "/api/login",
            &json!({"contactNumber": "5550001", "password": "nope"}),
        ))
        .await;
    let unknown_user = app
        .send(post_json(
            "/api/login",
            &json!({"contactNumber": "5559999", "password": "secret"}),
        ))
        .await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password.1["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_user_with_valid_token() {
    let app = TestApp::new();
    let token = login_user(&app, "5550001", "secret").await;

    let (status, body) = app.send(with_bearer(get("/api/user"), &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "user": {"contactNumber": "5550001"}})
    );
}

#[tokio::test]
async fn test_user_soft_failures() {
    let app = TestApp::new();

    let (status, body) = app.send(get("/api/user")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": false, "error": "Not authenticated", "auth_required": true})
    );

    let (status, body) = app.send(with_bearer(get("/api/user"), "bogus")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "Invalid or expired token");
    assert_eq!(body["auth_required"], true);
}

#[tokio::test]
async fn test_user_of_deleted_account() {
    let app = TestApp::new();
    let token = login_user(&app, "5550001", "secret").await;

    let user = app.db.find_user_by_contact("5550001").await.unwrap().unwrap();
    app.db.remove_user(user.id).await;

    let (status, body) = app.send(with_bearer(get("/api/user"), &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "User not found");
    assert_eq!(app.db.token_count().await, 0);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::new();
    let token = login_user(&app, "5550001", "secret").await;

    let (status, body) = app
        .send(with_bearer(post_json("/api/logout", &json!({})), &token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "message": "Logged out successfully"})
    );

    let (_, body) = app.send(with_bearer(get("/api/user"), &token)).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_logout_without_token_succeeds() {
    let app = TestApp::new();

    let (status, body) = app.send(post_json("/api/logout", &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_second_login_invalidates_first_token() {
    let app = TestApp::new();
    let first = login_user(&app, "5550001", "secret").await;

    let (_, body) = app
        .send(post_json(
            "/api/login",
            &json!({"contactNumber": "5550001", "password": "secret"}),
        ))
        .await;
    let second = body["auth_token"].as_str().unwrap().to_string();

    let (_, body) = app.send(with_bearer(get("/api/user"), &first)).await;
    assert_eq!(body["success"], false);
    let (_, body) = app.send(with_bearer(get("/api/user"), &second)).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_alias_routes() {
    let app = TestApp::new();
    login_user(&app, "5550001", "secret").await;

    let (status, body) = app
        .send(post_json(
            "/login",
            &json!({"contactNumber": "5550001", "password": "secret"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["auth_token"].as_str().unwrap().to_string();

    let (_, body) = app.send(with_bearer(get("/user"), &token)).await;
    assert_eq!(body["user"]["contactNumber"], "5550001");

    let (status, _) = app
        .send(with_bearer(post_json("/logout", &json!({})), &token))
        .await;
    assert_eq!(status, StatusCode::OK);
}
