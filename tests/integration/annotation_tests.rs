//! Element, label and annotation file endpoints.

use axum::http::StatusCode;
use serde_json::json;

use super::test_utils::{get, post_json, TestApp};

// =============================================================================
// Elements
// =============================================================================

#[tokio::test]
async fn test_elements_sorted_by_area_and_cached() {
    let app = TestApp::new();
    app.write_json(
        "elements.json",
        &json!([
            {"selector": "span.small", "width": 10, "height": 10},
            {"selector": "div.big", "width": 100, "height": 50},
            {"selector": "p.mid", "width": 20, "height": 30}
        ]),
    );

    let (status, first) = app.send(get("/api/elements")).await;
    assert_eq!(status, StatusCode::OK);

    let selectors: Vec<_> = first
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["selector"].as_str().unwrap())
        .collect();
    assert_eq!(selectors, vec!["div.big", "p.mid", "span.small"]);
    assert_eq!(first[0]["area"], 5000);

    assert!(app.path().join("sorted_elements.json").exists());

    let (_, second) = app.send(get("/api/elements")).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_elements_missing_is_404() {
    let app = TestApp::new();

    let (status, body) = app.send(get("/api/elements")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["message"], "No elements found");
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_element_without_dimensions_is_500() {
    let app = TestApp::new();
    app.write_json("elements.json", &json!([{"selector": "div.x", "width": 10}]));

    let (status, body) = app.send(get("/api/elements")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("div.x"));
}

// =============================================================================
// Labels
// =============================================================================

#[tokio::test]
async fn test_get_labels_empty() {
    let app = TestApp::new();

    let (status, body) = app.send(get("/api/get-labels")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_save_labels_add_then_update() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json(
            "/api/save-labels",
            &json!([{"selector": ".btn#ok", "label": "Confirm"}]),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Labels saved successfully");
    assert_eq!(body["count"], 1);
    assert_eq!(body["added"], 1);
    assert_eq!(body["updated"], 0);

    let (_, body) = app
        .send(post_json(
            "/api/save-labels",
            &json!([{"selector": ".btn#ok", "label": "OK"}]),
        ))
        .await;
    assert_eq!(body["added"], 0);
    assert_eq!(body["updated"], 1);

    let (_, labels) = app.send(get("/api/get-labels")).await;
    assert_eq!(labels.as_array().unwrap().len(), 1);
    assert_eq!(labels[0]["label"], "OK");
    assert!(labels[0]["timestamp"].is_string());
}

#[tokio::test]
async fn test_save_labels_enriches_with_element() {
    let app = TestApp::new();
    app.write_json(
        "elements.json",
        &json!([{"selector": "nav.menu", "tag": "nav", "width": 300, "height": 40}]),
    );

    let (status, _) = app
        .send(post_json(
            "/api/save-labels",
            &json!([{"selector": "nav.menu", "label": "Navigation"}]),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let stored = app.read_json("detailed_labels.json");
    assert_eq!(stored[0]["tag"], "nav");
    assert_eq!(stored[0]["width"], 300);
    assert_eq!(stored[0]["label"], "Navigation");
    assert_eq!(app.read_json("labels.json"), stored);
}

#[tokio::test]
async fn test_save_labels_rejects_non_array() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json("/api/save-labels", &json!({"selector": "a"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

// =============================================================================
// Annotation Files
// =============================================================================

#[tokio::test]
async fn test_save_annotation_roundtrip() {
    let app = TestApp::new();

    let (status, body) = app.send(get("/api/save-annotation?file=page.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let data = json!([{"selector": "h1", "label": ["Title"]}]);
    let (status, body) = app
        .send(post_json("/api/save-annotation?file=page.json", &data))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success"}));

    let (_, body) = app.send(get("/api/save-annotation?file=page.json")).await;
    assert_eq!(body, data);
}

#[tokio::test]
async fn test_save_annotation_invalid_file_names() {
    let app = TestApp::new();

    for uri in [
        "/api/save-annotation",
        "/api/save-annotation?file=page.txt",
        "/api/save-annotation?file=../secret.json",
        "/api/save-annotation?file=a%2Fb.json",
    ] {
        let (status, body) = app.send(get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"], "invalid_file_name");
    }
}

#[tokio::test]
async fn test_append_normalizes_record() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json(
            "/api/append",
            &json!({
                "filename": "https://host/pages/page.json?v=2",
                "data": [{"selector": "div.card", "label": "Header"}]
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Updated annotations for 1 elements");

    let stored = app.read_json("page.json");
    let record = &stored[0];
    assert_eq!(record["tag"], "div");
    assert_eq!(record["class"], "card");
    assert_eq!(record["id"], "");
    assert_eq!(record["label"], json!(["Header"]));
    assert_eq!(record["color"], "#F44336");
    assert!(record["timestamp"].is_string());
}

#[tokio::test]
async fn test_append_replaces_by_selector_and_skips_invalid() {
    let app = TestApp::new();
    app.write_json(
        "page.json",
        &json!([
            {"selector": "a.link", "label": ["Old"]},
            {"selector": "p", "label": ["Keep"]}
        ]),
    );

    let (status, body) = app
        .send(post_json(
            "/api/append",
            &json!({
                "filename": "page.json",
                "data": [
                    {"selector": "a.link", "label": "New"},
                    {"selector": "span"},
                    {"label": "orphan"}
                ]
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["written"], 1);
    assert_eq!(body["skipped"], 2);

    let stored = app.read_json("page.json");
    let records = stored.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["selector"], "p");
    assert_eq!(records[1]["selector"], "a.link");
    assert_eq!(records[1]["label"], json!(["New"]));
}

#[tokio::test]
async fn test_append_validation() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json(
            "/api/append",
            &json!({"filename": "page.html", "data": [{"selector": "a", "label": "x"}]}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_file_name");

    let (status, body) = app
        .send(post_json("/api/append", &json!({"filename": "page.json", "data": []})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid annotation data");
}

#[tokio::test]
async fn test_remove_annotation_label_then_record() {
    let app = TestApp::new();
    app.write_json(
        "page.json",
        &json!([{"selector": "div.card", "label": ["Header", "Card"]}]),
    );

    let request = json!({"selector": "div.card", "label": "Header"});
    let (status, body) = app
        .send(post_json("/api/remove-annotation?file=page.json", &request))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success", "result": "label_removed"}));
    assert_eq!(app.read_json("page.json")[0]["label"], json!(["Card"]));

    let request = json!({"selector": "div.card", "label": "Card"});
    let (_, body) = app
        .send(post_json("/api/remove-annotation?file=page.json", &request))
        .await;
    assert_eq!(body["result"], "record_removed");
    assert_eq!(app.read_json("page.json"), json!([]));
}

#[tokio::test]
async fn test_remove_annotation_legacy_labels() {
    let app = TestApp::new();
    app.write_json(
        "page.json",
        &json!([{"selector": "li", "labels": ["Item", "Entry"], "label": "Entry"}]),
    );

    let (status, _) = app
        .send(post_json(
            "/api/remove-annotation?file=page.json",
            &json!({"selector": "li", "label": "Entry"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let stored = app.read_json("page.json");
    assert_eq!(stored[0]["labels"], json!(["Item"]));
    assert_eq!(stored[0]["label"], "Item");
}

#[tokio::test]
async fn test_remove_annotation_errors() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json(
            "/api/remove-annotation?file=page.json",
            &json!({"selector": "li"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Selector and label are required");

    let (status, body) = app
        .send(post_json(
            "/api/remove-annotation?file=page.json",
            &json!({"selector": "li", "label": "x"}),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Annotation file not found");

    app.write_json("page.json", &json!([{"selector": "p", "label": ["x"]}]));
    let (status, body) = app
        .send(post_json(
            "/api/remove-annotation?file=page.json",
            &json!({"selector": "li", "label": "x"}),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Annotation not found");
}
