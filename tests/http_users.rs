use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use fieldbind::server::{AppState, build_router};
use fieldbind::{BindConfig, Binder, SnakeMapper};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app_with(config: BindConfig) -> axum::Router {
    let binder = Binder::new(Arc::new(SnakeMapper)).with_config(config);
    build_router(AppState::new(binder))
}

fn app() -> axum::Router {
    app_with(BindConfig::new())
}

async fn send_raw(app: &axum::Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("response expected");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");

    if body.is_empty() {
        return (status, Value::Null);
    }

    let json = serde_json::from_slice::<Value>(&body).expect("body should be valid JSON");
    (status, json)
}

async fn send_json(app: &axum::Router, method: Method, uri: &str, payload: Value) -> (StatusCode, Value) {
    send_raw(app, method, uri, Body::from(payload.to_string())).await
}

async fn create_alice(app: &axum::Router) -> String {
    let (status, body) = send_json(
        app,
        Method::POST,
        "/users",
        json!({ "name": "Alice", "email": "alice@example.com", "nickname": "al" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().expect("id column").to_string()
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send_raw(&app(), Method::GET, "/health", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "ok");
}

#[tokio::test]
async fn create_stores_columns_and_server_fields() {
    let app = app();
    let id = create_alice(&app).await;

    let (status, body) = send_raw(&app, Method::GET, &format!("/users/{id}"), Body::empty()).await;
    assert_eq!(status, StatusCode::OK);

    let row = &body["data"];
    assert_eq!(row["user_name"], "Alice");
    assert_eq!(row["email"], "alice@example.com");
    assert_eq!(row["role"], "member");
    assert!(row["created_at"].is_string());
    assert!(row.get("nickname").is_none());
    assert!(row.get("name").is_none());
}

#[tokio::test]
async fn create_rejects_missing_required_fields() {
    let (status, body) = send_json(&app(), Method::POST, "/users", json!({ "nickname": "x" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "validation_error");

    let mut fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|field| field["field"].as_str().unwrap())
        .collect();
    fields.dedup();
    assert_eq!(fields, vec!["name", "email"]);
}

#[tokio::test]
async fn create_rejects_client_supplied_timestamp() {
    let (status, body) = send_json(
        &app(),
        Method::POST,
        "/users",
        json!({ "name": "Eve", "email": "eve@example.com", "created_at": "2020-01-01T00:00:00Z" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "created_at");
    assert_eq!(body["fields"][0]["rule"], "zerotime");
}

#[tokio::test]
async fn patch_updates_only_present_columns() {
    let app = app();
    let id = create_alice(&app).await;

    let (status, body) = send_json(
        &app,
        Method::PATCH,
        &format!("/users/{id}"),
        json!({ "name": "Alicia", "created_at": "2020-01-01T00:00:00Z", "unknown": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["updated"], json!(["user_name"]));

    let row = &body["data"]["row"];
    assert_eq!(row["user_name"], "Alicia");
    assert_eq!(row["email"], "alice@example.com");
    assert_ne!(row["created_at"], "2020-01-01T00:00:00Z");
}

#[tokio::test]
async fn patch_validates_present_fields_only() {
    let app = app();
    let id = create_alice(&app).await;

    let (status, body) = send_json(
        &app,
        Method::PATCH,
        &format!("/users/{id}"),
        json!({ "email": "not-an-email" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"], json!([{ "field": "email", "rule": "email", "message": "must be a valid email address" }]));

    let (status, _) = send_json(
        &app,
        Method::PATCH,
        &format!("/users/{id}"),
        json!({ "updated_by": "admin" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn patch_without_updatable_keys_is_rejected() {
    let app = app();
    let id = create_alice(&app).await;

    let (status, body) = send_json(
        &app,
        Method::PATCH,
        &format!("/users/{id}"),
        json!({ "role": "admin", "id": "other" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "input_error");

    let (_, body) = send_raw(&app, Method::GET, &format!("/users/{id}"), Body::empty()).await;
    assert_eq!(body["data"]["role"], "member");
    assert_eq!(body["data"]["id"], id.as_str());
}

#[tokio::test]
async fn patch_of_excluded_column_succeeds_without_writes() {
    let app = app();
    let id = create_alice(&app).await;

    let (status, body) = send_json(
        &app,
        Method::PATCH,
        &format!("/users/{id}"),
        json!({ "nickname": "ali" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], json!([]));
}

#[tokio::test]
async fn patch_errors_map_to_statuses() {
    let app = app();

    let (status, body) = send_json(&app, Method::PATCH, "/users/missing", json!({ "name": "x" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, body) = send_raw(&app, Method::PATCH, "/users/missing", Body::from("{\"name\":")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "decode_error");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = app_with(BindConfig::new().max_body_bytes(32));
    let (status, body) = send_json(
        &app,
        Method::POST,
        "/users",
        json!({ "name": "Alice", "email": "alice@example.com", "nickname": "al" }),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "payload_too_large");
}
