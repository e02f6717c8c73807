//! Integration tests for the feetrack-api HTTP surface
//!
//! Each test runs against a throwaway SQLite database; the SMS gateway
//! points at a closed local port so any attempted send fails fast without
//! touching the network.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

use feetrack_api::services::sms::SmsClient;
use feetrack_api::{build_router, AppState};
use feetrack_common::config::{AppConfig, GatewayConfig};
use feetrack_common::db::init_database;

const ADMIN: &str = "admin@example.com";

async fn setup() -> (TempDir, AppState) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("test.db")).await.unwrap();
    let state = test_state(pool);
    (dir, state)
}

fn test_state(pool: SqlitePool) -> AppState {
    let gateway = GatewayConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        api_key: "test-key".to_string(),
        device_id: "test-device".to_string(),
    };
    let config = AppConfig {
        db_path: std::path::PathBuf::from("unused"),
        port: 0,
        admin_emails: vec![ADMIN.to_string()],
        gateway: gateway.clone(),
    };
    AppState::new(pool, config, SmsClient::new(gateway).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, state) = setup().await;
    let app = build_router(state);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "feetrack-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_create_and_list_students() {
    let (_dir, state) = setup().await;
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/students",
            json!({"name": "Rahim", "studentPhone": "01712345678"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["name"], "Rahim");
    assert_eq!(created["active"], true);

    let response = app.oneshot(get("/api/students")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["students"][0]["student_phone"], "01712345678");
}

#[tokio::test]
async fn test_create_student_rejects_invalid_phone() {
    let (_dir, state) = setup().await;
    let app = build_router(state);

    let response = app
        .oneshot(post_json(
            "/api/students",
            json!({"name": "Rahim", "guardianPhone": "0271234567"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("guardian"));
}

#[tokio::test]
async fn test_create_student_requires_name() {
    let (_dir, state) = setup().await;
    let app = build_router(state);

    let response = app
        .oneshot(post_json("/api/students", json!({"name": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_unknown_student_is_not_found() {
    let (_dir, state) = setup().await;
    let app = build_router(state);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/students/no-such-id")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mark_paid_requires_allowlisted_admin() {
    let (_dir, state) = setup().await;
    let pool = state.db.clone();
    let app = build_router(state);

    let response = app
        .oneshot(post_json(
            "/api/payments/mark-paid",
            json!({
                "studentId": "s1",
                "month": "2026-01",
                "adminEmail": "intruder@example.com",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["ok"], false);

    // Rejected before any side effect: no payment state, no audit rows.
    assert_eq!(count(&pool, "payments").await, 0);
    assert_eq!(count(&pool, "sms_logs").await, 0);
}

#[tokio::test]
async fn test_mark_paid_rejects_malformed_month() {
    let (_dir, state) = setup().await;
    let pool = state.db.clone();
    let app = build_router(state);

    for month in ["2026-1", "Jan 2026", "garbage"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/payments/mark-paid",
                json!({"studentId": "s1", "month": month, "adminEmail": ADMIN}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "month {:?}", month);
    }

    assert_eq!(count(&pool, "payments").await, 0);
    assert_eq!(count(&pool, "sms_logs").await, 0);
}

#[tokio::test]
async fn test_mark_paid_unknown_student_is_not_found() {
    let (_dir, state) = setup().await;
    let app = build_router(state);

    let response = app
        .oneshot(post_json(
            "/api/payments/mark-paid",
            json!({"studentId": "ghost", "month": "2026-01", "adminEmail": ADMIN}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_payments_view_validates_month_param() {
    let (_dir, state) = setup().await;
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(get("/api/payments?month=nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get("/api/payments")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["student_field"], "studentId");
}

#[tokio::test]
async fn test_payments_view_reconciles_duplicates() {
    let (_dir, state) = setup().await;
    let pool = state.db.clone();
    let app = build_router(state);

    // Two generations of rows for the same logical key, drifted spellings.
    feetrack_common::db::queries::insert_payment(
        &pool,
        "legacy-1",
        &json!({"studentid": "s1", "month": "Jan 2026", "status": "paid"}),
    )
    .await
    .unwrap();
    feetrack_common::db::queries::insert_payment(
        &pool,
        "legacy-2",
        &json!({"studentid": "s1", "month": "2026-01", "status": "unpaid"}),
    )
    .await
    .unwrap();

    let response = app.oneshot(get("/api/payments?month=2026-01")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["student_field"], "studentid");
    assert_eq!(body["payments"][0]["student_id"], "s1");
    assert_eq!(body["payments"][0]["status"], "paid");
}

#[tokio::test]
async fn test_logs_endpoint_validates_status() {
    let (_dir, state) = setup().await;
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(get("/api/sms-logs?status=queued"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get("/api/sms-logs?status=sent")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 0);
}
