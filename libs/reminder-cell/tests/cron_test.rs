// libs/reminder-cell/tests/cron_test.rs
use axum::body::Body;
use axum::http::{Request, StatusCode};
use reminder_cell::router::cron_routes;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_utils::test_utils::TestConfig;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn reminder_sweep_rejects_missing_secret() {
    let config = TestConfig::default();
    let router = cron_routes(config.to_arc());

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/reminders")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reminder_sweep_rejects_wrong_secret() {
    let config = TestConfig::default();
    let router = cron_routes(config.to_arc());

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/reminders")
                .header("Authorization", "Bearer not-the-secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reminder_sweep_with_valid_secret_reports_counts() {
    let server = MockServer::start().await;
    let config = TestConfig::default().with_supabase_url(&server.uri());

    // Both reminder windows come back empty.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let secret = config.cron_secret.clone();
    let router = cron_routes(config.to_arc());
    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/reminders")
                .header("Authorization", format!("Bearer {}", secret))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["reminders_24h"], json!(0));
    assert_eq!(body["reminders_1h"], json!(0));
    assert_eq!(body["errors"], json!([]));
}

#[tokio::test]
async fn missed_sweep_reports_updated_count() {
    let server = MockServer::start().await;
    let config = TestConfig::default().with_supabase_url(&server.uri());

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/mark_missed_appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4()
        ])))
        .mount(&server)
        .await;

    let secret = config.cron_secret.clone();
    let router = cron_routes(config.to_arc());
    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/missed")
                .header("Authorization", format!("Bearer {}", secret))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["updated_count"], json!(2));
}

#[tokio::test]
async fn missed_sweep_rejects_wrong_secret() {
    let config = TestConfig::default();
    let router = cron_routes(config.to_arc());

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/missed")
                .header("Authorization", "Bearer nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
