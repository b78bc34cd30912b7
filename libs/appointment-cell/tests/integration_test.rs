// libs/appointment-cell/tests/integration_test.rs
use appointment_cell::router::appointment_routes;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn next_week_at(hour: u32) -> DateTime<Utc> {
    (Utc::now() + Duration::days(7))
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
        .and_utc()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

struct TestHarness {
    server: MockServer,
    config: TestConfig,
}

impl TestHarness {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let config = TestConfig::default().with_supabase_url(&server.uri());
        Self { server, config }
    }

    fn router(&self) -> axum::Router {
        appointment_routes(self.config.to_arc())
    }

    fn token_for(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, Some(1))
    }

    async fn mock_operating_hours(&self, doctor_id: Uuid, day_of_week: i32) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/doctor_operating_hours"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::operating_hours_response(
                    &doctor_id.to_string(),
                    day_of_week
                )
            ])))
            .mount(&self.server)
            .await;
    }

    async fn mock_no_overlap(&self) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&self.server)
            .await;
    }
}

fn book_body(patient_id: Uuid, doctor_id: Uuid, start: DateTime<Utc>) -> String {
    json!({
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "modality": "online",
        "appointment_date": start.to_rfc3339(),
        "duration_minutes": 30
    })
    .to_string()
}

#[tokio::test]
async fn book_appointment_happy_path() {
    let harness = TestHarness::new().await;
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let start = next_week_at(10);

    harness
        .mock_operating_hours(doctor_id, start.weekday().num_days_from_sunday() as i32)
        .await;
    harness.mock_no_overlap().await;

    let appointment_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/create_appointment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                appointment_id,
                &patient_id.to_string(),
                &doctor_id.to_string(),
                "scheduled"
            )
        ])))
        .mount(&harness.server)
        .await;

    let user = TestUser::patient("booker@example.com").with_id(patient_id);
    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", harness.token_for(&user)))
                .header("Content-Type", "application/json")
                .body(Body::from(book_body(patient_id, doctor_id, start)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["appointment"]["status"], json!("scheduled"));
}

#[tokio::test]
async fn booking_outside_operating_hours_is_rejected() {
    let harness = TestHarness::new().await;
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let start = next_week_at(10);

    // No hours rows at all: the doctor is closed that day.
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_operating_hours"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&harness.server)
        .await;

    let user = TestUser::patient("booker@example.com").with_id(patient_id);
    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", harness.token_for(&user)))
                .header("Content-Type", "application/json")
                .body(Body::from(book_body(patient_id, doctor_id, start)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_conflicting_slot_returns_conflict() {
    let harness = TestHarness::new().await;
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let start = next_week_at(10);

    harness
        .mock_operating_hours(doctor_id, start.weekday().num_days_from_sunday() as i32)
        .await;

    // Existing active appointment occupying the same window.
    let mut existing = MockSupabaseResponses::appointment_response(
        Uuid::new_v4(),
        &Uuid::new_v4().to_string(),
        &doctor_id.to_string(),
        "scheduled",
    );
    existing["appointment_date"] = json!(start.to_rfc3339());
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([existing])))
        .mount(&harness.server)
        .await;

    let user = TestUser::patient("booker@example.com").with_id(patient_id);
    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", harness.token_for(&user)))
                .header("Content-Type", "application/json")
                .body(Body::from(book_body(patient_id, doctor_id, start)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn booking_for_another_patient_is_forbidden() {
    let harness = TestHarness::new().await;
    let doctor_id = Uuid::new_v4();
    let start = next_week_at(10);

    let user = TestUser::patient("imposter@example.com");
    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", harness.token_for(&user)))
                .header("Content-Type", "application/json")
                .body(Body::from(book_body(Uuid::new_v4(), doctor_id, start)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let harness = TestHarness::new().await;

    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn requests_with_bad_signature_are_rejected() {
    let harness = TestHarness::new().await;
    let user = TestUser::default();
    let token = JwtTestUtils::create_invalid_signature_token(&user);

    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/{}", Uuid::new_v4()))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stranger_cannot_read_someone_elses_appointment() {
    let harness = TestHarness::new().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                appointment_id,
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                "scheduled"
            )
        ])))
        .mount(&harness.server)
        .await;

    let stranger = TestUser::patient("stranger@example.com");
    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/{}", appointment_id))
                .header(
                    "Authorization",
                    format!("Bearer {}", harness.token_for(&stranger)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn confirming_a_completed_appointment_conflicts() {
    let harness = TestHarness::new().await;
    let appointment_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                appointment_id,
                &Uuid::new_v4().to_string(),
                &doctor_id.to_string(),
                "completed"
            )
        ])))
        .mount(&harness.server)
        .await;

    let doctor = TestUser::doctor("doc@example.com").with_id(doctor_id);
    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{}/confirm", appointment_id))
                .header(
                    "Authorization",
                    format!("Bearer {}", harness.token_for(&doctor)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn search_returns_appointments_for_the_caller() {
    let harness = TestHarness::new().await;
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                Uuid::new_v4(),
                &patient_id.to_string(),
                &Uuid::new_v4().to_string(),
                "scheduled"
            )
        ])))
        .mount(&harness.server)
        .await;

    let user = TestUser::patient("searcher@example.com").with_id(patient_id);
    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/search?status=scheduled")
                .header("Authorization", format!("Bearer {}", harness.token_for(&user)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], json!(1));
}
