//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use event_store::InMemoryEventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use scheduling::InMemoryConditionsService;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    let store = InMemoryEventStore::new();
    let (state, _, _) = api::create_default_state(store);
    api::create_app(state, get_metrics_handle())
}

fn setup_with_conditions() -> (axum::Router, InMemoryConditionsService) {
    let store = InMemoryEventStore::new();
    let conditions = InMemoryConditionsService::new();
    let (state, _, _) = api::create_state(
        store,
        Arc::new(conditions.clone()),
        Duration::from_millis(50),
    );
    (api::create_app(state, get_metrics_handle()), conditions)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

async fn mark(app: &axum::Router, slot_id: &str, participant_id: &str, participant_type: &str) {
    let (status, _) = send(
        app,
        "POST",
        &format!("/flight/availability/{slot_id}"),
        Some(serde_json::json!({
            "participantId": participant_id,
            "participantType": participant_type,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn mark_trio(app: &axum::Router, slot_id: &str) {
    mark(app, slot_id, "A", "student").await;
    mark(app, slot_id, "B", "AIRCRAFT").await;
    mark(app, slot_id, "C", " Instructor ").await;
}

fn booking_body(booking_id: &str) -> serde_json::Value {
    serde_json::json!({
        "studentId": "A",
        "aircraftId": "B",
        "instructorId": "C",
        "bookingId": booking_id,
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_mark_available_shows_in_slot() {
    let app = setup();
    mark(&app, "S1", "A", "student").await;

    let (status, json) = send(&app, "GET", "/flight/availability/S1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["slotId"], "S1");
    assert_eq!(json["available"][0]["participantId"], "A");
    assert_eq!(json["available"][0]["participantType"], "STUDENT");
    assert_eq!(json["bookings"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_bad_participant_type_is_bad_request() {
    let app = setup();

    let (status, json) = send(
        &app,
        "POST",
        "/flight/availability/S1",
        Some(serde_json::json!({"participantId": "A", "participantType": "pilot"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("invalid participant type")
    );
}

#[tokio::test]
async fn test_unmark_available() {
    let app = setup();
    mark(&app, "S1", "A", "student").await;

    let (status, json) = send(
        &app,
        "DELETE",
        "/flight/availability/S1",
        Some(serde_json::json!({"participantId": "A", "participantType": "student"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["available"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_book_slot_created() {
    let app = setup();
    mark_trio(&app, "S1").await;

    let (status, json) = send(&app, "POST", "/flight/bookings/S1", Some(booking_body("BK1"))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["bookingId"], "BK1");
    assert_eq!(json["participants"].as_array().unwrap().len(), 3);

    let (_, slot) = send(&app, "GET", "/flight/availability/S1", None).await;
    assert_eq!(slot["available"].as_array().unwrap().len(), 0);
    assert_eq!(slot["bookings"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_missing_booking_field_is_bad_request() {
    let app = setup();
    mark_trio(&app, "S1").await;

    let (status, json) = send(
        &app,
        "POST",
        "/flight/bookings/S1",
        Some(serde_json::json!({"studentId": "A", "aircraftId": "B", "bookingId": "BK1"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "instructorId is required");

    let (status, _) = send(
        &app,
        "POST",
        "/flight/bookings/S1",
        Some(serde_json::json!({
            "studentId": "A",
            "aircraftId": "B",
            "instructorId": "C",
            "bookingId": "  ",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_double_booking_is_conflict() {
    let app = setup();
    mark_trio(&app, "S1").await;

    let (status, _) = send(&app, "POST", "/flight/bookings/S1", Some(booking_body("BK1"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(&app, "POST", "/flight/bookings/S1", Some(booking_body("BK2"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "Timeslot is not bookable");
}

#[tokio::test]
async fn test_cancel_booking() {
    let app = setup();
    mark_trio(&app, "S1").await;
    send(&app, "POST", "/flight/bookings/S1", Some(booking_body("BK1"))).await;

    let (status, json) = send(&app, "DELETE", "/flight/bookings/S1/BK1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bookings"].as_array().unwrap().len(), 0);

    let (status, _) = send(&app, "DELETE", "/flight/bookings/S1/BK1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_slots_by_status_reads_projection() {
    let app = setup();
    mark_trio(&app, "S1").await;
    mark(&app, "S2", "A", "student").await;
    send(&app, "POST", "/flight/bookings/S1", Some(booking_body("BK1"))).await;

    let (status, json) = send(&app, "GET", "/flight/slots/A/booked", None).await;
    assert_eq!(status, StatusCode::OK);
    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0]["slotId"], "S1");
    assert_eq!(slots[0]["bookingId"], "BK1");
    assert_eq!(slots[0]["status"], "BOOKED");

    let (_, json) = send(&app, "GET", "/flight/slots/A/AVAILABLE", None).await;
    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0]["slotId"], "S2");
}

#[tokio::test]
async fn test_bad_status_is_bad_request() {
    let app = setup();

    let (status, _) = send(&app, "GET", "/flight/slots/A/pending", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_slot_events() {
    let app = setup();
    mark_trio(&app, "S1").await;
    send(&app, "POST", "/flight/bookings/S1", Some(booking_body("BK1"))).await;

    let (status, json) = send(&app, "GET", "/flight/availability/S1/events", None).await;

    assert_eq!(status, StatusCode::OK);
    let events = json.as_array().unwrap();
    assert_eq!(events.len(), 6);
    assert_eq!(events[0]["eventType"], "ParticipantMarkedAvailable");
    assert_eq!(events[5]["eventType"], "ParticipantBooked");
    assert_eq!(events[5]["version"], 6);
    assert_eq!(events[5]["aggregateId"], "S1");
}

#[tokio::test]
async fn test_rejected_conditions_are_unprocessable() {
    let (app, conditions) = setup_with_conditions();
    mark_trio(&app, "S1").await;
    conditions.set_verdict("S1", false).await;

    let (status, _) = send(&app, "POST", "/flight/bookings/S1", Some(booking_body("BK1"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, events) = send(&app, "GET", "/flight/availability/S1/events", None).await;
    assert_eq!(events.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_slow_conditions_are_gateway_timeout() {
    let (app, conditions) = setup_with_conditions();
    mark_trio(&app, "S1").await;
    conditions
        .set_delay(Some(Duration::from_millis(500)))
        .await;

    let (status, _) = send(&app, "POST", "/flight/bookings/S1", Some(booking_body("BK1"))).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}
