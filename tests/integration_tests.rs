use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDateTime;
use tower::ServiceExt;

use mountbook::config::AppConfig;
use mountbook::db;
use mountbook::routes;
use mountbook::services::clock::FixedClock;
use mountbook::state::AppState;

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        booking_buffer_hours: 2,
        slot_interval_minutes: 60,
    }
}

fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

fn test_state_at(now: &str) -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    AppState::new(conn, test_config(), Arc::new(FixedClock::new(dt(now)))).unwrap()
}

fn test_state() -> Arc<AppState> {
    test_state_at("2025-06-01 12:00")
}

fn test_app(state: Arc<AppState>) -> Router {
    routes::router(state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", "Bearer test-token");
    match body {
        Some(b) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn booking_body(date: &str, time: &str, email: &str) -> serde_json::Value {
    serde_json::json!({
        "preferred_date": date,
        "appointment_time": time,
        "service_type": "tv_mounting",
        "notes": "65 inch over fireplace",
        "pricing_total_cents": 14900,
        "customer_name": "Alice",
        "customer_email": email,
        "customer_phone": "+15551110000"
    })
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn create(state: &Arc<AppState>, date: &str, time: &str, email: &str) -> serde_json::Value {
    let (status, json) = send(
        test_app(state.clone()),
        json_request("POST", "/api/bookings", booking_body(date, time, email)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

// ── Public API ──

#[tokio::test]
async fn test_health() {
    let (status, json) = send(
        test_app(test_state()),
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_availability_lists_monday_evening_slots() {
    let state = test_state();
    // 2025-06-16 is a Monday
    let (status, json) = send(
        test_app(state),
        Request::builder()
            .uri("/api/availability?date=2025-06-16")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["date"], "2025-06-16");
    let times: Vec<&str> = json["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["time"].as_str().unwrap())
        .collect();
    assert_eq!(times, vec!["6:30 PM", "7:30 PM", "8:30 PM", "9:30 PM"]);
    assert!(json["slots"].as_array().unwrap().iter().all(|s| s["available"] == true));
}

#[tokio::test]
async fn test_availability_respects_buffer() {
    let state = test_state_at("2025-06-16 19:00");
    let (_, json) = send(
        test_app(state),
        Request::builder()
            .uri("/api/availability?date=2025-06-16")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots[1]["time"], "7:30 PM");
    assert_eq!(slots[1]["available"], false);
    assert_eq!(slots[3]["time"], "9:30 PM");
    assert_eq!(slots[3]["available"], true);
}

#[tokio::test]
async fn test_availability_bad_date() {
    let (status, json) = send(
        test_app(test_state()),
        Request::builder()
            .uri("/api/availability?date=06/16/2025")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_create_booking_and_slot_taken() {
    let state = test_state();
    let created = create(&state, "2025-06-20", "6:30 PM", "alice@example.com").await;
    assert_eq!(created["status"], "active");
    assert_eq!(created["preferred_date"], "2025-06-20");
    assert_eq!(created["appointment_time"], "6:30 PM");

    // Same slot written differently still collides
    let (status, json) = send(
        test_app(state.clone()),
        json_request("POST", "/api/bookings", booking_body("2025-06-20", "06:30 pm", "bob@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "slot_taken");

    let (_, json) = send(
        test_app(state),
        Request::builder()
            .uri("/api/availability?date=2025-06-20")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(json["slots"][0]["time"], "6:30 PM");
    assert_eq!(json["slots"][0]["available"], false);
}

#[tokio::test]
async fn test_create_booking_validation_error() {
    let mut body = booking_body("2025-06-20", "6:30 PM", "alice@example.com");
    body["customer_phone"] = serde_json::json!("");
    let (status, json) = send(test_app(test_state()), json_request("POST", "/api/bookings", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_create_booking_missing_field_is_validation_error() {
    let mut body = booking_body("2025-06-20", "6:30 PM", "alice@example.com");
    body.as_object_mut().unwrap().remove("customer_phone");
    let (status, json) = send(test_app(test_state()), json_request("POST", "/api/bookings", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert!(json["error"]["message"].as_str().unwrap().contains("customer_phone"));
}

#[tokio::test]
async fn test_malformed_requests_are_validation_errors() {
    let state = test_state();

    let (status, json) = send(
        test_app(state.clone()),
        Request::builder()
            .uri("/api/availability")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");

    let (status, json) = send(
        test_app(state.clone()),
        Request::builder()
            .method("POST")
            .uri("/api/bookings")
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");

    let (status, json) = send(
        test_app(state),
        admin_request("POST", "/api/admin/buffer", Some(serde_json::json!({ "buffer_hours": "three" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_create_booking_outside_hours() {
    let (status, json) = send(
        test_app(test_state()),
        json_request("POST", "/api/bookings", booking_body("2025-06-20", "9:00 AM", "alice@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "outside_business_hours");
}

#[tokio::test]
async fn test_simultaneous_commits_one_wins() {
    let state = test_state();
    // 2025-06-21 is a Saturday: 11:00-19:00
    let a = send(
        test_app(state.clone()),
        json_request("POST", "/api/bookings", booking_body("2025-06-21", "2:00 PM", "alice@example.com")),
    );
    let b = send(
        test_app(state.clone()),
        json_request("POST", "/api/bookings", booking_body("2025-06-21", "2:00 PM", "bob@example.com")),
    );
    let ((status_a, _), (status_b, _)) = tokio::join!(a, b);

    let mut statuses = vec![status_a.as_u16(), status_b.as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![201, 409]);

    let (_, json) = send(
        test_app(state),
        admin_request("GET", "/api/admin/bookings?date=2025-06-21&status=active", None),
    )
    .await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_customer_reschedule_and_cancel() {
    let state = test_state();
    let created = create(&state, "2025-06-20", "6:30 PM", "alice@example.com").await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        test_app(state.clone()),
        json_request(
            "POST",
            &format!("/api/bookings/{id}/reschedule"),
            serde_json::json!({"date": "2025-06-21", "time": "12:00 PM", "customer_email": "alice@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["preferred_date"], "2025-06-21");
    assert_eq!(json["appointment_time"], "12:00 PM");
    assert_eq!(json["status"], "active");

    let (status, json) = send(
        test_app(state.clone()),
        Request::builder()
            .uri(format!("/api/bookings/{id}?customer_email=alice@example.com"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["appointment_time"], "12:00 PM");

    let (status, json) = send(
        test_app(state.clone()),
        json_request(
            "POST",
            &format!("/api/bookings/{id}/cancel"),
            serde_json::json!({"customer_email": "alice@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "cancelled");

    let (status, json) = send(
        test_app(state),
        json_request(
            "POST",
            &format!("/api/bookings/{id}/cancel"),
            serde_json::json!({"customer_email": "alice@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "invalid_transition");
}

#[tokio::test]
async fn test_reschedule_conflict_keeps_original() {
    let state = test_state();
    let alice = create(&state, "2025-06-20", "6:30 PM", "alice@example.com").await;
    create(&state, "2025-06-20", "7:30 PM", "bob@example.com").await;
    let id = alice["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        test_app(state.clone()),
        json_request(
            "POST",
            &format!("/api/bookings/{id}/reschedule"),
            serde_json::json!({"date": "2025-06-20", "time": "7:30 PM", "customer_email": "alice@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "slot_taken");

    let (_, json) = send(
        test_app(state),
        admin_request("GET", "/api/admin/bookings?date=2025-06-20", None),
    )
    .await;
    let mine = json
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["id"] == id.as_str())
        .unwrap();
    assert_eq!(mine["appointment_time"], "6:30 PM");
    assert_eq!(mine["status"], "active");
}

#[tokio::test]
async fn test_other_customer_cannot_touch_booking() {
    let state = test_state();
    let alice = create(&state, "2025-06-20", "6:30 PM", "alice@example.com").await;
    let id = alice["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        test_app(state.clone()),
        json_request(
            "POST",
            &format!("/api/bookings/{id}/cancel"),
            serde_json::json!({"customer_email": "mallory@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        test_app(state),
        Request::builder()
            .uri(format!("/api/bookings/{id}?customer_email=mallory@example.com"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Admin API ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let (status, _) = send(
        test_app(test_state()),
        Request::builder()
            .uri("/api/admin/bookings")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = send(
        test_app(test_state()),
        Request::builder()
            .uri("/api/admin/buffer")
            .header("Authorization", "Bearer wrong-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_admin_business_hours_close_day() {
    let state = test_state();

    let (status, json) = send(
        test_app(state.clone()),
        admin_request("GET", "/api/admin/business-hours", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 7);
    assert_eq!(json[1]["start_time"], "18:30");

    let (status, json) = send(
        test_app(state.clone()),
        admin_request(
            "POST",
            "/api/admin/business-hours",
            Some(serde_json::json!({"day": "mon", "start_time": "18:30", "end_time": "22:30", "is_available": false})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_available"], false);

    let (_, json) = send(
        test_app(state),
        Request::builder()
            .uri("/api/availability?date=2025-06-16")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(json["slots"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_business_hours_rejects_inverted_range() {
    let (status, json) = send(
        test_app(test_state()),
        admin_request(
            "POST",
            "/api/admin/business-hours",
            Some(serde_json::json!({"day": "tue", "start_time": "22:00", "end_time": "09:00", "is_available": true})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_admin_buffer_update_persists() {
    let state = test_state_at("2025-06-16 19:00");

    let (status, json) = send(test_app(state.clone()), admin_request("GET", "/api/admin/buffer", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["buffer_hours"], 2);

    let (status, _) = send(
        test_app(state.clone()),
        admin_request("POST", "/api/admin/buffer", Some(serde_json::json!({"buffer_hours": 0}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.buffer.hours(), 0);
    assert_eq!(
        state.store.get_setting("booking_buffer_hours").unwrap().as_deref(),
        Some("0")
    );

    let (_, json) = send(
        test_app(state),
        Request::builder()
            .uri("/api/availability?date=2025-06-16")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(json["slots"][1]["time"], "7:30 PM");
    assert_eq!(json["slots"][1]["available"], true);
}

#[tokio::test]
async fn test_admin_complete_and_filter() {
    let state = test_state();
    let a = create(&state, "2025-06-20", "6:30 PM", "alice@example.com").await;
    create(&state, "2025-06-20", "7:30 PM", "bob@example.com").await;
    let id = a["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        test_app(state.clone()),
        admin_request("POST", &format!("/api/admin/bookings/{id}/complete"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "completed");

    let (_, json) = send(
        test_app(state.clone()),
        admin_request("GET", "/api/admin/bookings?status=completed", None),
    )
    .await;
    let completed = json.as_array().unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0]["id"], id.as_str());

    let (status, _) = send(
        test_app(state),
        admin_request("GET", "/api/admin/bookings?status=pending", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_reschedule_and_cancel_unscoped() {
    let state = test_state();
    let a = create(&state, "2025-06-20", "6:30 PM", "alice@example.com").await;
    let id = a["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        test_app(state.clone()),
        admin_request(
            "POST",
            &format!("/api/admin/bookings/{id}/reschedule"),
            Some(serde_json::json!({"date": "2025-06-20", "time": "21:30"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["appointment_time"], "9:30 PM");

    let (status, json) = send(
        test_app(state.clone()),
        admin_request("POST", &format!("/api/admin/bookings/{id}/cancel"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "cancelled");

    let (status, _) = send(
        test_app(state),
        admin_request("POST", "/api/admin/bookings/missing/cancel", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_events_stream_requires_token() {
    let (status, _) = send(
        test_app(test_state()),
        Request::builder()
            .uri("/api/admin/events?token=wrong")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_oversized_buffer_is_clamped_not_fatal() {
    let conn = db::init_db(":memory:").unwrap();
    db::queries::set_setting(&conn, "booking_buffer_hours", "4294967295").unwrap();
    let config = AppConfig {
        booking_buffer_hours: u32::MAX,
        ..test_config()
    };
    let state = AppState::new(conn, config, Arc::new(FixedClock::new(dt("2025-06-16 12:00")))).unwrap();
    assert_eq!(state.buffer.hours(), 720);

    let (status, json) = send(
        test_app(state.clone()),
        Request::builder()
            .uri("/api/availability?date=2025-06-16")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["slots"].as_array().unwrap().iter().all(|s| s["available"] == false));

    let (status, json) = send(
        test_app(state),
        admin_request("POST", "/api/admin/buffer", Some(serde_json::json!({"buffer_hours": 721}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}
