//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use subtrack_core::clock::FixedClock;
use subtrack_core::models::{BillingCycle, SubscriptionStatus};
use subtrack_core::test_utils::{date, seed_subscription, seed_user, subscription, RecordingTransport};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    db: Database,
    transport: Arc<RecordingTransport>,
}

fn open_config() -> ServerConfig {
    ServerConfig {
        require_auth: false,
        ..Default::default()
    }
}

fn setup_with(config: ServerConfig, settings: AppConfig) -> TestApp {
    let db = Database::in_memory().unwrap();
    let transport = Arc::new(RecordingTransport::new());
    let clock = Arc::new(FixedClock::at(date(2026, 3, 10), 9, 0).unwrap());
    let router = create_router_with_clock(
        db.clone(),
        config,
        settings,
        transport.clone(),
        clock,
    );
    TestApp {
        router,
        db,
        transport,
    }
}

fn setup_test_app() -> TestApp {
    setup_with(open_config(), AppConfig::embedded().unwrap())
}

fn request(method: &str, uri: &str, user: Option<i64>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
        builder = builder.header(USER_ID_HEADER, id.to_string());
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> axum::response::Response {
    app.router.clone().oneshot(req).await.unwrap()
}

async fn get_body_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ========== Health & Auth Tests ==========

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();

    let response = send(&app, request("GET", "/api/health", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["transport"], "recording");
    assert_eq!(json["today"], "2026-03-10");
}

#[tokio::test]
async fn test_api_key_required() {
    let config = ServerConfig {
        api_keys: vec!["sekrit-key".to_string()],
        ..Default::default()
    };
    let app = setup_with(config, AppConfig::embedded().unwrap());
    let uid = seed_user(&app.db, "keyed@example.com");

    let response = send(&app, request("GET", "/api/me", Some(uid), None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut req = request("GET", "/api/me", Some(uid), None);
    req.headers_mut()
        .insert("authorization", "Bearer wrong-key!".parse().unwrap());
    assert_eq!(send(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let mut req = request("GET", "/api/me", Some(uid), None);
    req.headers_mut()
        .insert("authorization", "Bearer sekrit-key".parse().unwrap());
    assert_eq!(send(&app, req).await.status(), StatusCode::OK);

    // Health needs no key
    let response = send(&app, request("GET", "/api/health", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["abc".to_string(), "defgh".to_string()];
    assert!(validate_api_key("abc", &keys));
    assert!(validate_api_key("defgh", &keys));
    assert!(!validate_api_key("abd", &keys));
    assert!(!validate_api_key("", &keys));
    assert!(!validate_api_key("abc", &[]));
}

#[tokio::test]
async fn test_user_header_required() {
    let app = setup_test_app();

    let response = send(&app, request("GET", "/api/subscriptions", None, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, request("GET", "/api/subscriptions", Some(77), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let req = Request::builder()
        .uri("/api/subscriptions")
        .header(USER_ID_HEADER, "abc")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

// ========== User Tests ==========

#[tokio::test]
async fn test_get_and_update_me() {
    let app = setup_test_app();
    let uid = seed_user(&app.db, "me@example.com");

    let response = send(&app, request("GET", "/api/me", Some(uid), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["email"], "me@example.com");
    assert_eq!(json["email_alerts"], true);

    let response = send(
        &app,
        request(
            "PUT",
            "/api/me",
            Some(uid),
            Some(json!({ "email_alerts": false, "display_currency": "eur" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["email_alerts"], false);
    assert_eq!(json["display_currency"], "EUR");

    let response = send(
        &app,
        request(
            "PUT",
            "/api/me",
            Some(uid),
            Some(json!({ "display_currency": "XYZ" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Subscription Tests ==========

#[tokio::test]
async fn test_subscription_crud() {
    let app = setup_test_app();
    let uid = seed_user(&app.db, "crud@example.com");

    let response = send(
        &app,
        request(
            "POST",
            "/api/subscriptions",
            Some(uid),
            Some(json!({
                "name": "Netflix",
                "category": "Streaming",
                "amount": 15.49,
                "billing_cycle": "monthly",
                "next_billing_date": "2026-03-15"
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = get_body_json(response).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["status"], "active");
    assert_eq!(created["alert_days"], 3);
    assert_eq!(created["display_amount"], 15.49);

    let response = send(&app, request("GET", "/api/subscriptions", Some(uid), None)).await;
    let list = get_body_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let uri = format!("/api/subscriptions/{}", id);
    let response = send(
        &app,
        request(
            "PUT",
            &uri,
            Some(uid),
            Some(json!({ "status": "paused", "amount": 17.99 })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = get_body_json(response).await;
    assert_eq!(updated["status"], "paused");
    assert_eq!(updated["amount"], 17.99);
    assert_eq!(updated["name"], "Netflix");

    let response = send(&app, request("DELETE", &uri, Some(uid), None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, request("GET", &uri, Some(uid), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_subscription_validation() {
    let app = setup_test_app();
    let uid = seed_user(&app.db, "invalid@example.com");

    let response = send(
        &app,
        request(
            "POST",
            "/api/subscriptions",
            Some(uid),
            Some(json!({
                "name": "Broken",
                "amount": -5.0,
                "billing_cycle": "monthly",
                "next_billing_date": "2026-03-15"
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown cycle is rejected by the extractor
    let response = send(
        &app,
        request(
            "POST",
            "/api/subscriptions",
            Some(uid),
            Some(json!({
                "name": "Broken",
                "amount": 5.0,
                "billing_cycle": "fortnightly",
                "next_billing_date": "2026-03-15"
            })),
        ),
    )
    .await;
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_other_users_subscription_is_hidden() {
    let app = setup_test_app();
    let owner = seed_user(&app.db, "owner@example.com");
    let intruder = seed_user(&app.db, "intruder@example.com");
    let id = seed_subscription(
        &app.db,
        owner,
        &subscription("Private", 9.0, BillingCycle::Monthly, date(2026, 3, 20)),
    );

    let uri = format!("/api/subscriptions/{}", id);
    for method in ["GET", "DELETE"] {
        let response = send(&app, request(method, &uri, Some(intruder), None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
    let response = send(
        &app,
        request("POST", &format!("/api/alerts/send/{}", id), Some(intruder), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert!(app.db.get_subscription(id).unwrap().is_some());
}

// ========== View Tests ==========

#[tokio::test]
async fn test_calendar() {
    let app = setup_test_app();
    let uid = seed_user(&app.db, "cal@example.com");
    seed_subscription(
        &app.db,
        uid,
        &subscription("Rent-ish", 30.0, BillingCycle::Monthly, date(2026, 1, 31)),
    );
    let mut paused = subscription("Paused", 5.0, BillingCycle::Monthly, date(2026, 2, 2));
    paused.status = SubscriptionStatus::Paused;
    seed_subscription(&app.db, uid, &paused);

    let response = send(
        &app,
        request("GET", "/api/calendar?year=2026&month=2", Some(uid), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["days_in_month"], 28);
    assert_eq!(json["first_weekday"], 0);
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["day"], 28);
    assert_eq!(json["total"], 30.0);

    // Defaults to the clock's month
    let response = send(&app, request("GET", "/api/calendar", Some(uid), None)).await;
    let json = get_body_json(response).await;
    assert_eq!(json["month"], 3);
    assert_eq!(json["entries"][0]["day"], 31);

    let response = send(
        &app,
        request("GET", "/api/calendar?year=2026&month=13", Some(uid), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upcoming() {
    let app = setup_test_app();
    let uid = seed_user(&app.db, "soon@example.com");
    seed_subscription(
        &app.db,
        uid,
        &subscription("Soon", 4.0, BillingCycle::Weekly, date(2026, 3, 12)),
    );
    seed_subscription(
        &app.db,
        uid,
        &subscription("Far", 4.0, BillingCycle::Monthly, date(2026, 4, 30)),
    );

    let response = send(&app, request("GET", "/api/upcoming", Some(uid), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["days"], 7);
    let payments = json["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["name"], "Soon");
    assert_eq!(payments[0]["days_until"], 2);

    let response = send(
        &app,
        request("GET", "/api/upcoming?days=60", Some(uid), None),
    )
    .await;
    let json = get_body_json(response).await;
    assert_eq!(json["payments"].as_array().unwrap().len(), 2);

    let response = send(
        &app,
        request("GET", "/api/upcoming?days=1000", Some(uid), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analytics() {
    let app = setup_test_app();
    let uid = seed_user(&app.db, "stats@example.com");
    seed_subscription(
        &app.db,
        uid,
        &subscription("Hosting", 12.0, BillingCycle::Yearly, date(2026, 6, 1)),
    );
    seed_subscription(
        &app.db,
        uid,
        &subscription("Music", 10.0, BillingCycle::Monthly, date(2026, 3, 20)),
    );

    let response = send(&app, request("GET", "/api/analytics", Some(uid), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["currency"], "USD");
    assert_eq!(json["totals"]["monthly_total"], 11.0);
    assert_eq!(json["totals"]["active_count"], 2);
    assert_eq!(json["trend"]["points"].as_array().unwrap().len(), 12);
    assert_eq!(json["top_subscriptions"][0]["name"], "Music");
}

// ========== Alert Tests ==========

#[tokio::test]
async fn test_cron_requires_secret() {
    let config = ServerConfig {
        api_keys: vec!["api-key".to_string()],
        cron_secret: Some("cron-secret".to_string()),
        ..Default::default()
    };
    let app = setup_with(config, AppConfig::embedded().unwrap());
    let uid = seed_user(&app.db, "cron@example.com");
    seed_subscription(
        &app.db,
        uid,
        &subscription("Due", 9.0, BillingCycle::Monthly, date(2026, 3, 13)),
    );

    let response = send(&app, request("GET", "/api/alerts/cron", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // An API key is not the cron secret
    let mut req = request("GET", "/api/alerts/cron", None, None);
    req.headers_mut()
        .insert("authorization", "Bearer api-key".parse().unwrap());
    assert_eq!(send(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let mut req = request("GET", "/api/alerts/cron", None, None);
    req.headers_mut()
        .insert("authorization", "Bearer cron-secret".parse().unwrap());
    let response = send(&app, req).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = get_body_json(response).await;
    assert_eq!(report["sent"], 1);
    assert_eq!(report["results"][0]["status"], "sent");

    let sent = app.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "cron@example.com");

    // Snapshot recorded for the current month
    let trend = app.db.monthly_trend(uid, 2026, 3, 1).unwrap();
    assert_eq!(trend[0].amount, 9.0);
}

#[tokio::test]
async fn test_cron_is_idempotent_per_day() {
    let config = ServerConfig {
        cron_secret: Some("cron-secret".to_string()),
        ..open_config()
    };
    let app = setup_with(config, AppConfig::embedded().unwrap());
    let uid = seed_user(&app.db, "twice@example.com");
    seed_subscription(
        &app.db,
        uid,
        &subscription("Due", 9.0, BillingCycle::Monthly, date(2026, 3, 11)),
    );

    for expected_sent in [1, 0] {
        let mut req = request("GET", "/api/alerts/cron", None, None);
        req.headers_mut()
            .insert("authorization", "Bearer cron-secret".parse().unwrap());
        let report = get_body_json(send(&app, req).await).await;
        assert_eq!(report["sent"], expected_sent);
    }
    assert_eq!(app.transport.sent().len(), 1);
}

#[tokio::test]
async fn test_cron_returns_report_when_audit_write_fails() {
    let config = ServerConfig {
        cron_secret: Some("cron-secret".to_string()),
        ..open_config()
    };
    let app = setup_with(config, AppConfig::embedded().unwrap());
    let uid = seed_user(&app.db, "noaudit@example.com");
    seed_subscription(
        &app.db,
        uid,
        &subscription("Due", 9.0, BillingCycle::Monthly, date(2026, 3, 13)),
    );
    app.db
        .conn()
        .unwrap()
        .execute_batch("DROP TABLE audit_log;")
        .unwrap();

    let mut req = request("GET", "/api/alerts/cron", None, None);
    req.headers_mut()
        .insert("authorization", "Bearer cron-secret".parse().unwrap());
    let response = send(&app, req).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = get_body_json(response).await;
    assert_eq!(report["sent"], 1);
    assert_eq!(app.transport.sent().len(), 1);
}

#[tokio::test]
async fn test_manual_send_rate_limited() {
    let mut settings = AppConfig::embedded().unwrap();
    settings.alerts.manual_limit = 1;
    let app = setup_with(open_config(), settings);
    let uid = seed_user(&app.db, "manual@example.com");
    let id = seed_subscription(
        &app.db,
        uid,
        &subscription("Later", 9.0, BillingCycle::Monthly, date(2026, 3, 25)),
    );
    let uri = format!("/api/alerts/send/{}", id);

    let response = send(&app, request("POST", &uri, Some(uid), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "sent");
    assert_eq!(json["days_until"], 15);

    let response = send(&app, request("POST", &uri, Some(uid), None)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get("retry-after").unwrap(), "3600");
    assert_eq!(app.transport.sent().len(), 1);
}

#[tokio::test]
async fn test_manual_send_ineligible_and_failing() {
    let app = setup_test_app();
    let uid = seed_user(&app.db, "fail@example.com");
    let past = seed_subscription(
        &app.db,
        uid,
        &subscription("Past", 9.0, BillingCycle::Monthly, date(2026, 3, 1)),
    );
    let ok = seed_subscription(
        &app.db,
        uid,
        &subscription("Fine", 9.0, BillingCycle::Monthly, date(2026, 3, 20)),
    );

    let response = send(
        &app,
        request("POST", &format!("/api/alerts/send/{}", past), Some(uid), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.transport.fail_for("fail@example.com");
    let response = send(
        &app,
        request("POST", &format!("/api/alerts/send/{}", ok), Some(uid), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "failed");
    assert!(app.db.get_subscription(ok).unwrap().unwrap().last_alert_sent.is_none());
}

// ========== Audit Tests ==========

#[tokio::test]
async fn test_requests_are_audited() {
    let app = setup_test_app();
    let uid = seed_user(&app.db, "audit@example.com");

    send(&app, request("GET", "/api/subscriptions", Some(uid), None)).await;

    let response = send(&app, request("GET", "/api/audit?limit=5", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let entries = json.as_array().unwrap();
    assert!(entries
        .iter()
        .any(|e| e["actor"] == format!("user:{}", uid) && e["entity_type"] == "subscription"));
}

#[tokio::test]
async fn test_audit_filter_by_subscription() {
    let app = setup_test_app();
    let uid = seed_user(&app.db, "history@example.com");
    let kept = seed_subscription(
        &app.db,
        uid,
        &subscription("Netflix", 15.0, BillingCycle::Monthly, date(2026, 3, 20)),
    );
    let removed = seed_subscription(
        &app.db,
        uid,
        &subscription("Gym", 40.0, BillingCycle::Monthly, date(2026, 3, 22)),
    );

    send(&app, request("GET", &format!("/api/subscriptions/{}", kept), Some(uid), None)).await;
    send(&app, request("DELETE", &format!("/api/subscriptions/{}", removed), Some(uid), None)).await;

    let uri = format!("/api/audit?entity_type=subscription&entity_id={}", kept);
    let response = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let entries = json.as_array().unwrap();
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|e| e["entity_id"] == kept));

    let response = send(&app, request("GET", "/api/audit?entity_id=1", None, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
