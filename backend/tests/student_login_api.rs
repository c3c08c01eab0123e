use axum::http::StatusCode;
use serde_json::{json, Value};

use notes_portal_backend::models::login_audit::AuditAction;

mod support;

use support::{assert_no_pin_hash, TestApp};

fn reason(entry: &notes_portal_backend::models::login_audit::LoginAuditEntry) -> Option<&str> {
    entry.metadata.0.get("reason").and_then(Value::as_str)
}

#[tokio::test]
async fn correct_pin_returns_student_without_hash() {
    let app = TestApp::new();
    let student = app.seed_student("Jan de Vries", "123456");

    let (status, body) = app
        .login(json!({"displayName": "Jan de Vries", "pin": "123456"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["student"]["id"], student.id.to_string());
    assert_eq!(body["student"]["displayName"], "Jan de Vries");
    assert!(body["student"].get("pinHash").is_none());
    assert_no_pin_hash(&body);

    let entries = app.audit_log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::LoginOk);
    assert_eq!(entries[0].student_id, Some(student.id));
    assert_eq!(entries[0].actor, format!("student:{}", student.id));
}

#[tokio::test]
async fn wrong_pin_is_unauthorized_and_audited_as_pin_attempt() {
    let app = TestApp::new();
    let student = app.seed_student("Jan de Vries", "123456");

    let (status, body) = app
        .login(json!({"displayName": "Jan de Vries", "pin": "000000"}))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid PIN");
    assert_no_pin_hash(&body);

    let entries = app.audit_log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::PinAttempt);
    assert_eq!(entries[0].student_id, Some(student.id));
    assert_eq!(reason(&entries[0]), Some("invalid_pin"));
}

#[tokio::test]
async fn unknown_display_name_is_not_found_and_audited() {
    let app = TestApp::new();
    app.seed_student("Jan de Vries", "123456");

    let (status, body) = app
        .login(json!({"displayName": "Unknown Name", "pin": "123456"}))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Student not found");

    let entries = app.audit_log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::LoginFail);
    assert_eq!(entries[0].student_id, None);
    assert_eq!(entries[0].actor, "student:Unknown Name");
    assert_eq!(reason(&entries[0]), Some("student_not_found"));
    assert_eq!(
        entries[0].metadata.0.get("display_name").and_then(Value::as_str),
        Some("Unknown Name")
    );
}

#[tokio::test]
async fn bad_pin_format_is_rejected_before_lookup() {
    let app = TestApp::new();
    app.seed_student("Jan de Vries", "123456");

    for pin in ["12", "1234567", "12a456", "", "12345 "] {
        let (status, body) = app
            .login(json!({"displayName": "Jan de Vries", "pin": pin}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "pin {pin:?}");
        assert_eq!(body["error"], "Invalid PIN format");
    }

    assert_eq!(app.students.lookups(), 0);
    assert!(app.audit_log.entries().is_empty());
}

#[tokio::test]
async fn malformed_body_is_bad_request_without_lookup() {
    let app = TestApp::new();

    let bodies = [
        "not json".to_string(),
        json!({"displayName": "Jan de Vries"}).to_string(),
        json!({"pin": "123456"}).to_string(),
        json!({"displayName": "Jan de Vries", "pin": 123456}).to_string(),
    ];
    for body in bodies {
        let (status, response) = app.login_raw(body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(response["error"], "Invalid request body");
    }

    assert_eq!(app.students.lookups(), 0);
    assert!(app.audit_log.entries().is_empty());
}

#[tokio::test]
async fn display_name_match_is_case_sensitive() {
    let app = TestApp::new();
    app.seed_student("Jan de Vries", "123456");

    let (status, _) = app
        .login(json!({"displayName": "jan de vries", "pin": "123456"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .login(json!({"displayName": "Jan de Vries ", "pin": "123456"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn each_attempt_leaves_exactly_one_entry() {
    let app = TestApp::new();
    app.seed_student("Jan de Vries", "123456");

    let attempts = [
        (json!({"displayName": "Jan de Vries", "pin": "123456"}), StatusCode::OK),
        (json!({"displayName": "Jan de Vries", "pin": "000000"}), StatusCode::UNAUTHORIZED),
        (json!({"displayName": "Unknown Name", "pin": "123456"}), StatusCode::NOT_FOUND),
        (json!({"displayName": "Jan de Vries", "pin": "111111"}), StatusCode::UNAUTHORIZED),
    ];
    for (index, (body, expected)) in attempts.into_iter().enumerate() {
        let (status, _) = app.login(body).await;
        assert_eq!(status, expected);
        assert_eq!(app.audit_log.entries().len(), index + 1);
    }
}

#[tokio::test]
async fn audit_entries_carry_client_context() {
    let app = TestApp::new();
    app.seed_student("Jan de Vries", "123456");

    app.login(json!({"displayName": "Jan de Vries", "pin": "123456"}))
        .await;

    let entry = app.audit_log.entries().pop().expect("audit entry");
    assert_eq!(entry.ip.as_deref(), Some("203.0.113.7"));
    assert_eq!(entry.user_agent.as_deref(), Some("integration-test"));
    let request_id = entry
        .metadata
        .0
        .get("request_id")
        .and_then(Value::as_str)
        .expect("request id");
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
}

#[tokio::test]
async fn audit_outage_does_not_change_outcomes() {
    let app = TestApp::new();
    app.seed_student("Jan de Vries", "123456");
    app.audit_log.fail_writes(true);

    let (status, body) = app
        .login(json!({"displayName": "Jan de Vries", "pin": "123456"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = app
        .login(json!({"displayName": "Jan de Vries", "pin": "000000"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .login(json!({"displayName": "Unknown Name", "pin": "123456"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.audit_log.attempted_writes(), 3);
}

#[tokio::test]
async fn store_outage_is_generic_500_and_audited() {
    let app = TestApp::new();
    app.seed_student("Jan de Vries", "123456");
    app.students.fail_lookups(true);

    let (status, body) = app
        .login(json!({"displayName": "Jan de Vries", "pin": "123456"}))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");

    let entries = app.audit_log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::LoginFail);
    assert_eq!(reason(&entries[0]), Some("internal_error"));
}

#[tokio::test]
async fn duplicate_display_name_uses_oldest_record() {
    let app = TestApp::new();
    let oldest = app.seed_student("Jan de Vries", "123456");
    app.seed_student("Jan de Vries", "654321");

    let (status, body) = app
        .login(json!({"displayName": "Jan de Vries", "pin": "123456"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student"]["id"], oldest.id.to_string());

    let (status, _) = app
        .login(json!({"displayName": "Jan de Vries", "pin": "654321"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_response_echoes_request_id() {
    let app = TestApp::new();
    app.seed_student("Jan de Vries", "123456");

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/student/login")
        .header("content-type", "application/json")
        .header("x-request-id", "req-42")
        .body(axum::body::Body::from(
            json!({"displayName": "Jan de Vries", "pin": "000000"}).to_string(),
        ))
        .expect("build request");
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .expect("call app");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-42"
    );
    let entry = app.audit_log.entries().pop().expect("audit entry");
    assert_eq!(
        entry.metadata.0.get("request_id").and_then(Value::as_str),
        Some("req-42")
    );
}

#[tokio::test]
async fn slow_audit_store_does_not_override_decided_login() {
    let mut config = support::test_config();
    config.request_timeout_seconds = 1;
    let app = TestApp::with_config(config);
    app.seed_student("Jan de Vries", "123456");
    app.audit_log.delay_writes(std::time::Duration::from_secs(3));

    let (status, body) = app
        .login(json!({"displayName": "Jan de Vries", "pin": "123456"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app
        .login(json!({"displayName": "Jan de Vries", "pin": "000000"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid PIN");

    assert_eq!(app.audit_log.attempted_writes(), 2);
}

#[tokio::test]
async fn oversized_display_name_is_clipped_in_audit_trail() {
    let app = TestApp::new();
    let long_name = "x".repeat(1_000);

    let (status, _) = app
        .login(json!({"displayName": long_name, "pin": "123456"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let entry = app.audit_log.entries().pop().expect("audit entry");
    assert_eq!(entry.actor, format!("student:{}", "x".repeat(100)));
    assert_eq!(
        entry
            .metadata
            .0
            .get("display_name")
            .and_then(Value::as_str)
            .map(str::len),
        Some(100)
    );
}

#[tokio::test]
async fn oversized_body_is_bad_request_without_lookup() {
    let app = TestApp::new();
    let huge_name = "x".repeat(100_000);

    let (status, body) = app
        .login(json!({"displayName": huge_name, "pin": "123456"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");
    assert_eq!(app.students.lookups(), 0);
    assert!(app.audit_log.entries().is_empty());
}

#[tokio::test]
async fn throttled_attempts_are_audited() {
    let mut config = support::test_config();
    config.rate_limit_login_enabled = true;
    config.rate_limit_login_max_requests = 1;
    config.rate_limit_login_window_seconds = 60;
    let app = TestApp::with_config(config);
    app.seed_student("Jan de Vries", "123456");

    let peer = std::net::SocketAddr::from(([198, 51, 100, 4], 40_000));
    let mut statuses = Vec::new();
    for _ in 0..3 {
        let mut request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/student/login")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                json!({"displayName": "Jan de Vries", "pin": "000000"}).to_string(),
            ))
            .expect("build request");
        request
            .extensions_mut()
            .insert(axum::extract::ConnectInfo(peer));
        let (status, _) = app.send(request).await;
        statuses.push(status);
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::UNAUTHORIZED,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );

    let entries = app.audit_log.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].action, AuditAction::PinAttempt);
    for throttled in &entries[1..] {
        assert_eq!(throttled.action, AuditAction::LoginFail);
        assert_eq!(throttled.actor, "client:198.51.100.4");
        assert_eq!(reason(throttled), Some("rate_limited"));
        assert_eq!(throttled.ip.as_deref(), Some("198.51.100.4"));
    }
}
