use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

use usagegraph_app::AppState;
use usagegraph_core::{
    SubmissionPayload, TokenUsage, UsageEvent, aggregate_events, build_payload, source_checksum,
};
use usagegraph_http::HttpState;

struct TestApp {
    _temp_dir: tempfile::TempDir,
    router: axum::Router,
    token: String,
}

fn build_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let app_state = AppState::new(temp_dir.path().join("test.sqlite"));
    app_state.setup_db().expect("setup db");
    let token = app_state
        .services
        .tokens
        .mint("user-1", Some("test"), None)
        .expect("mint token");
    let router = usagegraph_http::router(HttpState::new(app_state));

    TestApp {
        _temp_dir: temp_dir,
        router,
        token,
    }
}

fn event(date: &str, source: &str, model: &str, input: u64, cost: f64) -> UsageEvent {
    UsageEvent {
        date: date.to_string(),
        source: source.to_string(),
        model: model.to_string(),
        tokens: TokenUsage {
            input,
            output: 0,
            cache_read: 0,
            cache_write: 0,
            reasoning: 0,
        },
        cost,
        messages: 1,
    }
}

fn payload_of(events: &[UsageEvent]) -> SubmissionPayload {
    build_payload(aggregate_events(events), "0.1.0", "2024-06-01T00:00:00Z")
}

async fn get_checksums(app: &TestApp, token: &str) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/sync/checksums")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let body = response.into_body().collect().await.expect("body").to_bytes();
    (status, serde_json::from_slice(&body).expect("json body"))
}

async fn post_submit(app: &TestApp, token: &str, payload: &SubmissionPayload) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sync/submit")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(serde_json::to_vec(payload).expect("serialize")))
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let body = response.into_body().collect().await.expect("body").to_bytes();
    (status, serde_json::from_slice(&body).expect("json body"))
}

#[tokio::test]
async fn rejects_missing_bearer_header() {
    let app = build_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/sync/checksums")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response.into_body().collect().await.expect("body").to_bytes();
    let payload: Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(payload["code"], "auth_required");
}

#[tokio::test]
async fn rejects_unknown_token() {
    let app = build_app();
    let (status, body) = get_checksums(&app, "not-a-real-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "auth_invalid");
}

#[tokio::test]
async fn checksums_empty_for_fresh_identity() {
    let app = build_app();
    let (status, body) = get_checksums(&app, &app.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({}));
}

#[tokio::test]
async fn rejects_invalid_payload_with_details() {
    let app = build_app();
    let mut payload = payload_of(&[event("2024-01-01", "opencode", "m1", 100, 0.01)]);
    payload.contributions[0].date = "garbage".to_string();
    payload.summary.total_cost += 5.0;

    let (status, body) = post_submit(&app, &app.token, &payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_payload");
    let details = body["details"].as_array().expect("details array");
    assert!(details.len() >= 2);

    // Nothing was persisted.
    let (_, table) = get_checksums(&app, &app.token).await;
    assert_eq!(table, serde_json::json!({}));
}

#[tokio::test]
async fn first_submission_roundtrip_exposes_matching_checksum() {
    let app = build_app();
    let payload = payload_of(&[event("2024-01-01", "opencode", "m1", 100, 0.01)]);

    let (status, receipt) = post_submit(&app, &app.token, &payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["success"], true);
    assert_eq!(receipt["metrics"]["totalTokens"], 100);
    assert_eq!(receipt["metrics"]["activeDays"], 1);
    assert_eq!(receipt["metrics"]["dateRange"]["start"], "2024-01-01");
    assert!(receipt["submissionId"].as_i64().is_some());

    let (status, table) = get_checksums(&app, &app.token).await;
    assert_eq!(status, StatusCode::OK);
    let expected = source_checksum(&payload.contributions[0].sources["opencode"]);
    assert_eq!(table["2024-01-01"]["opencode"], Value::String(expected));
    // Exactly one day, one source.
    assert_eq!(table.as_object().expect("table").len(), 1);
    assert_eq!(table["2024-01-01"].as_object().expect("day").len(), 1);
}

#[tokio::test]
async fn identical_resubmission_leaves_checksums_unchanged() {
    let app = build_app();
    let payload = payload_of(&[event("2024-01-01", "opencode", "m1", 100, 0.01)]);

    post_submit(&app, &app.token, &payload).await;
    let (_, before) = get_checksums(&app, &app.token).await;
    post_submit(&app, &app.token, &payload).await;
    let (_, after) = get_checksums(&app, &app.token).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn partial_submission_keeps_unnamed_days_intact() {
    let app = build_app();
    let full = payload_of(&[
        event("2024-01-01", "opencode", "m1", 100, 0.01),
        event("2024-01-02", "opencode", "m1", 200, 0.02),
    ]);
    post_submit(&app, &app.token, &full).await;
    let (_, before) = get_checksums(&app, &app.token).await;

    // Diff payload carrying only a changed first day.
    let partial = payload_of(&[event("2024-01-01", "opencode", "m1", 100, 0.05)]);
    let (status, receipt) = post_submit(&app, &app.token, &partial).await;
    assert_eq!(status, StatusCode::OK);

    let (_, after) = get_checksums(&app, &app.token).await;
    assert_eq!(after["2024-01-02"], before["2024-01-02"]);
    assert_ne!(after["2024-01-01"], before["2024-01-01"]);
    // Metrics span the stored union of both days.
    assert_eq!(receipt["metrics"]["totalTokens"], 300);
    assert_eq!(receipt["metrics"]["dateRange"]["end"], "2024-01-02");
}

#[tokio::test]
async fn identities_do_not_observe_each_other() {
    let app = build_app();
    let other = {
        let state = usagegraph_app::AppState::new(app._temp_dir.path().join("test.sqlite"));
        state
            .services
            .tokens
            .mint("user-2", None, None)
            .expect("mint token")
    };

    let payload = payload_of(&[event("2024-01-01", "opencode", "m1", 100, 0.01)]);
    post_submit(&app, &app.token, &payload).await;

    let (status, table) = get_checksums(&app, &other).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(table, serde_json::json!({}));
}
