//! HTTP-level integration tests for the queue and session endpoints.
//!
//! Runs against the in-memory store through the full production
//! middleware stack.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, get, get_auth, login, post_auth, post_json, post_json_auth, put_json_auth,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Join the queue as the given session and return the new entry id.
async fn join_queue(app: axum::Router, token: &str, name: &str) -> String {
    let body = serde_json::json!({
        "name": name,
        "email": format!("{}@test.com", name.to_lowercase()),
    });
    let response = post_json_auth(app, "/api/v1/queue/join", token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["data"]["id"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Health and plumbing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let app = common::build_test_app();
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store_healthy"], true);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_test_app();
    let response = get(app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = common::build_test_app();
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );
    let id_str = request_id.unwrap().to_str().unwrap();
    assert_eq!(id_str.len(), 36, "x-request-id should be a UUID string");
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_returns_token_and_session() {
    let app = common::build_test_app();
    let body = serde_json::json!({
        "name": "Ada",
        "email": "ada@test.com",
        "role": "user",
    });
    let response = post_json(app, "/api/v1/session/login", body).await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert!(json["data"]["token"].is_string());
    assert_eq!(json["data"]["session"]["name"], "Ada");
    assert_eq!(json["data"]["session"]["role"], "user");
    assert!(json["data"]["session"]["id"].is_string());
}

#[tokio::test]
async fn login_with_invalid_email_is_rejected() {
    let app = common::build_test_app();
    let body = serde_json::json!({
        "name": "Ada",
        "email": "not-an-email",
        "role": "user",
    });
    let response = post_json(app, "/api/v1/session/login", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn queue_requires_a_session() {
    let app = common::build_test_app();
    let response = get(app, "/api/v1/queue").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn logout_invalidates_the_token() {
    let app = common::build_test_app();
    let token = login(app.clone(), "Ada", "user").await;

    let response = post_auth(app.clone(), "/api/v1/session/logout", &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(app, "/api/v1/session", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_update_keeps_id_and_role() {
    let app = common::build_test_app();
    let token = login(app.clone(), "Ada", "admin").await;

    let me = body_json(get_auth(app.clone(), "/api/v1/session", &token).await).await;
    let original_id = me["data"]["id"].as_str().unwrap().to_string();

    let body = serde_json::json!({ "name": "Ada L.", "email": "lovelace@test.com" });
    let response = put_json_auth(app, "/api/v1/session/profile", &token, body).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "Ada L.");
    assert_eq!(json["data"]["email"], "lovelace@test.com");
    assert_eq!(json["data"]["id"], original_id.as_str());
    assert_eq!(json["data"]["role"], "admin");
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_creates_a_pending_entry() {
    let app = common::build_test_app();
    let token = login(app.clone(), "Bob", "user").await;

    let body = serde_json::json!({ "name": "Bob", "email": "bob@test.com" });
    let response = post_json_auth(app.clone(), "/api/v1/queue/join", &token, body).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["user_name"], "Bob");
    assert!(json["data"]["token_number"].is_null());
    assert!(json["data"]["position"].is_null());

    // The entry shows up in the snapshot.
    let snapshot = body_json(get_auth(app, "/api/v1/queue", &token).await).await;
    assert_eq!(snapshot["data"]["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn joining_twice_conflicts() {
    let app = common::build_test_app();
    let token = login(app.clone(), "Bob", "user").await;

    join_queue(app.clone(), &token, "Bob").await;

    let body = serde_json::json!({ "name": "Bob", "email": "bob@test.com" });
    let response = post_json_auth(app, "/api/v1/queue/join", &token, body).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "ALREADY_QUEUED");
}

// ---------------------------------------------------------------------------
// Operator authorization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_admin_cannot_approve() {
    let app = common::build_test_app();
    let token = login(app.clone(), "Bob", "user").await;
    let entry_id = join_queue(app.clone(), &token, "Bob").await;

    let response = post_auth(app, &format!("/api/v1/queue/{entry_id}/approve"), &token).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "FORBIDDEN");
}

#[tokio::test]
async fn non_admin_cannot_reset_or_broadcast() {
    let app = common::build_test_app();
    let token = login(app.clone(), "Bob", "user").await;

    let response = post_auth(app.clone(), "/api/v1/queue/reset", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = serde_json::json!({ "message": "hello" });
    let response = post_json_auth(app, "/api/v1/queue/broadcast", &token, body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Admission flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approve_then_call_next_serves_the_first_token() {
    let app = common::build_test_app();
    let admin = login(app.clone(), "Op", "admin").await;
    let user = login(app.clone(), "Bob", "user").await;
    let entry_id = join_queue(app.clone(), &user, "Bob").await;

    // Approve: first token, tail position.
    let response = post_auth(
        app.clone(),
        &format!("/api/v1/queue/{entry_id}/approve"),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "approved");
    assert_eq!(json["data"]["token_number"], 1);
    assert_eq!(json["data"]["position"], 1);

    // Call next: the entry is promoted to the counter.
    let response = post_auth(app.clone(), "/api/v1/queue/call-next", &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "serving");
    assert_eq!(json["data"]["token_number"], 1);
    assert_eq!(json["data"]["position"], 0);

    // Metadata tracks the serving token.
    let snapshot = body_json(get_auth(app, "/api/v1/queue", &admin).await).await;
    assert_eq!(snapshot["data"]["metadata"]["current_serving_token"], 1);
    assert_eq!(snapshot["data"]["metadata"]["last_token_number"], 1);
}

#[tokio::test]
async fn tokens_are_sequential_across_users() {
    let app = common::build_test_app();
    let admin = login(app.clone(), "Op", "admin").await;

    for (i, name) in ["Ann", "Ben", "Cal"].iter().enumerate() {
        let user = login(app.clone(), name, "user").await;
        let entry_id = join_queue(app.clone(), &user, name).await;

        let response = post_auth(
            app.clone(),
            &format!("/api/v1/queue/{entry_id}/approve"),
            &admin,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["token_number"], i as i64 + 1);
        assert_eq!(json["data"]["position"], i as i64 + 1);
    }
}

#[tokio::test]
async fn call_next_on_empty_queue_conflicts() {
    let app = common::build_test_app();
    let admin = login(app.clone(), "Op", "admin").await;

    let response = post_auth(app, "/api/v1/queue/call-next", &admin).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "QUEUE_EMPTY");
}

#[tokio::test]
async fn approve_unknown_entry_is_404() {
    let app = common::build_test_app();
    let admin = login(app.clone(), "Op", "admin").await;

    let bogus = uuid::Uuid::new_v4();
    let response = post_auth(app, &format!("/api/v1/queue/{bogus}/approve"), &admin).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn reject_leaves_no_token() {
    let app = common::build_test_app();
    let admin = login(app.clone(), "Op", "admin").await;
    let user = login(app.clone(), "Bob", "user").await;
    let entry_id = join_queue(app.clone(), &user, "Bob").await;

    let response = post_auth(app, &format!("/api/v1/queue/{entry_id}/reject"), &admin).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "rejected");
    assert!(json["data"]["token_number"].is_null());
    assert!(json["data"]["position"].is_null());
}

#[tokio::test]
async fn skip_removes_the_entry_from_the_line() {
    let app = common::build_test_app();
    let admin = login(app.clone(), "Op", "admin").await;
    let user = login(app.clone(), "Bob", "user").await;
    let entry_id = join_queue(app.clone(), &user, "Bob").await;

    let response = post_auth(
        app.clone(),
        &format!("/api/v1/queue/{entry_id}/approve"),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_auth(app, &format!("/api/v1/queue/{entry_id}/skip"), &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "skipped");
    assert!(json["data"]["position"].is_null());
    // The issued token is kept for the record.
    assert_eq!(json["data"]["token_number"], 1);
}

#[tokio::test]
async fn skip_pending_entry_conflicts() {
    let app = common::build_test_app();
    let admin = login(app.clone(), "Op", "admin").await;
    let user = login(app.clone(), "Bob", "user").await;
    let entry_id = join_queue(app.clone(), &user, "Bob").await;

    let response = post_auth(app, &format!("/api/v1/queue/{entry_id}/skip"), &admin).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_TRANSITION");
}

// ---------------------------------------------------------------------------
// Reset and broadcast
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_clears_entries_and_metadata() {
    let app = common::build_test_app();
    let admin = login(app.clone(), "Op", "admin").await;
    let user = login(app.clone(), "Bob", "user").await;
    let entry_id = join_queue(app.clone(), &user, "Bob").await;

    let response = post_auth(
        app.clone(),
        &format!("/api/v1/queue/{entry_id}/approve"),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_auth(app.clone(), "/api/v1/queue/reset", &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["cleared"], true);

    let snapshot = body_json(get_auth(app.clone(), "/api/v1/queue", &admin).await).await;
    assert_eq!(snapshot["data"]["entries"].as_array().unwrap().len(), 0);
    assert_eq!(snapshot["data"]["metadata"]["last_token_number"], 0);
    assert!(snapshot["data"]["metadata"]["current_serving_token"].is_null());

    // Token numbering starts over after a reset.
    let entry_id = join_queue(app.clone(), &user, "Bob").await;
    let response = post_auth(app, &format!("/api/v1/queue/{entry_id}/approve"), &admin).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["token_number"], 1);
}

#[tokio::test]
async fn broadcast_accepts_a_message() {
    let app = common::build_test_app();
    let admin = login(app.clone(), "Op", "admin").await;

    let body = serde_json::json!({ "message": "Counter 2 is closing soon" });
    let response = post_json_auth(app, "/api/v1/queue/broadcast", &admin, body).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["sent"], true);
}

#[tokio::test]
async fn broadcast_rejects_blank_message() {
    let app = common::build_test_app();
    let admin = login(app.clone(), "Op", "admin").await;

    let body = serde_json::json!({ "message": "   " });
    let response = post_json_auth(app, "/api/v1/queue/broadcast", &admin, body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
