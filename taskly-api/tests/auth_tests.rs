/// Integration tests for registration, login, the current user and the JWT gate

mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use common::{TestContext, TEST_PASSWORD, TEST_SECRET};
use serde_json::json;
use taskly_shared::auth::jwt::{create_token, Claims};
use uuid::Uuid;

#[tokio::test]
async fn test_health_is_public() {
    let ctx = TestContext::new();

    let response = ctx.request(Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["backend"], "memory");
}

#[tokio::test]
async fn test_register_returns_user_and_token() {
    let ctx = TestContext::new();

    let response = ctx
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": " Ada ", "email": "ada@example.com", "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["user"]["name"], "Ada");
    assert_eq!(response.body["user"]["email"], "ada@example.com");
    assert_eq!(response.body["user"]["role"], "user");
    assert_eq!(response.body["user"]["teams"], json!([]));
    assert!(response.body["user"].get("passwordHash").is_none());
    assert!(response.body["user"].get("password_hash").is_none());
    assert!(response.body["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_register_validation_errors() {
    let ctx = TestContext::new();

    let cases = [
        json!({ "name": "", "email": "a@example.com", "password": TEST_PASSWORD }),
        json!({ "name": "A", "email": "not-an-email", "password": TEST_PASSWORD }),
        json!({ "name": "A", "email": "a@example.com", "password": "short1" }),
        json!({ "name": "A", "email": "a@example.com", "password": "lettersonly" }),
        json!({ "email": "a@example.com", "password": TEST_PASSWORD }),
    ];

    for body in cases {
        let response = ctx
            .request(Method::POST, "/api/auth/register", None, Some(body.clone()))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "accepted {}", body);
        assert_eq!(response.body["error"], "validation_error");
        assert!(response.body["errors"].as_array().is_some_and(|e| !e.is_empty()));
    }
}

#[tokio::test]
async fn test_register_duplicate_email_rejected() {
    let ctx = TestContext::new();
    ctx.register("Ada", "ada@example.com").await;

    let response = ctx
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Other", "email": "ada@example.com", "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "User already exists with that email");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::new();

    let response = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!("just a string")),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "bad_request");
}

#[tokio::test]
async fn test_login_returns_teams() {
    let ctx = TestContext::new();
    let ada = ctx.register("Ada", "ada@example.com").await;
    let team_id = ctx.create_team(&ada, "Eng").await;

    let response = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["id"], ada.id);
    assert_eq!(response.body["user"]["teams"], json!([{ "id": team_id, "name": "Eng" }]));
    assert!(response.body["token"].is_string());
}

#[tokio::test]
async fn test_login_wrong_password_issues_no_token() {
    let ctx = TestContext::new();
    ctx.register("Ada", "ada@example.com").await;

    let response = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrongpass1" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid credentials");
    assert!(response.body.get("token").is_none());
}

#[tokio::test]
async fn test_login_unknown_email_matches_wrong_password() {
    let ctx = TestContext::new();

    let response = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_me_returns_current_user() {
    let ctx = TestContext::new();
    let ada = ctx.register("Ada", "ada@example.com").await;
    ctx.create_team(&ada, "Eng").await;

    let response = ctx.get("/api/auth/me", &ada.token).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], ada.id);
    assert_eq!(response.body["teams"][0]["name"], "Eng");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();

    for uri in ["/api/auth/me", "/api/teams", "/api/tasks", "/api/tasks/my-tasks"] {
        let response = ctx.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(response.body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_rejects_bad_tokens() {
    let ctx = TestContext::new();
    let ada = ctx.register("Ada", "ada@example.com").await;
    let ada_id: Uuid = ada.id.parse().unwrap();

    let forged = create_token(&Claims::new(ada_id), "some-other-secret-of-32-bytes-or-more").unwrap();
    let expired = create_token(
        &Claims::with_expiration(ada_id, Duration::hours(-2)),
        TEST_SECRET,
    )
    .unwrap();
    let vanished = create_token(&Claims::new(Uuid::new_v4()), TEST_SECRET).unwrap();

    for token in ["garbage", forged.as_str(), expired.as_str(), vanished.as_str()] {
        let response = ctx.get("/api/auth/me", token).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let ctx = TestContext::new();

    let response = ctx.request(Method::GET, "/api/nothing-here", None, None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "Not Found - /api/nothing-here");
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let ctx = TestContext::new();
    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(ctx.app.clone(), request).await.unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}
