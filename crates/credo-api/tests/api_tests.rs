//! API Integration Tests
//!
//! Every test drives the full router against the in-memory credential store.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use credo_api::{create_router, create_router_for_testing, test_state};
use credo_core::FixedClock;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    create_router_for_testing().unwrap()
}

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Register a user and return the response body
async fn register(app: &Router, email: &str, password: &str, name: &str) -> Value {
    let response = send(
        app,
        create_json_request(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": email, "password": password, "name": name })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn login(app: &Router, email: &str, password: &str) -> Response {
    send(
        app,
        create_json_request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let response = send(&app(), create_json_request("GET", "/health", None, None)).await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let response = send(&app(), create_json_request("GET", "/ready", None, None)).await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"]["credential_store"], true);
}

#[tokio::test]
async fn test_readiness_after_shutdown_started() {
    let state = test_state(Arc::new(credo_core::SystemClock)).unwrap();
    let app = create_router(state.clone());
    state.set_ready(false);

    let response = send(&app, create_json_request("GET", "/ready", None, None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["ready"], false);
    assert_eq!(json["checks"]["accepting_traffic"], false);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = app();
    send(&app, create_json_request("GET", "/health", None, None)).await;

    let response = send(&app, create_json_request("GET", "/metrics", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    assert!(text.contains("credo_http_requests_total{endpoint=\"/health\",status=\"200\"} 1"));
}

#[tokio::test]
async fn test_metrics_group_unknown_paths() {
    let app = app();
    for i in 0..5 {
        let path = format!("/scan-{i}-x");
        let response = send(&app, create_json_request("GET", &path, None, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let response = send(&app, create_json_request("GET", "/metrics", None, None)).await;
    let text = body_text(response).await;

    assert!(text.contains("credo_http_requests_total{endpoint=\"unmatched\",status=\"404\"} 5"));
    assert!(!text.contains("scan-"));
}

#[tokio::test]
async fn test_metrics_label_protected_routes_by_template() {
    let app = app();
    let registered = register(&app, "ada@example.com", "secret1", "Ada").await;
    let token = registered["token"].as_str().unwrap();
    send(
        &app,
        create_json_request("GET", "/api/v1/users/profile", Some(token), None),
    )
    .await;

    let response = send(&app, create_json_request("GET", "/metrics", None, None)).await;
    let text = body_text(response).await;

    assert!(text.contains(
        "credo_http_requests_total{endpoint=\"/api/v1/users/profile\",status=\"200\"} 1"
    ));
    assert!(text.contains(
        "credo_http_requests_total{endpoint=\"/auth/register\",status=\"201\"} 1"
    ));
}

#[tokio::test]
async fn test_openapi_document() {
    let response = send(
        &app(),
        create_json_request("GET", "/api-docs/openapi.json", None, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["paths"]["/auth/register"].is_object());
    assert!(json["paths"]["/api/v1/users/profile"].is_object());
    assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = send(&app(), create_json_request("GET", "/nope", None, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let response = send(&app(), create_json_request("GET", "/health", None, None)).await;

    assert_eq!(
        response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
}

// =============================================================================
// Registration Tests
// =============================================================================

#[tokio::test]
async fn test_register_returns_user_and_token() {
    let json = register(&app(), "ada@example.com", "secret1", "Ada").await;

    assert_eq!(json["user"]["email"], "ada@example.com");
    assert_eq!(json["user"]["name"], "Ada");
    assert!(json["user"]["id"].is_string());
    assert!(json["user"].get("password_hash").is_none());
    assert!(!json["token"].as_str().unwrap().is_empty());
    assert!(json["expires_at"].is_number());
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = app();
    register(&app, "ada@example.com", "secret1", "Ada").await;

    let response = send(
        &app,
        create_json_request(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": "ada@example.com", "password": "other99", "name": "Other" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "USER_EXISTS");
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = app();
    let cases = [
        json!({ "email": "not-an-email", "password": "secret1", "name": "Ada" }),
        json!({ "email": "ada@example.com", "password": "short", "name": "Ada" }),
        json!({ "email": "ada@example.com", "password": "secret1", "name": "" }),
    ];

    for body in cases {
        let response = send(
            &app,
            create_json_request("POST", "/auth/register", None, Some(body.clone())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_malformed_bodies_get_json_errors() {
    let app = app();

    let missing_field = send(
        &app,
        create_json_request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "ada@example.com" })),
        ),
    )
    .await;

    let not_json = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;

    let no_content_type = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/auth/login")
            .body(Body::from(r#"{"email":"ada@example.com","password":"secret1"}"#))
            .unwrap(),
    )
    .await;

    for response in [missing_field, not_json, no_content_type] {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let json = body_json(response).await;
        assert_eq!(json["code"], "INVALID_REQUEST");
        assert_eq!(json["message"], "Invalid request format");
    }
}

#[tokio::test]
async fn test_protected_route_malformed_body() {
    let app = app();
    let registered = register(&app, "ada@example.com", "secret1", "Ada").await;
    let token = registered["token"].as_str().unwrap();

    let response = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/users/change-password",
            Some(token),
            Some(json!({ "old_password": "secret1" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_REQUEST");
}

// =============================================================================
// Login Tests
// =============================================================================

#[tokio::test]
async fn test_login_success() {
    let app = app();
    let registered = register(&app, "ada@example.com", "secret1", "Ada").await;

    let response = login(&app, "ada@example.com", "secret1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["user"]["id"], registered["user"]["id"]);
    assert!(json["token"].is_string());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = app();
    register(&app, "ada@example.com", "secret1", "Ada").await;

    let wrong_password = login(&app, "ada@example.com", "wrong-password").await;
    let unknown_email = login(&app, "nobody@example.com", "secret1").await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong_password).await, body_json(unknown_email).await);
}

// =============================================================================
// Profile Tests
// =============================================================================

#[tokio::test]
async fn test_profile_requires_token() {
    let app = app();

    let response = send(
        &app,
        create_json_request("GET", "/api/v1/users/profile", None, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");

    let response = send(
        &app,
        create_json_request("GET", "/api/v1/users/profile", Some("not.a.token"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn test_get_profile() {
    let app = app();
    let registered = register(&app, "ada@example.com", "secret1", "Ada").await;
    let token = registered["token"].as_str().unwrap();

    let response = send(
        &app,
        create_json_request("GET", "/api/v1/users/profile", Some(token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["id"], registered["user"]["id"]);
    assert_eq!(json["email"], "ada@example.com");
}

#[tokio::test]
async fn test_update_profile() {
    let app = app();
    let registered = register(&app, "ada@example.com", "secret1", "Ada").await;
    let token = registered["token"].as_str().unwrap();

    let response = send(
        &app,
        create_json_request(
            "PUT",
            "/api/v1/users/profile",
            Some(token),
            Some(json!({ "name": "Ada Lovelace", "email": "lovelace@example.com" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["name"], "Ada Lovelace");
    assert_eq!(json["email"], "lovelace@example.com");

    // The new email is the login identity now
    assert_eq!(
        login(&app, "lovelace@example.com", "secret1").await.status(),
        StatusCode::OK
    );
    assert_eq!(
        login(&app, "ada@example.com", "secret1").await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_update_profile_email_taken() {
    let app = app();
    register(&app, "grace@example.com", "secret1", "Grace").await;
    let registered = register(&app, "ada@example.com", "secret1", "Ada").await;
    let token = registered["token"].as_str().unwrap();

    let response = send(
        &app,
        create_json_request(
            "PUT",
            "/api/v1/users/profile",
            Some(token),
            Some(json!({ "name": "Ada", "email": "grace@example.com" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "USER_EXISTS");
}

// =============================================================================
// Password Change Tests
// =============================================================================

#[tokio::test]
async fn test_change_password() {
    let app = app();
    let registered = register(&app, "ada@example.com", "secret1", "Ada").await;
    let token = registered["token"].as_str().unwrap();

    let response = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/users/change-password",
            Some(token),
            Some(json!({ "old_password": "secret1", "new_password": "secret2" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["message"].is_string());

    assert_eq!(
        login(&app, "ada@example.com", "secret2").await.status(),
        StatusCode::OK
    );
    assert_eq!(
        login(&app, "ada@example.com", "secret1").await.status(),
        StatusCode::UNAUTHORIZED
    );

    // Tokens issued before the change stay valid until they expire
    let response = send(
        &app,
        create_json_request("GET", "/api/v1/users/profile", Some(token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_change_password_wrong_current() {
    let app = app();
    let registered = register(&app, "ada@example.com", "secret1", "Ada").await;
    let token = registered["token"].as_str().unwrap();

    let response = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/users/change-password",
            Some(token),
            Some(json!({ "old_password": "nope-nope", "new_password": "secret2" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_CURRENT_PASSWORD");
    assert_eq!(
        login(&app, "ada@example.com", "secret1").await.status(),
        StatusCode::OK
    );
}

// =============================================================================
// Token Expiry Tests
// =============================================================================

#[tokio::test]
async fn test_expired_token_rejected() {
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let state = test_state(clock.clone()).unwrap();
    let ttl = state.config.auth.token_ttl_secs as i64;
    let app = create_router(state);

    let registered = register(&app, "ada@example.com", "secret1", "Ada").await;
    let token = registered["token"].as_str().unwrap();

    clock.advance(chrono::Duration::seconds(ttl));

    let response = send(
        &app,
        create_json_request("GET", "/api/v1/users/profile", Some(token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "TOKEN_EXPIRED");
}
