// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Protected routes accept bearer tokens and the session cookie
//! 3. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use health_sync::config::Config;
use tower::ServiceExt;

mod common;
use common::{create_test_app, create_test_jwt};

#[tokio::test]
async fn test_health_is_public() {
    let (app, _, _) = create_test_app(Config::test_default());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_without_token() {
    for (method, uri) in [
        ("GET", "/api/metrics"),
        ("GET", "/api/integrations"),
        ("POST", "/api/sync/oura"),
        ("GET", "/auth/oura/connect"),
    ] {
        let (app, _, _) = create_test_app(Config::test_default());
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
    }
}

#[tokio::test]
async fn test_protected_route_with_wrong_key() {
    let (app, _, _) = create_test_app(Config::test_default());
    let jwt = create_test_jwt("u1", b"some_other_signing_key_entirely");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/integrations")
                .header(header::AUTHORIZATION, format!("Bearer {}", jwt))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_bearer_token() {
    let config = Config::test_default();
    let jwt = create_test_jwt("u1", &config.jwt_signing_key);
    let (app, _, _) = create_test_app(config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/integrations")
                .header(header::AUTHORIZATION, format!("Bearer {}", jwt))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_route_with_session_cookie() {
    let config = Config::test_default();
    let jwt = create_test_jwt("u1", &config.jwt_signing_key);
    let (app, _, _) = create_test_app(config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/integrations")
                .header(header::COOKIE, format!("health_sync_token={}", jwt))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_preflight_from_frontend() {
    let config = Config::test_default();
    let origin = config.frontend_url.clone();
    let (app, _, _) = create_test_app(config);

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/metrics")
                .header(header::ORIGIN, origin.as_str())
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        origin.as_str()
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    for origin in [
        "https://evil.example.com",
        "http://localhost.evil.example",
        "http://127.0.0.1.evil.example",
    ] {
        let (app, _, _) = create_test_app(Config::test_default());

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/metrics")
                    .header(header::ORIGIN, origin)
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none(),
            "{}",
            origin
        );
    }
}
