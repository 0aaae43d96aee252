// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Loopback OAuth callback handler tests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use nomadic_stays::error::AppError;
use nomadic_stays::services::consent::callback_router;
use tokio::sync::oneshot;
use tower::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_callback_delivers_code() {
    let (tx, rx) = oneshot::channel();
    let app = callback_router("expected-state".to_string(), tx);

    let response = app
        .oneshot(get("/callback?code=4%2F0Adeu5B&state=expected-state"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(rx.await.unwrap().unwrap(), "4/0Adeu5B");
}

#[tokio::test]
async fn test_callback_rejects_foreign_state() {
    let (tx, mut rx) = oneshot::channel();
    let app = callback_router("expected-state".to_string(), tx);

    let response = app
        .clone()
        .oneshot(get("/callback?code=abc&state=forged"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(rx.try_recv().is_err(), "flow keeps waiting");

    let response = app.oneshot(get("/callback?code=abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_callback_reports_denial() {
    let (tx, rx) = oneshot::channel();
    let app = callback_router("expected-state".to_string(), tx);

    let response = app
        .oneshot(get("/callback?error=access_denied&state=expected-state"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let outcome = rx.await.unwrap();
    assert!(matches!(outcome, Err(AppError::ConsentDenied(e)) if e == "access_denied"));
}

#[tokio::test]
async fn test_callback_without_code() {
    let (tx, mut rx) = oneshot::channel();
    let app = callback_router("expected-state".to_string(), tx);

    let response = app
        .oneshot(get("/callback?state=expected-state"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(rx.try_recv().is_err());
}
