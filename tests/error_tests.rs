// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{http::StatusCode, response::IntoResponse};
use nomadic_stays::error::{AppError, OtpRejection};

#[test]
fn test_otp_rejection_messages() {
    assert_eq!(
        OtpRejection::Mismatch { remaining: 4 }.to_string(),
        "Invalid code. 4 attempts remaining."
    );
    assert_eq!(
        OtpRejection::Mismatch { remaining: 1 }.to_string(),
        "Invalid code. 1 attempt remaining."
    );
    assert_eq!(
        OtpRejection::NotFound.to_string(),
        "OTP expired or not found. Please request a new code."
    );
}

#[test]
fn test_user_messages_are_short() {
    let err = AppError::AlreadyRegistered("a@x.com".to_string());
    assert_eq!(
        err.user_message(),
        "This email is already registered. Please login instead."
    );

    let err = AppError::NotFound("a@x.com".to_string());
    assert_eq!(
        err.user_message(),
        "No account found with this email. Please Sign Up first."
    );

    let err = AppError::Transport("image too large".to_string());
    assert_eq!(
        err.user_message(),
        "Failed to process images. Please try again with smaller files."
    );

    let err = AppError::Transport("The caller does not have permission".to_string());
    assert_eq!(
        err.user_message(),
        "Permission denied. Please ensure you are logged in."
    );

    let err = AppError::Internal(anyhow::anyhow!("stack trace goes here"));
    assert!(!err.user_message().contains("stack"));
}

#[test]
fn test_status_codes() {
    let cases = [
        (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
        (AppError::AuthRequired("x".into()), StatusCode::UNAUTHORIZED),
        (AppError::ConsentDenied("x".into()), StatusCode::FORBIDDEN),
        (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (AppError::AlreadyRegistered("x".into()), StatusCode::CONFLICT),
        (AppError::Transport("x".into()), StatusCode::BAD_GATEWAY),
        (AppError::Otp(OtpRejection::Expired), StatusCode::UNPROCESSABLE_ENTITY),
    ];
    for (err, status) in cases {
        assert_eq!(err.into_response().status(), status);
    }
}
