// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with short user-facing messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type shared by every service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Non-2xx from the spreadsheet, image host, mailer or oracle APIs.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No usable bearer token could be obtained.
    #[error("Authorization required: {0}")]
    AuthRequired(String),

    /// The consent exchange was rejected or failed.
    #[error("Consent denied: {0}")]
    ConsentDenied(String),

    #[error("Identity platform unavailable")]
    PlatformUnavailable,

    #[error("OAuth not initialized")]
    NotInitialized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already registered: {0}")]
    AlreadyRegistered(String),

    #[error(transparent)]
    Otp(#[from] OtpRejection),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Typed outcomes of a failed OTP verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtpRejection {
    #[error("OTP expired or not found. Please request a new code.")]
    NotFound,

    #[error("OTP has expired. Please request a new code.")]
    Expired,

    #[error("Too many failed attempts. Please request a new code.")]
    TooManyAttempts,

    #[error("Invalid code. {remaining} {} remaining.", attempts_word(.remaining))]
    Mismatch { remaining: u32 },
}

fn attempts_word(remaining: &u32) -> &'static str {
    if *remaining == 1 {
        "attempt"
    } else {
        "attempts"
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

impl AppError {
    /// Short human-readable message, safe to show to an end user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Transport(msg) if msg.contains("image") => {
                "Failed to process images. Please try again with smaller files.".to_string()
            }
            AppError::Transport(msg) if msg.contains("permission") => {
                "Permission denied. Please ensure you are logged in.".to_string()
            }
            AppError::Transport(_) => "Something went wrong. Please try again later.".to_string(),
            AppError::AuthRequired(_) | AppError::NotInitialized => {
                "Please sign in with Google to continue.".to_string()
            }
            AppError::ConsentDenied(_) => "Google sign-in was cancelled or denied.".to_string(),
            AppError::PlatformUnavailable => {
                "Google sign-in is unavailable right now. Please try again later.".to_string()
            }
            AppError::NotFound(what) if what.contains('@') => {
                "No account found with this email. Please Sign Up first.".to_string()
            }
            AppError::NotFound(what) => format!("Could not find {}.", what),
            AppError::AlreadyRegistered(_) => {
                "This email is already registered. Please login instead.".to_string()
            }
            AppError::Otp(rejection) => rejection.to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Storage(_) | AppError::Internal(_) => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::ConsentDenied(_) => (StatusCode::FORBIDDEN, "consent_denied"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::AuthRequired(_) | AppError::NotInitialized => {
                (StatusCode::UNAUTHORIZED, "unauthorized")
            }
            AppError::Transport(_) | AppError::PlatformUnavailable => {
                (StatusCode::BAD_GATEWAY, "upstream_error")
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::AlreadyRegistered(_) => (StatusCode::CONFLICT, "already_registered"),
            AppError::Otp(_) => (StatusCode::UNPROCESSABLE_ENTITY, "otp_rejected"),
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details: Some(self.user_message()),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for services
pub type Result<T> = std::result::Result<T, AppError>;
