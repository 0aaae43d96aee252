// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod consent;
pub mod images;
pub mod mailer;
pub mod oauth;
pub mod oracle;
pub mod otp;
pub mod payment;
pub mod stays;

pub use auth::{AuthService, AuthState, PendingSignup, SignUpRequest};
pub use images::{ImageHost, ImageUpload, UploadFailed, UploadOutcome};
pub use mailer::Mailer;
pub use oauth::{ConsentProvider, GoogleConsent, TokenManager, TokenStatus};
pub use oracle::{OracleVerdict, PaymentOracle};
pub use otp::{OtpDelivery, OtpDispatch, OtpService};
pub use payment::{PaymentService, PaymentVerification};
pub use stays::{RegisteredStay, StayService};
