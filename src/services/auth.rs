// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-up, sign-in and the cached session.
//!
//! Passwords are accepted by the email flows but never stored or checked:
//! a matching email is enough to sign in. Callers must not treat the
//! resulting session as proof of identity.

use crate::error::{AppError, Result};
use crate::ids;
use crate::models::{Session, User};
use crate::services::oauth::TokenManager;
use crate::services::otp::{OtpDispatch, OtpService};
use crate::sheets::SheetsGateway;
use crate::storage::{keys, ClientStorage};
use crate::time_utils::format_utc_rfc3339;
use chrono::Utc;
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use validator::Validate;

/// Email/password sign-up form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

/// Signed-in state as observed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedIn(Session),
    SignedOut,
}

/// New Google account waiting for its OTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSignup {
    pub email: String,
    pub name: String,
    pub dispatch: OtpDispatch,
}

#[derive(Clone)]
pub struct AuthService {
    gateway: SheetsGateway,
    tokens: Arc<TokenManager>,
    otp: OtpService,
    storage: ClientStorage,
    session: Arc<RwLock<Option<Session>>>,
}

impl AuthService {
    pub fn new(
        gateway: SheetsGateway,
        tokens: Arc<TokenManager>,
        otp: OtpService,
        storage: ClientStorage,
    ) -> Self {
        Self {
            gateway,
            tokens,
            otp,
            storage,
            session: Arc::new(RwLock::new(None)),
        }
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>> {
        let users = self.gateway.fetch_records::<User>().await?;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    /// Whether a user row with exactly this email exists.
    ///
    /// Read failures are logged and reported as "no such user".
    pub async fn check_user_exists(&self, email: &str) -> bool {
        match self.find_user(email).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "User lookup failed");
                false
            }
        }
    }

    /// Create a user row and sign the new user in.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<Session> {
        request.validate()?;
        tracing::info!(email = %request.email, "Starting sign-up");

        if self.find_user(&request.email).await?.is_some() {
            return Err(AppError::AlreadyRegistered(request.email));
        }

        let user = self
            .create_user(&request.email, &request.name, false)
            .await?;
        self.establish(Session::from(&user))
    }

    /// Sign in by email. The password is not verified.
    pub async fn sign_in(&self, email: &str, _password: &str) -> Result<Session> {
        tracing::info!(email = %email, "Starting sign-in");

        let user = self
            .find_user(email)
            .await?
            .ok_or_else(|| AppError::NotFound(email.to_string()))?;

        self.establish(Session::from(&user))
    }

    /// Forget the session in memory and in storage.
    pub fn sign_out(&self) -> Result<()> {
        *self.session.write().unwrap_or_else(|p| p.into_inner()) = None;
        self.storage.remove(keys::SESSION)?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Session from memory, else from storage. Unreadable sessions count as none.
    pub fn current_user(&self) -> Option<Session> {
        let cached = self.session.read().unwrap_or_else(|p| p.into_inner()).clone();
        if cached.is_some() {
            return cached;
        }

        let stored: Session = self.storage.get_json(keys::SESSION)?;
        *self.session.write().unwrap_or_else(|p| p.into_inner()) = Some(stored.clone());
        Some(stored)
    }

    /// Resolve the signed-in state once. Later changes are not reported.
    pub async fn auth_state(&self) -> AuthState {
        match self.current_user() {
            Some(session) => AuthState::SignedIn(session),
            None => AuthState::SignedOut,
        }
    }

    // ─── Google identity flow ────────────────────────────────────

    /// Email and display name of the Google account behind the token.
    async fn google_identity(&self) -> Result<(String, String)> {
        let profile = self.tokens.fetch_profile().await?;
        let name = profile.display_name();
        let email = profile
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                AppError::BadRequest("Could not retrieve email from Google account".to_string())
            })?;
        Ok((email, name))
    }

    /// Sign in an existing user identified by their Google account.
    pub async fn google_sign_in(&self) -> Result<Session> {
        let (email, profile_name) = self.google_identity().await?;

        let user = self
            .find_user(&email)
            .await?
            .ok_or_else(|| AppError::NotFound(email.clone()))?;

        let name = if user.name.is_empty() {
            profile_name
        } else {
            user.name.clone()
        };

        self.establish(Session {
            uid: user.id,
            name,
            email,
        })
    }

    /// Begin sign-up for a new Google account by sending an OTP.
    pub async fn google_sign_up_start(&self) -> Result<PendingSignup> {
        let (email, name) = self.google_identity().await?;

        if self.find_user(&email).await?.is_some() {
            return Err(AppError::AlreadyRegistered(email));
        }

        let dispatch = self.otp.send(&email).await?;
        Ok(PendingSignup {
            email,
            name,
            dispatch,
        })
    }

    /// Finish a Google sign-up once the OTP checks out.
    pub async fn google_sign_up_complete(&self, pending: &PendingSignup, code: &str) -> Result<Session> {
        self.otp.verify(&pending.email, code).await?;

        let user = self.create_user(&pending.email, &pending.name, true).await?;
        self.establish(Session::from(&user))
    }

    /// Revoke the Google token and drop the session.
    pub async fn revoke_access(&self) -> Result<()> {
        self.tokens.revoke().await?;
        self.sign_out()
    }

    // ─── Internals ───────────────────────────────────────────────

    async fn create_user(&self, email: &str, name: &str, email_verified: bool) -> Result<User> {
        let user = User {
            id: ids::user_id(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: format_utc_rfc3339(Utc::now()),
            email_verified,
        };
        self.gateway.append_record(&user).await?;
        tracing::info!(user_id = %user.id, email = %user.email, "User created");
        Ok(user)
    }

    fn establish(&self, session: Session) -> Result<Session> {
        self.storage.set_json(keys::SESSION, &session)?;
        *self.session.write().unwrap_or_else(|p| p.into_inner()) = Some(session.clone());
        tracing::info!(uid = %session.uid, "Session established");
        Ok(session)
    }
}
