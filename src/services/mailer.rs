// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound OTP email through the EmailJS REST API.

use crate::config::EmailJsConfig;
use crate::error::{AppError, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Template parameters of the OTP email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpEmail {
    pub to_email: String,
    pub otp_code: String,
    /// Human-readable expiry, e.g. "14:05 UTC"
    pub expiry_time: String,
}

/// Email dispatch backend.
#[derive(Clone)]
pub enum Mailer {
    EmailJs(EmailJsClient),
    Mock(MockMailer),
    /// No mail credentials configured; every send fails.
    Disabled,
}

impl Mailer {
    pub fn from_config(config: Option<&EmailJsConfig>) -> Self {
        match config {
            Some(c) => Mailer::EmailJs(EmailJsClient::new(c.clone())),
            None => Mailer::Disabled,
        }
    }

    /// Create a recording mailer for testing (offline mode).
    pub fn new_mock() -> (Self, MockMailer) {
        let mock = MockMailer::default();
        (Mailer::Mock(mock.clone()), mock)
    }

    pub async fn send_otp(&self, email: &OtpEmail) -> Result<()> {
        match self {
            Mailer::EmailJs(client) => client.send(email).await,
            Mailer::Mock(mock) => mock.send(email),
            Mailer::Disabled => Err(AppError::Transport(
                "Email delivery is not configured".to_string(),
            )),
        }
    }
}

/// EmailJS client.
#[derive(Clone)]
pub struct EmailJsClient {
    http: reqwest::Client,
    config: EmailJsConfig,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a OtpEmail,
}

impl EmailJsClient {
    pub fn new(config: EmailJsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn send(&self, email: &OtpEmail) -> Result<()> {
        let body = SendRequest {
            service_id: &self.config.service_id,
            template_id: &self.config.template_id,
            user_id: &self.config.public_key,
            template_params: email,
        };

        let response = self
            .http
            .post(EMAILJS_SEND_URL)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Email request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %text, "EmailJS rejected message");
            return Err(AppError::Transport(format!(
                "Email service returned {}",
                status
            )));
        }

        tracing::info!(to = %email.to_email, "OTP email sent");
        Ok(())
    }
}

/// Mailer that records messages instead of sending them.
#[derive(Clone, Default)]
pub struct MockMailer {
    sent: Arc<Mutex<Vec<OtpEmail>>>,
    fail: Arc<AtomicBool>,
}

impl MockMailer {
    pub fn sent(&self) -> Vec<OtpEmail> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Make every following send fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn send(&self, email: &OtpEmail) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Transport("mock mailer failure".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(email.clone());
        Ok(())
    }
}
