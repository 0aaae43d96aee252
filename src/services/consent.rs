// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Interactive OAuth consent over a loopback redirect.
//!
//! The only place where the user may be prompted. Uses the authorization
//! code flow with PKCE: the browser is sent to Google's consent page and the
//! code comes back to a short-lived axum listener on 127.0.0.1.

use crate::error::{AppError, Result};
use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subtle::ConstantTimeEq;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

/// How long to wait for the user to finish the consent page.
const CONSENT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Everything needed to run one authorization-code exchange.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub port: u16,
    pub scopes: &'static [&'static str],
}

/// Token endpoint response (refresh tokens are deliberately ignored).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let verifier = random_token(64);
        let challenge = Self::challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    /// BASE64URL(SHA256(verifier)) without padding.
    pub fn challenge_for(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Build the consent page URL.
///
/// No `prompt` parameter is sent, which leaves the choice between a silent
/// grant and an account chooser to Google's own session policy.
pub fn consent_url(
    request: &AuthorizationRequest,
    redirect_uri: &str,
    state: &str,
    code_challenge: &str,
) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&code_challenge={}&code_challenge_method=S256",
        request.authorization_endpoint,
        urlencoding::encode(&request.client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&request.scopes.join(" ")),
        state,
        code_challenge,
    )
}

/// Outcome delivered by the callback handler.
pub type CallbackResult = Result<String>;

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<String>,
    tx: Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>,
}

impl CallbackState {
    fn deliver(&self, outcome: CallbackResult) {
        if let Some(tx) = self.tx.lock().unwrap_or_else(|p| p.into_inner()).take() {
            let _ = tx.send(outcome);
        }
    }
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Router for the loopback listener.
///
/// The first callback carrying the expected `state` resolves `tx`; callbacks
/// with a foreign `state` are rejected and leave the flow waiting.
pub fn callback_router(expected_state: String, tx: oneshot::Sender<CallbackResult>) -> Router {
    let state = CallbackState {
        expected_state: Arc::new(expected_state),
        tx: Arc::new(Mutex::new(Some(tx))),
    };

    Router::new()
        .route("/callback", get(handle_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<&'static str>> {
    let state_matches = params
        .state
        .as_deref()
        .map(|s| bool::from(s.as_bytes().ct_eq(state.expected_state.as_bytes())))
        .unwrap_or(false);

    if !state_matches {
        tracing::warn!("OAuth callback with unexpected state parameter");
        return Err(AppError::BadRequest("Invalid state parameter".to_string()));
    }

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        state.deliver(Err(AppError::ConsentDenied(error.clone())));
        return Err(AppError::ConsentDenied(error));
    }

    match params.code {
        Some(code) if !code.is_empty() => {
            state.deliver(Ok(code));
            Ok(Html(
                "<html><body><p>Signed in. You can close this window.</p></body></html>",
            ))
        }
        _ => Err(AppError::BadRequest("Missing authorization code".to_string())),
    }
}

/// Run the full interactive flow and exchange the code for a token.
pub async fn authorize(http: &reqwest::Client, request: &AuthorizationRequest) -> Result<TokenGrant> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", request.port))
        .await
        .map_err(|e| {
            AppError::ConsentDenied(format!(
                "Cannot listen on 127.0.0.1:{}: {}",
                request.port, e
            ))
        })?;

    let redirect_uri = format!("http://127.0.0.1:{}/callback", request.port);
    let pkce = Pkce::generate();
    let oauth_state = random_token(32);
    let url = consent_url(request, &redirect_uri, &oauth_state, &pkce.challenge);

    tracing::info!(url = %url, "Waiting for Google consent in the browser");
    if let Err(e) = open::that(&url) {
        tracing::warn!(error = %e, "Could not open a browser; visit the URL manually");
    }

    let (tx, rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = callback_router(oauth_state, tx);

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
    });

    let outcome = tokio::time::timeout(CONSENT_TIMEOUT, rx).await;

    let _ = shutdown_tx.send(());
    if let Ok(Err(e)) = server.await {
        tracing::debug!(error = %e, "Loopback listener exited with error");
    }

    let code = match outcome {
        Err(_) => return Err(AppError::ConsentDenied("Consent timed out".to_string())),
        Ok(Err(_)) => {
            return Err(AppError::ConsentDenied(
                "Consent listener closed".to_string(),
            ))
        }
        Ok(Ok(result)) => result?,
    };

    exchange_code(http, request, &code, &pkce.verifier, &redirect_uri).await
}

/// Exchange an authorization code for tokens.
async fn exchange_code(
    http: &reqwest::Client,
    request: &AuthorizationRequest,
    code: &str,
    code_verifier: &str,
    redirect_uri: &str,
) -> Result<TokenGrant> {
    let mut form = vec![
        ("client_id", request.client_id.as_str()),
        ("code", code),
        ("code_verifier", code_verifier),
        ("grant_type", "authorization_code"),
        ("redirect_uri", redirect_uri),
    ];
    if let Some(secret) = &request.client_secret {
        form.push(("client_secret", secret.as_str()));
    }

    let response = http
        .post(&request.token_endpoint)
        .form(&form)
        .send()
        .await
        .map_err(|e| AppError::ConsentDenied(format!("Token exchange failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "Google token exchange failed");
        return Err(AppError::ConsentDenied(format!(
            "Token exchange failed with status {}",
            status
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::ConsentDenied(format!("Failed to parse token response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkce_challenge_matches_rfc7636_example() {
        assert_eq!(
            Pkce::challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_consent_url_has_no_prompt() {
        let request = AuthorizationRequest {
            client_id: "abc.apps.googleusercontent.com".to_string(),
            client_secret: None,
            authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            port: 8085,
            scopes: crate::services::oauth::SCOPES,
        };
        let url = consent_url(&request, "http://127.0.0.1:8085/callback", "st", "ch");

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8085%2Fcallback"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("auth%2Fspreadsheets"));
        assert!(!url.contains("prompt="));
    }
}
