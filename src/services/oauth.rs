// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth bearer-token lifecycle.
//!
//! Handles:
//! - Waiting for the identity platform (OpenID discovery) to become reachable
//! - Restoring a persisted token and discarding it once expired
//! - Silent (refresh-token) or interactive (loopback) consent exchanges
//! - Best-effort revocation
//!
//! One token per client instance. There is no refresh-token rotation: an
//! expired token is replaced by running the consent exchange again.

use crate::error::{AppError, Result};
use crate::services::consent::{self, AuthorizationRequest, TokenGrant};
use crate::storage::{keys, ClientStorage};
use crate::time_utils::now_millis;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const DISCOVERY_URL: &str = "https://accounts.google.com/.well-known/openid-configuration";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// How often `initialize` probes the identity platform.
pub const PLATFORM_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long `initialize` waits for the identity platform before giving up.
pub const PLATFORM_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Spreadsheet read/write plus basic profile and email.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// Cached access token with expiry information.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    /// Unix epoch milliseconds
    expires_at: i64,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        now_millis() < self.expires_at
    }
}

enum TokenState {
    Uninitialized,
    Initialized(Option<CachedToken>),
}

/// Observable state of the token manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Uninitialized,
    NoToken,
    Valid,
    Expired,
}

/// Profile returned by the provider's userinfo endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
}

impl GoogleProfile {
    /// Full name, then given name, then "User".
    pub fn display_name(&self) -> String {
        non_blank(&self.name)
            .or_else(|| non_blank(&self.given_name))
            .unwrap_or("User")
            .to_string()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Endpoints advertised by Google's OpenID discovery document.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleEndpoints {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub revocation_endpoint: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Consent providers
// ─────────────────────────────────────────────────────────────────────────────

/// Source of bearer tokens: Google itself, or an offline mock.
#[derive(Clone)]
pub enum ConsentProvider {
    Google(GoogleConsent),
    Mock(MockConsent),
}

/// Google OAuth client for an installed application.
#[derive(Clone)]
pub struct GoogleConsent {
    http: reqwest::Client,
    client_id: String,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    callback_port: u16,
    endpoints: Arc<std::sync::RwLock<Option<GoogleEndpoints>>>,
}

impl GoogleConsent {
    pub fn new(
        client_id: String,
        client_secret: Option<String>,
        refresh_token: Option<String>,
        callback_port: u16,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed building OAuth HTTP client: {e}")))?;

        Ok(Self {
            http,
            client_id,
            client_secret,
            refresh_token,
            callback_port,
            endpoints: Arc::new(std::sync::RwLock::new(None)),
        })
    }

    fn endpoints(&self) -> Result<GoogleEndpoints> {
        self.endpoints
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or(AppError::NotInitialized)
    }

    /// Fetch the discovery document; success means the platform is usable.
    async fn probe(&self) -> bool {
        let response = match self.http.get(DISCOVERY_URL).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!(status = %r.status(), "OpenID discovery not ready");
                return false;
            }
            Err(e) => {
                tracing::debug!(error = %e, "OpenID discovery unreachable");
                return false;
            }
        };

        match response.json::<GoogleEndpoints>().await {
            Ok(endpoints) => {
                *self.endpoints.write().unwrap_or_else(|p| p.into_inner()) = Some(endpoints);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Malformed OpenID discovery document");
                false
            }
        }
    }

    async fn exchange(&self, interactive: bool) -> Result<TokenGrant> {
        let endpoints = self.endpoints()?;

        if let Some(refresh_token) = &self.refresh_token {
            match self.refresh(&endpoints, refresh_token).await {
                Ok(grant) => return Ok(grant),
                Err(e) if interactive => {
                    tracing::warn!(error = %e, "Silent consent failed, falling back to prompt");
                }
                Err(e) => return Err(e),
            }
        }

        if !interactive {
            return Err(AppError::ConsentDenied(
                "interactive consent required".to_string(),
            ));
        }

        let request = AuthorizationRequest {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            authorization_endpoint: endpoints.authorization_endpoint,
            token_endpoint: endpoints.token_endpoint,
            port: self.callback_port,
            scopes: SCOPES,
        };
        consent::authorize(&self.http, &request).await
    }

    /// Refresh-token grant (no user interaction).
    async fn refresh(&self, endpoints: &GoogleEndpoints, refresh_token: &str) -> Result<TokenGrant> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http
            .post(&endpoints.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::ConsentDenied(format!("Token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google token refresh failed");
            return Err(AppError::ConsentDenied(format!(
                "Token refresh failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ConsentDenied(format!("Failed to parse token response: {}", e)))
    }

    async fn revoke(&self, access_token: &str) -> Result<()> {
        let endpoints = self.endpoints()?;
        let response = self
            .http
            .post(&endpoints.revocation_endpoint)
            .form(&[("token", access_token)])
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Revocation request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Transport(format!(
                "Revocation failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile> {
        let endpoints = self.endpoints()?;
        let response = self
            .http
            .get(&endpoints.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Transport(format!(
                "Failed to fetch user information (HTTP {})",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("JSON parse error: {}", e)))
    }
}

/// Offline consent provider that mints numbered tokens.
///
/// Clones share state, so a test can keep a handle and inspect what the
/// token manager did with it.
#[derive(Clone)]
pub struct MockConsent {
    inner: Arc<MockConsentState>,
}

struct MockConsentState {
    issued: AtomicU64,
    lifetime_secs: AtomicI64,
    deny: AtomicBool,
    available: AtomicBool,
    revoked: Mutex<Vec<String>>,
    profile: Mutex<GoogleProfile>,
}

impl Default for MockConsent {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConsent {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockConsentState {
                issued: AtomicU64::new(0),
                lifetime_secs: AtomicI64::new(3600),
                deny: AtomicBool::new(false),
                available: AtomicBool::new(true),
                revoked: Mutex::new(Vec::new()),
                profile: Mutex::new(GoogleProfile::default()),
            }),
        }
    }

    /// Number of consent exchanges performed so far.
    pub fn issued(&self) -> u64 {
        self.inner.issued.load(Ordering::SeqCst)
    }

    pub fn revoked(&self) -> Vec<String> {
        self.inner
            .revoked
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn set_lifetime_secs(&self, secs: i64) {
        self.inner.lifetime_secs.store(secs, Ordering::SeqCst);
    }

    pub fn set_deny(&self, deny: bool) {
        self.inner.deny.store(deny, Ordering::SeqCst);
    }

    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    pub fn set_profile(&self, profile: GoogleProfile) {
        *self.inner.profile.lock().unwrap_or_else(|p| p.into_inner()) = profile;
    }

    fn exchange(&self) -> Result<TokenGrant> {
        if self.inner.deny.load(Ordering::SeqCst) {
            return Err(AppError::ConsentDenied("access_denied".to_string()));
        }
        let n = self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TokenGrant {
            access_token: format!("mock-token-{}", n),
            expires_in: self.inner.lifetime_secs.load(Ordering::SeqCst),
        })
    }

    fn revoke(&self, access_token: &str) {
        self.inner
            .revoked
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(access_token.to_string());
    }

    fn profile(&self) -> GoogleProfile {
        self.inner
            .profile
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl ConsentProvider {
    async fn probe(&self) -> bool {
        match self {
            ConsentProvider::Google(g) => g.probe().await,
            ConsentProvider::Mock(m) => m.inner.available.load(Ordering::SeqCst),
        }
    }

    async fn exchange(&self, interactive: bool) -> Result<TokenGrant> {
        match self {
            ConsentProvider::Google(g) => g.exchange(interactive).await,
            ConsentProvider::Mock(m) => m.exchange(),
        }
    }

    async fn revoke(&self, access_token: &str) -> Result<()> {
        match self {
            ConsentProvider::Google(g) => g.revoke(access_token).await,
            ConsentProvider::Mock(m) => {
                m.revoke(access_token);
                Ok(())
            }
        }
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile> {
        match self {
            ConsentProvider::Google(g) => g.fetch_profile(access_token).await,
            ConsentProvider::Mock(m) => Ok(m.profile()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TokenManager
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the single bearer token of this client instance.
///
/// The token is read optimistically. No lock is held across a consent
/// exchange, so two callers racing on an expired token may both refresh;
/// the last writer wins and both end up holding a valid token.
pub struct TokenManager {
    provider: ConsentProvider,
    storage: ClientStorage,
    state: RwLock<TokenState>,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl TokenManager {
    pub fn new(provider: ConsentProvider, storage: ClientStorage) -> Self {
        Self {
            provider,
            storage,
            state: RwLock::new(TokenState::Uninitialized),
            poll_interval: PLATFORM_POLL_INTERVAL,
            wait_timeout: PLATFORM_WAIT_TIMEOUT,
        }
    }

    /// Create a token manager backed by a mock provider (offline mode).
    pub fn new_mock(storage: ClientStorage) -> (Self, MockConsent) {
        let mock = MockConsent::new();
        (Self::new(ConsentProvider::Mock(mock.clone()), storage), mock)
    }

    /// Override the platform wait used by `initialize`.
    pub fn with_platform_wait(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.wait_timeout = timeout;
        self
    }

    /// Wait for the identity platform, then restore any persisted token.
    ///
    /// Fails with `PlatformUnavailable` after the bounded wait; callers are
    /// expected to continue in a signed-out mode. Calling again after a
    /// successful initialization is a no-op.
    pub async fn initialize(&self) -> Result<()> {
        if matches!(*self.state.read().await, TokenState::Initialized(_)) {
            return Ok(());
        }

        let started = Instant::now();
        loop {
            if self.provider.probe().await {
                break;
            }
            if started.elapsed() >= self.wait_timeout {
                tracing::warn!(
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Identity platform unavailable"
                );
                return Err(AppError::PlatformUnavailable);
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        let restored = self.restore_persisted()?;
        if restored.is_some() {
            tracing::info!("Restored valid OAuth token from storage");
        }

        *self.state.write().await = TokenState::Initialized(restored);
        tracing::debug!("OAuth client initialized");
        Ok(())
    }

    /// Load the persisted token, discarding it when expired or unreadable.
    fn restore_persisted(&self) -> Result<Option<CachedToken>> {
        let (Some(token), Some(expiry)) = (
            self.storage.get(keys::OAUTH_TOKEN),
            self.storage.get(keys::OAUTH_EXPIRES),
        ) else {
            return Ok(None);
        };

        let cached = expiry.trim().parse::<i64>().ok().map(|expires_at| CachedToken {
            access_token: token,
            expires_at,
        });

        match cached {
            Some(c) if c.is_valid() => Ok(Some(c)),
            _ => {
                tracing::info!("Stored token expired, will request new one");
                self.clear_persisted()?;
                Ok(None)
            }
        }
    }

    fn clear_persisted(&self) -> Result<()> {
        self.storage.remove(keys::OAUTH_TOKEN)?;
        self.storage.remove(keys::OAUTH_EXPIRES)
    }

    pub async fn status(&self) -> TokenStatus {
        match &*self.state.read().await {
            TokenState::Uninitialized => TokenStatus::Uninitialized,
            TokenState::Initialized(None) => TokenStatus::NoToken,
            TokenState::Initialized(Some(t)) if t.is_valid() => TokenStatus::Valid,
            TokenState::Initialized(Some(_)) => TokenStatus::Expired,
        }
    }

    pub async fn has_valid_token(&self) -> bool {
        self.status().await == TokenStatus::Valid
    }

    /// Return the cached token if still valid, else run a consent exchange.
    ///
    /// `interactive` allows the exchange to prompt the user. The new token is
    /// persisted with `expires_at = now + lifetime`.
    pub async fn request_token(&self, interactive: bool) -> Result<String> {
        match &*self.state.read().await {
            TokenState::Uninitialized => return Err(AppError::NotInitialized),
            TokenState::Initialized(Some(t)) if t.is_valid() => {
                return Ok(t.access_token.clone());
            }
            TokenState::Initialized(_) => {}
        }

        tracing::info!(interactive, "Requesting new OAuth token");
        let grant = self.provider.exchange(interactive).await?;

        let cached = CachedToken {
            access_token: grant.access_token,
            expires_at: now_millis() + grant.expires_in * 1000,
        };

        self.storage.set(keys::OAUTH_TOKEN, cached.access_token.clone())?;
        self.storage
            .set(keys::OAUTH_EXPIRES, cached.expires_at.to_string())?;

        let token = cached.access_token.clone();
        *self.state.write().await = TokenState::Initialized(Some(cached));

        tracing::info!("OAuth token received");
        Ok(token)
    }

    /// Cached valid token, or a fresh one (prompting if necessary).
    pub async fn get_token(&self) -> Result<String> {
        self.request_token(true).await
    }

    /// Revoke the token remotely (best effort) and forget it locally.
    pub async fn revoke(&self) -> Result<()> {
        let token = {
            let mut state = self.state.write().await;
            match &mut *state {
                TokenState::Initialized(cached) => cached.take(),
                TokenState::Uninitialized => None,
            }
        };

        if let Some(token) = token {
            match self.provider.revoke(&token.access_token).await {
                Ok(()) => tracing::info!("OAuth token revoked"),
                Err(e) => tracing::warn!(error = %e, "Token revocation failed, clearing locally"),
            }
        }

        self.clear_persisted()
    }

    /// Profile of the account behind the current token.
    pub async fn fetch_profile(&self) -> Result<GoogleProfile> {
        let token = self.get_token().await?;
        self.provider.fetch_profile(&token).await
    }
}
