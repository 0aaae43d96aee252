// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Nomadic Stays: spreadsheet-backed accounts, stays and bookings
//!
//! This crate provides the client-side persistence and auth layer of the
//! Nomadic Stays booking site: a Google Sheets gateway, the OAuth token
//! lifecycle, email OTP checks, sessions, and the stay/booking row mappers.

pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod services;
pub mod sheets;
pub mod storage;
pub mod time_utils;

use config::Config;
use error::{AppError, Result};
use services::images::MockImageHost;
use services::mailer::MockMailer;
use services::oauth::MockConsent;
use services::oracle::MockOracle;
use services::{
    AuthService, ConsentProvider, GoogleConsent, ImageHost, Mailer, OtpService, PaymentOracle,
    PaymentService, StayService, TokenManager,
};
use sheets::SheetsGateway;
use std::sync::Arc;
use storage::ClientStorage;

/// Everything one client instance needs, wired together once.
pub struct AppContext {
    pub config: Config,
    pub storage: ClientStorage,
    pub tokens: Arc<TokenManager>,
    pub gateway: SheetsGateway,
    pub otp: OtpService,
    pub auth: AuthService,
    pub stays: StayService,
    pub payments: PaymentService,
}

/// Handles onto the fakes behind an offline context.
pub struct OfflineHandles {
    pub consent: MockConsent,
    pub mailer: MockMailer,
    pub images: MockImageHost,
    pub oracle: MockOracle,
}

impl AppContext {
    /// Build a context talking to Google, ImgBB, EmailJS and Gemini.
    ///
    /// An unreachable identity platform is not fatal: the context comes up
    /// signed out and token requests fail until a later `initialize`.
    pub async fn init(config: Config) -> Result<Self> {
        if config.offline {
            let (ctx, handles) = Self::offline(config).await?;
            // No mailbox offline: codes come back through OtpDelivery::Failed.
            handles.mailer.set_fail(true);
            return Ok(ctx);
        }

        let storage = ClientStorage::open(&config.state_path)?;

        let provider = ConsentProvider::Google(GoogleConsent::new(
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
            config.google_refresh_token.clone(),
            config.oauth_callback_port,
        )?);
        let tokens = Arc::new(TokenManager::new(provider, storage.clone()));

        match tokens.initialize().await {
            Ok(()) => {}
            Err(AppError::PlatformUnavailable) => {
                tracing::warn!("Continuing without Google sign-in");
            }
            Err(e) => return Err(e),
        }

        let gateway = SheetsGateway::new(&config.spreadsheet_id, tokens.clone());
        let mailer = Mailer::from_config(config.emailjs.as_ref());
        let images = ImageHost::from_api_key(config.imgbb_api_key.as_deref());
        let oracle = PaymentOracle::from_config(config.gemini_api_key.as_deref(), &config.gemini_model);

        tracing::info!(spreadsheet = %config.spreadsheet_id, "Client context ready");
        Ok(Self::assemble(config, storage, tokens, gateway, mailer, images, oracle))
    }

    /// Build a context on in-memory storage, an in-memory spreadsheet and
    /// mock integrations (offline mode).
    pub async fn offline(config: Config) -> Result<(Self, OfflineHandles)> {
        let storage = ClientStorage::new_mock();

        let (tokens, consent) = TokenManager::new_mock(storage.clone());
        let tokens = Arc::new(tokens);
        tokens.initialize().await?;

        let gateway = SheetsGateway::new_mock(tokens.clone());
        let (mailer, mail_handle) = Mailer::new_mock();
        let (images, image_handle) = ImageHost::new_mock();
        let (oracle, oracle_handle) = PaymentOracle::new_mock();

        tracing::info!("Offline client context ready");
        let ctx = Self::assemble(config, storage, tokens, gateway, mailer, images, oracle);
        let handles = OfflineHandles {
            consent,
            mailer: mail_handle,
            images: image_handle,
            oracle: oracle_handle,
        };
        Ok((ctx, handles))
    }

    fn assemble(
        config: Config,
        storage: ClientStorage,
        tokens: Arc<TokenManager>,
        gateway: SheetsGateway,
        mailer: Mailer,
        images: ImageHost,
        oracle: PaymentOracle,
    ) -> Self {
        let otp = OtpService::new(storage.clone(), mailer);
        let auth = AuthService::new(gateway.clone(), tokens.clone(), otp.clone(), storage.clone());
        let stays = StayService::new(gateway.clone(), images);
        let payments = PaymentService::new(gateway.clone(), oracle);

        Self {
            config,
            storage,
            tokens,
            gateway,
            otp,
            auth,
            stays,
            payments,
        }
    }

    /// Flush client state to disk.
    pub fn shutdown(self) -> Result<()> {
        self.storage.flush()?;
        tracing::debug!("Client context shut down");
        Ok(())
    }
}
