// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client configuration loaded from environment variables.
//!
//! Optional integrations (image host, mailer, payment oracle) degrade
//! gracefully when their keys are absent.

use std::env;
use std::path::PathBuf;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Spreadsheet store ---
    /// Spreadsheet holding the Users, Stays and Bookings tabs
    pub spreadsheet_id: String,

    // --- Google OAuth ---
    /// OAuth client ID (public)
    pub google_client_id: String,
    /// OAuth client secret (installed-app clients still send one)
    pub google_client_secret: Option<String>,
    /// Long-lived refresh token enabling silent consent
    pub google_refresh_token: Option<String>,
    /// Port of the loopback listener receiving the authorization code
    pub oauth_callback_port: u16,

    // --- Integrations ---
    /// ImgBB API key
    pub imgbb_api_key: Option<String>,
    /// Gemini API key for payment screenshot judgement
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// EmailJS identifiers for OTP delivery
    pub emailjs: Option<EmailJsConfig>,

    // --- Local state ---
    /// JSON file backing persisted client state
    pub state_path: PathBuf,
    /// Use in-memory and mock backends instead of remote services
    pub offline: bool,
}

/// EmailJS REST API identifiers.
#[derive(Debug, Clone)]
pub struct EmailJsConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            spreadsheet_id: "test-spreadsheet".to_string(),
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            google_client_secret: None,
            google_refresh_token: None,
            oauth_callback_port: 8085,
            imgbb_api_key: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            emailjs: None,
            state_path: env::temp_dir().join("nomadic-test-state.json"),
            offline: true,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honoured for local use.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let offline = env::var("NOMADIC_OFFLINE")
            .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);

        let spreadsheet_id = match env::var("SPREADSHEET_ID") {
            Ok(v) => v.trim().to_string(),
            Err(_) if offline => "offline".to_string(),
            Err(_) => return Err(ConfigError::Missing("SPREADSHEET_ID")),
        };

        let google_client_id = match env::var("GOOGLE_CLIENT_ID") {
            Ok(v) => v.trim().to_string(),
            Err(_) if offline => "offline".to_string(),
            Err(_) => return Err(ConfigError::Missing("GOOGLE_CLIENT_ID")),
        };

        let emailjs = match (
            optional("EMAILJS_SERVICE_ID"),
            optional("EMAILJS_TEMPLATE_ID"),
            optional("EMAILJS_PUBLIC_KEY"),
        ) {
            (Some(service_id), Some(template_id), Some(public_key)) => Some(EmailJsConfig {
                service_id,
                template_id,
                public_key,
            }),
            _ => None,
        };

        let state_path = match optional("NOMADIC_STATE_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_state_path()?,
        };

        Ok(Self {
            spreadsheet_id,
            google_client_id,
            google_client_secret: optional("GOOGLE_CLIENT_SECRET"),
            google_refresh_token: optional("GOOGLE_REFRESH_TOKEN"),
            oauth_callback_port: env::var("OAUTH_CALLBACK_PORT")
                .unwrap_or_else(|_| "8085".to_string())
                .parse()
                .unwrap_or(8085),
            imgbb_api_key: optional("IMGBB_API_KEY"),
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_model: optional("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            emailjs,
            state_path,
            offline,
        })
    }
}

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Read an env var, treating blank values as unset.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_state_path() -> Result<PathBuf, ConfigError> {
    directories::ProjectDirs::from("travel", "nomadic", "nomadic-stays")
        .map(|dirs| dirs.data_dir().join("state.json"))
        .ok_or(ConfigError::NoDataDir)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Could not determine a data directory; set NOMADIC_STATE_PATH")]
    NoDataDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("SPREADSHEET_ID", "sheet_123");
        env::set_var("GOOGLE_CLIENT_ID", "client.apps.googleusercontent.com");
        env::set_var("NOMADIC_STATE_PATH", "/tmp/nomadic-config-test.json");
        env::set_var("GEMINI_API_KEY", "   ");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.spreadsheet_id, "sheet_123");
        assert_eq!(config.google_client_id, "client.apps.googleusercontent.com");
        assert_eq!(config.oauth_callback_port, 8085);
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert!(config.gemini_api_key.is_none(), "blank keys count as unset");
        assert_eq!(
            config.state_path,
            PathBuf::from("/tmp/nomadic-config-test.json")
        );
    }
}
