// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-time passcodes proving control of an email address.
//!
//! At most one live challenge per email, kept in client storage under
//! `nomadic_otp_<email>`. Issuing a new code overwrites the old one.

use crate::error::{OtpRejection, Result};
use crate::services::mailer::{Mailer, OtpEmail};
use crate::storage::{keys, ClientStorage};
use crate::time_utils::{expiry_label, now_millis};
use rand::Rng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Challenge lifetime in milliseconds (5 minutes).
pub const OTP_TTL_MS: i64 = 5 * 60 * 1000;
/// Wrong guesses allowed before the challenge is destroyed.
pub const MAX_ATTEMPTS: u32 = 5;

/// Stored challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpChallenge {
    pub code: String,
    pub email: String,
    /// Unix epoch milliseconds
    pub expires_at: i64,
    pub attempts: u32,
}

/// How the code reached (or failed to reach) the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpDelivery {
    Sent,
    /// Delivery failed; the challenge is still live and the code is handed
    /// back so the caller can surface it some other way.
    Failed { code: String, reason: String },
}

/// Result of issuing a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpDispatch {
    pub email: String,
    pub expires_at: i64,
    pub delivery: OtpDelivery,
}

#[derive(Clone)]
pub struct OtpService {
    storage: ClientStorage,
    mailer: Mailer,
}

impl OtpService {
    pub fn new(storage: ClientStorage, mailer: Mailer) -> Self {
        Self { storage, mailer }
    }

    /// Uniformly random six-digit code.
    pub fn generate() -> String {
        rand::thread_rng().gen_range(100_000..=999_999).to_string()
    }

    /// Issue a fresh challenge for `email` and try to deliver it.
    ///
    /// Only a storage failure is an error; a delivery failure is reported
    /// through [`OtpDelivery::Failed`].
    pub async fn send(&self, email: &str) -> Result<OtpDispatch> {
        let challenge = OtpChallenge {
            code: Self::generate(),
            email: email.to_string(),
            expires_at: now_millis() + OTP_TTL_MS,
            attempts: 0,
        };
        self.storage.set_json(&keys::otp(email), &challenge)?;
        tracing::info!(email = %email, "OTP challenge issued");
        tracing::debug!(email = %email, code = %challenge.code, "OTP code");

        let message = OtpEmail {
            to_email: email.to_string(),
            otp_code: challenge.code.clone(),
            expiry_time: expiry_label(challenge.expires_at),
        };

        let delivery = match self.mailer.send_otp(&message).await {
            Ok(()) => OtpDelivery::Sent,
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "OTP delivery failed");
                OtpDelivery::Failed {
                    code: challenge.code,
                    reason: e.to_string(),
                }
            }
        };

        Ok(OtpDispatch {
            email: email.to_string(),
            expires_at: challenge.expires_at,
            delivery,
        })
    }

    /// Check `code` against the live challenge for `email`.
    ///
    /// Succeeds at most once per challenge. Expiry is checked before the
    /// attempt limit, and both destroy the challenge.
    pub async fn verify(&self, email: &str, code: &str) -> Result<()> {
        let key = keys::otp(email);

        let Some(mut challenge) = self.load(&key)? else {
            tracing::debug!(email = %email, "No OTP challenge found");
            return Err(OtpRejection::NotFound.into());
        };

        if now_millis() > challenge.expires_at {
            self.storage.remove(&key)?;
            tracing::info!(email = %email, "OTP expired");
            return Err(OtpRejection::Expired.into());
        }

        if challenge.attempts >= MAX_ATTEMPTS {
            self.storage.remove(&key)?;
            tracing::warn!(email = %email, "OTP attempt limit reached");
            return Err(OtpRejection::TooManyAttempts.into());
        }

        if bool::from(code.as_bytes().ct_eq(challenge.code.as_bytes())) {
            self.storage.remove(&key)?;
            tracing::info!(email = %email, "OTP verified");
            return Ok(());
        }

        challenge.attempts += 1;
        self.storage.set_json(&key, &challenge)?;
        let remaining = MAX_ATTEMPTS.saturating_sub(challenge.attempts);
        tracing::info!(email = %email, remaining, "Invalid OTP code");
        Err(OtpRejection::Mismatch { remaining }.into())
    }

    /// Drop any challenge for `email`.
    pub fn clear(&self, email: &str) -> Result<()> {
        self.storage.remove(&keys::otp(email))
    }

    /// Stored challenge; an undecodable entry is removed and reads as absent.
    fn load(&self, key: &str) -> Result<Option<OtpChallenge>> {
        if !self.storage.contains(key) {
            return Ok(None);
        }
        match self.storage.get_json::<OtpChallenge>(key) {
            Some(challenge) => Ok(Some(challenge)),
            None => {
                self.storage.remove(key)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_six_digits() {
        for _ in 0..200 {
            let code = OtpService::generate();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn test_challenge_wire_format() {
        let challenge = OtpChallenge {
            code: "123456".to_string(),
            email: "a@x.com".to_string(),
            expires_at: 42,
            attempts: 1,
        };
        let json = serde_json::to_value(&challenge).unwrap();
        assert_eq!(json["expiresAt"], 42);
        assert_eq!(json["attempts"], 1);
    }

    #[tokio::test]
    async fn test_corrupt_challenge_reads_as_not_found() {
        let storage = ClientStorage::new_mock();
        let (mailer, _) = Mailer::new_mock();
        let otp = OtpService::new(storage.clone(), mailer);

        storage.set(&keys::otp("a@x.com"), "{broken").unwrap();
        let err = otp.verify("a@x.com", "123456").await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::Otp(OtpRejection::NotFound)));
        assert!(!storage.contains(&keys::otp("a@x.com")));
    }
}
