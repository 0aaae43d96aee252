// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment screenshot judgement by a vision model (Gemini).
//!
//! The model is asked whether the recipient in the screenshot is the
//! expected host and must answer with a bare "true" or "false". Anything
//! else counts as "false".

use crate::error::{AppError, Result};
use serde::Deserialize;
use std::sync::{Arc, Mutex};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Judgement on one screenshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleVerdict {
    pub verified: bool,
    /// Text exactly as the model returned it
    pub raw: String,
}

impl OracleVerdict {
    /// Only a "true" answer (ignoring case and surrounding whitespace) passes.
    pub fn from_text(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            verified: raw.trim().to_lowercase() == "true",
            raw,
        }
    }
}

/// Prompt asking for a strict recipient-name match.
pub fn verification_prompt(expected_host: &str) -> String {
    format!(
        r#"You are a STRICT payment verification system. Your job is to verify if the payment was made to the correct person.

TASK: Find the RECIPIENT name in this payment screenshot and check if it EXACTLY matches: "{host}"

STRICT RULES:
1. Find the recipient/beneficiary name (labels: "To:", "Paid to:", "Beneficiary:", "Recipient:", "Account Name:")
2. The recipient name must be AT THE TOP of the screenshot
3. Compare ONLY the recipient name with "{host}"
4. The names must match EXACTLY (ignore case and extra spaces only)
5. If the names are DIFFERENT people, return "false"
6. Only return "true" if you are 100% certain it's the same person

EXAMPLES OF DIFFERENT NAMES (return false):
- "Mohanlal Roat" vs "RATUL TARAFDER" = FALSE (completely different people)
- "John Smith" vs "RATUL TARAFDER" = FALSE (completely different people)
- "Amit Kumar" vs "RATUL TARAFDER" = FALSE (completely different people)

EXAMPLES OF SAME NAME (return true):
- "RATUL TARAFDER" vs "RATUL TARAFDER" = TRUE
- "Ratul Tarafder" vs "RATUL TARAFDER" = TRUE (case doesn't matter)
- "ratul  tarafder" vs "RATUL TARAFDER" = TRUE (extra spaces ok)

CRITICAL: If you cannot clearly read the recipient name or if it's a different person, return "false"

Response: Return ONLY the word "true" or "false" with no other text."#,
        host = expected_host
    )
}

/// Payment verification backend.
#[derive(Clone)]
pub enum PaymentOracle {
    Gemini(GeminiClient),
    Mock(MockOracle),
    /// No API key configured; every judgement fails.
    Disabled,
}

impl PaymentOracle {
    pub fn from_config(api_key: Option<&str>, model: &str) -> Self {
        match api_key {
            Some(key) => PaymentOracle::Gemini(GeminiClient::new(key.to_string(), model.to_string())),
            None => PaymentOracle::Disabled,
        }
    }

    /// Create a scripted oracle for testing (offline mode).
    pub fn new_mock() -> (Self, MockOracle) {
        let mock = MockOracle::default();
        (PaymentOracle::Mock(mock.clone()), mock)
    }

    /// Judge whether the screenshot shows a payment to `expected_host`.
    pub async fn judge(&self, image_base64: &str, expected_host: &str) -> Result<OracleVerdict> {
        let raw = match self {
            PaymentOracle::Gemini(client) => client.generate(image_base64, expected_host).await?,
            PaymentOracle::Mock(mock) => mock.answer(expected_host),
            PaymentOracle::Disabled => {
                return Err(AppError::Transport(
                    "Payment verification is not configured".to_string(),
                ))
            }
        };
        Ok(OracleVerdict::from_text(raw))
    }
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// First text part of the first candidate, or "" when there is none.
    async fn generate(&self, image_base64: &str, expected_host: &str) -> Result<String> {
        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);
        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": verification_prompt(expected_host) },
                    { "inline_data": { "mime_type": "image/png", "data": image_base64 } }
                ]
            }]
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %text, "Gemini API error");
            return Err(AppError::Transport(format!("Gemini API error: {}", status)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("JSON parse error: {}", e)))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default();

        tracing::debug!(expected_host, answer = %text, "Gemini judgement");
        Ok(text)
    }
}

/// Oracle that returns a scripted answer.
#[derive(Clone)]
pub struct MockOracle {
    reply: Arc<Mutex<String>>,
    asked: Arc<Mutex<Vec<String>>>,
}

impl Default for MockOracle {
    fn default() -> Self {
        Self {
            reply: Arc::new(Mutex::new("false".to_string())),
            asked: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockOracle {
    /// Text returned by every following judgement.
    pub fn set_reply(&self, reply: &str) {
        *self.reply.lock().unwrap_or_else(|p| p.into_inner()) = reply.to_string();
    }

    /// Expected host names asked about so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn answer(&self, expected_host: &str) -> String {
        self.asked
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(expected_host.to_string());
        self.reply.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_fails_closed() {
        assert!(OracleVerdict::from_text("true").verified);
        assert!(OracleVerdict::from_text(" TRUE\n").verified);
        assert!(!OracleVerdict::from_text("false").verified);
        assert!(!OracleVerdict::from_text("true.").verified);
        assert!(!OracleVerdict::from_text("I think true").verified);
        assert!(!OracleVerdict::from_text("").verified);
    }

    #[test]
    fn test_prompt_names_expected_host() {
        let prompt = verification_prompt("Ratul Tarafder");
        assert!(prompt.contains("EXACTLY matches: \"Ratul Tarafder\""));
        assert!(prompt.ends_with("with no other text."));
    }

    #[test]
    fn test_prompt_carries_name_examples() {
        let prompt = verification_prompt("Asha Rao");
        let different = prompt.find("EXAMPLES OF DIFFERENT NAMES (return false):").unwrap();
        let same = prompt.find("EXAMPLES OF SAME NAME (return true):").unwrap();
        let critical = prompt.find("CRITICAL:").unwrap();
        assert!(different < same && same < critical);
        assert!(prompt.contains("\"ratul  tarafder\" vs \"RATUL TARAFDER\" = TRUE (extra spaces ok)"));
    }
}
