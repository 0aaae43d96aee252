// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image hosting for stay photos and UPI QR codes (ImgBB).
//!
//! A failed upload never aborts the batch: each image yields its own
//! [`UploadOutcome`], and failures resolve to a placeholder URL.

use crate::error::{AppError, Result};
use crate::time_utils::now_millis;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

const IMGBB_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";
const PLACEHOLDER_BASE: &str = "https://via.placeholder.com/800x600?text=";

/// An image file to upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::BadRequest(format!("Cannot read image {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self { file_name, bytes })
    }
}

/// Why one image did not get a hosted URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadFailed {
    /// The host answered but reported failure.
    #[error("image host rejected {file_name}")]
    Rejected { file_name: String },

    /// The request itself failed.
    #[error("image upload of {file_name} failed: {reason}")]
    Transport { file_name: String, reason: String },
}

impl UploadFailed {
    /// URL stored in place of the missing image.
    pub fn placeholder_url(&self) -> String {
        match self {
            UploadFailed::Rejected { file_name } => {
                format!("{}{}", PLACEHOLDER_BASE, urlencoding::encode(file_name))
            }
            UploadFailed::Transport { .. } => format!("{}Upload+Failed", PLACEHOLDER_BASE),
        }
    }
}

/// Hosted URL, or why there is none.
pub type UploadOutcome = std::result::Result<String, UploadFailed>;

/// Hosted URL, or the placeholder for a failed upload.
pub fn resolved_url(outcome: &UploadOutcome) -> String {
    match outcome {
        Ok(url) => url.clone(),
        Err(failed) => failed.placeholder_url(),
    }
}

/// Image hosting backend.
#[derive(Clone)]
pub enum ImageHost {
    ImgBb(ImgBbClient),
    Mock(MockImageHost),
    /// No API key configured; every upload fails.
    Disabled,
}

impl ImageHost {
    pub fn from_api_key(api_key: Option<&str>) -> Self {
        match api_key {
            Some(key) => ImageHost::ImgBb(ImgBbClient::new(key.to_string())),
            None => ImageHost::Disabled,
        }
    }

    /// Create a fake image host for testing (offline mode).
    pub fn new_mock() -> (Self, MockImageHost) {
        let mock = MockImageHost::default();
        (ImageHost::Mock(mock.clone()), mock)
    }

    /// Upload `images` one after another, named `<owner>_<ms>_<index>`.
    pub async fn upload_all(&self, images: &[ImageUpload], owner: &str) -> Vec<UploadOutcome> {
        tracing::info!(count = images.len(), owner, "Uploading images");

        stream::iter(images.iter().enumerate())
            .then(|(index, image)| async move {
                let name = format!("{}_{}_{}", owner, now_millis(), index);
                let outcome = self.upload(image, &name).await;
                match &outcome {
                    Ok(url) => tracing::debug!(index, url = %url, "Image uploaded"),
                    Err(e) => tracing::warn!(index, error = %e, "Image upload failed, using placeholder"),
                }
                outcome
            })
            .collect::<Vec<_>>()
            .await
    }

    async fn upload(&self, image: &ImageUpload, name: &str) -> UploadOutcome {
        match self {
            ImageHost::ImgBb(client) => client.upload(image, name).await,
            ImageHost::Mock(mock) => mock.upload(image, name),
            ImageHost::Disabled => Err(UploadFailed::Transport {
                file_name: image.file_name.clone(),
                reason: "image host is not configured".to_string(),
            }),
        }
    }
}

/// ImgBB client.
#[derive(Clone)]
pub struct ImgBbClient {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Deserialize)]
struct ImgBbResponse {
    #[serde(default)]
    success: bool,
    data: Option<ImgBbData>,
}

#[derive(Deserialize)]
struct ImgBbData {
    url: String,
}

impl ImgBbClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    async fn upload(&self, image: &ImageUpload, name: &str) -> UploadOutcome {
        let transport = |reason: String| UploadFailed::Transport {
            file_name: image.file_name.clone(),
            reason,
        };

        let form = reqwest::multipart::Form::new()
            .text("image", STANDARD.encode(&image.bytes))
            .text("name", name.to_string());

        let response = self
            .http
            .post(IMGBB_UPLOAD_URL)
            .query(&[("key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let body: ImgBbResponse = response
            .json()
            .await
            .map_err(|e| transport(format!("JSON parse error: {}", e)))?;

        match body.data {
            Some(data) if body.success => Ok(data.url),
            _ => Err(UploadFailed::Rejected {
                file_name: image.file_name.clone(),
            }),
        }
    }
}

/// Image host that hands out fake URLs and can be told to fail.
#[derive(Clone, Default)]
pub struct MockImageHost {
    uploaded: Arc<Mutex<Vec<String>>>,
    rejected: Arc<Mutex<HashSet<String>>>,
    unreachable: Arc<Mutex<HashSet<String>>>,
}

impl MockImageHost {
    /// Upload names seen so far, in order.
    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Report failure for files with this name.
    pub fn reject(&self, file_name: &str) {
        self.rejected
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(file_name.to_string());
    }

    /// Fail the request for files with this name.
    pub fn drop_connection(&self, file_name: &str) {
        self.unreachable
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(file_name.to_string());
    }

    fn upload(&self, image: &ImageUpload, name: &str) -> UploadOutcome {
        self.uploaded
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(name.to_string());

        if self
            .unreachable
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&image.file_name)
        {
            return Err(UploadFailed::Transport {
                file_name: image.file_name.clone(),
                reason: "connection reset".to_string(),
            });
        }
        if self
            .rejected
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&image.file_name)
        {
            return Err(UploadFailed::Rejected {
                file_name: image.file_name.clone(),
            });
        }
        Ok(format!("https://i.ibb.co/mock/{}.png", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> ImageUpload {
        ImageUpload {
            file_name: name.to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_every_slot() {
        let (host, mock) = ImageHost::new_mock();
        mock.reject("room 2.jpg");
        mock.drop_connection("qr.png");

        let outcomes = host
            .upload_all(&[image("room1.jpg"), image("room 2.jpg"), image("qr.png")], "guest")
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].as_ref().unwrap().starts_with("https://i.ibb.co/mock/guest_"));
        assert_eq!(
            resolved_url(&outcomes[1]),
            "https://via.placeholder.com/800x600?text=room%202.jpg"
        );
        assert_eq!(
            resolved_url(&outcomes[2]),
            "https://via.placeholder.com/800x600?text=Upload+Failed"
        );

        let names = mock.uploaded();
        assert!(names[0].ends_with("_0"));
        assert!(names[2].ends_with("_2"));
    }

    #[tokio::test]
    async fn test_disabled_host_degrades_to_placeholder() {
        let outcomes = ImageHost::Disabled.upload_all(&[image("a.jpg")], "host").await;
        assert_eq!(
            resolved_url(&outcomes[0]),
            "https://via.placeholder.com/800x600?text=Upload+Failed"
        );
    }
}
