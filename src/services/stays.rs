// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stay registration and the listing read models.

use crate::error::{AppError, Result};
use crate::ids;
use crate::models::stay::STATUS_PENDING;
use crate::models::{Stay, StayRegistration};
use crate::services::images::{resolved_url, ImageHost, ImageUpload, UploadOutcome};
use crate::sheets::SheetsGateway;
use crate::time_utils::format_utc_rfc3339;
use chrono::Utc;
use validator::Validate;

/// Host id recorded when nobody is signed in.
pub const GUEST_HOST_ID: &str = "guest";

/// A newly registered stay and how each of its uploads went.
#[derive(Debug, Clone)]
pub struct RegisteredStay {
    pub id: String,
    pub uploads: Vec<UploadOutcome>,
    pub upi_qr: Option<UploadOutcome>,
}

impl RegisteredStay {
    pub fn failed_uploads(&self) -> usize {
        self.uploads
            .iter()
            .chain(self.upi_qr.iter())
            .filter(|o| o.is_err())
            .count()
    }
}

#[derive(Clone)]
pub struct StayService {
    gateway: SheetsGateway,
    images: ImageHost,
}

impl StayService {
    pub fn new(gateway: SheetsGateway, images: ImageHost) -> Self {
        Self { gateway, images }
    }

    /// Upload the photos and QR code, then append the stay as `pending`.
    pub async fn register_stay(
        &self,
        form: &StayRegistration,
        images: &[ImageUpload],
        upi_qr: Option<&ImageUpload>,
        host_id: Option<&str>,
    ) -> Result<RegisteredStay> {
        form.validate()?;
        let host_id = host_id.unwrap_or(GUEST_HOST_ID);

        let uploads = self.images.upload_all(images, host_id).await;
        let upi_qr = match upi_qr {
            Some(qr) => self
                .images
                .upload_all(std::slice::from_ref(qr), host_id)
                .await
                .into_iter()
                .next(),
            None => None,
        };

        let stay = Stay {
            id: ids::stay_id(),
            stay_name: form.stay_name.clone(),
            stay_type: form.stay_type.clone(),
            description: form.description.clone(),
            location: form.location.clone(),
            activities: form.activities.clone(),
            private_room_price: form.private_room_price,
            private_room_description: form.private_room_description.clone(),
            dorm_price: form.dorm_price,
            dorm_room_description: form.dorm_room_description.clone(),
            meals_included: form.meals_included.clone(),
            check_in_time: form.check_in_time.clone(),
            check_out_time: form.check_out_time.clone(),
            offerings: form.offerings.clone(),
            image_urls: uploads.iter().map(resolved_url).collect(),
            host_id: host_id.to_string(),
            host_name: form.host_name.clone(),
            contact_number: form.contact_number.clone(),
            upi_id: form.upi_id.clone(),
            upi_qr_url: upi_qr.as_ref().map(resolved_url).unwrap_or_default(),
            about_host: form.about_host.clone(),
            status: STATUS_PENDING.to_string(),
            created_at: format_utc_rfc3339(Utc::now()),
        };

        self.gateway.append_record(&stay).await?;
        tracing::info!(stay_id = %stay.id, host_id, "Stay registered");

        Ok(RegisteredStay {
            id: stay.id,
            uploads,
            upi_qr,
        })
    }

    /// Stays whose status is `approved`, ignoring case and surrounding spaces.
    pub async fn get_approved_stays(&self) -> Result<Vec<Stay>> {
        let stays = self.gateway.fetch_records::<Stay>().await?;
        let total = stays.len();
        let approved: Vec<Stay> = stays.into_iter().filter(Stay::is_approved).collect();
        tracing::debug!(total, approved = approved.len(), "Filtered approved stays");
        Ok(approved)
    }

    /// Every stay of `host_id`, whatever its status.
    pub async fn get_host_stays(&self, host_id: &str) -> Result<Vec<Stay>> {
        let stays = self.gateway.fetch_records::<Stay>().await?;
        Ok(stays.into_iter().filter(|s| s.host_id == host_id).collect())
    }

    /// One approved stay by id.
    pub async fn get_approved_stay(&self, stay_id: &str) -> Result<Stay> {
        self.get_approved_stays()
            .await?
            .into_iter()
            .find(|s| s.id == stay_id)
            .ok_or_else(|| AppError::NotFound(format!("stay {}", stay_id)))
    }
}
