// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment screenshot verification and booking confirmation.

use crate::error::Result;
use crate::ids;
use crate::models::{Booking, BookingRequest};
use crate::services::oracle::PaymentOracle;
use crate::sheets::SheetsGateway;
use crate::time_utils::format_utc_rfc3339;
use chrono::Utc;
use serde::Serialize;

/// Outcome shown to the guest after uploading a screenshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    pub message: String,
}

#[derive(Clone)]
pub struct PaymentService {
    gateway: SheetsGateway,
    oracle: PaymentOracle,
}

impl PaymentService {
    pub fn new(gateway: SheetsGateway, oracle: PaymentOracle) -> Self {
        Self { gateway, oracle }
    }

    /// Ask the oracle about the screenshot; on a pass, append a confirmed booking.
    ///
    /// A failed match writes nothing.
    pub async fn verify_payment_screenshot(
        &self,
        image_base64: &str,
        expected_host: &str,
        request: &BookingRequest,
    ) -> Result<PaymentVerification> {
        tracing::info!(stay_id = %request.stay_id, expected_host, "Verifying payment screenshot");

        let verdict = self.oracle.judge(image_base64, expected_host).await?;

        if !verdict.verified {
            tracing::info!(answer = %verdict.raw, "Payment verification failed: recipient mismatch");
            return Ok(PaymentVerification {
                verified: false,
                booking_id: None,
                message: "Recipient name does not match".to_string(),
            });
        }

        let booking = Booking::confirmed(
            ids::booking_id(),
            request,
            expected_host,
            format_utc_rfc3339(Utc::now()),
        );
        self.gateway.append_record(&booking).await?;
        tracing::info!(booking_id = %booking.booking_id, "Payment verified and booking saved");

        Ok(PaymentVerification {
            verified: true,
            booking_id: Some(booking.booking_id),
            message: "Payment verified successfully".to_string(),
        })
    }
}
