// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bookings, booking requests and price quotes.

use crate::error::{AppError, Result};
use crate::models::Stay;
use crate::sheets::{parse_price, tables, Record, SheetRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Status of a booking whose payment was verified.
pub const STATUS_CONFIRMED: &str = "confirmed";
/// Verification result recorded alongside confirmed bookings.
pub const VERIFICATION_VERIFIED: &str = "verified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Private,
    Dorm,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Private => "private",
            RoomType::Dorm => "dorm",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "private" => Ok(RoomType::Private),
            "dorm" => Ok(RoomType::Dorm),
            other => Err(AppError::BadRequest(format!("Unknown room type: {}", other))),
        }
    }
}

/// What the guest asked to book, carried into payment verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub stay_id: String,
    pub stay_name: String,
    pub host_name: String,
    pub room_type: RoomType,
    pub beds: u32,
    pub total_price: f64,
    #[serde(default)]
    pub check_in: String,
    #[serde(default)]
    pub check_out: String,
    #[serde(default = "default_guests")]
    pub guests: u32,
}

fn default_guests() -> u32 {
    1
}

/// Price for a stay, room type and date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingQuote {
    pub room_type: RoomType,
    pub beds: u32,
    pub nights: i64,
    pub price_per_night: f64,
    pub total_price: f64,
}

impl BookingQuote {
    /// Quote `stay` for the given room and dates.
    ///
    /// Private rooms always count as one bed; dorm prices are per bed.
    pub fn compute(
        stay: &Stay,
        room_type: RoomType,
        beds: u32,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Self> {
        let nights = (check_out - check_in).num_days();
        if nights <= 0 {
            return Err(AppError::BadRequest(
                "Check-out date must be after check-in date".to_string(),
            ));
        }

        let (beds, price_per_night) = match room_type {
            RoomType::Private => {
                let price = stay.private_room_price.ok_or_else(|| not_offered(room_type))?;
                (1, price)
            }
            RoomType::Dorm => {
                if beds == 0 {
                    return Err(AppError::BadRequest("Select at least one bed".to_string()));
                }
                let price = stay.dorm_price.ok_or_else(|| not_offered(room_type))?;
                (beds, price * f64::from(beds))
            }
        };

        Ok(Self {
            room_type,
            beds,
            nights,
            price_per_night,
            total_price: price_per_night * nights as f64,
        })
    }

    /// Turn the quote into a request for `stay`.
    pub fn into_request(
        self,
        stay: &Stay,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: Option<u32>,
    ) -> BookingRequest {
        BookingRequest {
            stay_id: stay.id.clone(),
            stay_name: stay.stay_name.clone(),
            host_name: stay.host_name.clone(),
            room_type: self.room_type,
            beds: self.beds,
            total_price: self.total_price,
            check_in: check_in.to_string(),
            check_out: check_out.to_string(),
            guests: guests.unwrap_or_else(default_guests),
        }
    }
}

fn not_offered(room_type: RoomType) -> AppError {
    AppError::BadRequest(format!("This stay does not offer {} rooms", room_type))
}

/// Booking row in the Bookings sheet. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: String,
    pub stay_id: String,
    pub stay_name: String,
    pub host_name: String,
    pub room_type: String,
    pub beds: u32,
    pub total_price: Option<f64>,
    pub check_in: String,
    pub check_out: String,
    pub guests: u32,
    pub status: String,
    pub created_at: String,
    pub expected_host_name: String,
    pub verification_result: String,
}

impl Booking {
    /// A confirmed booking for a request whose payment passed verification.
    pub fn confirmed(
        booking_id: String,
        request: &BookingRequest,
        expected_host_name: &str,
        created_at: String,
    ) -> Self {
        Self {
            booking_id,
            stay_id: request.stay_id.clone(),
            stay_name: request.stay_name.clone(),
            host_name: request.host_name.clone(),
            room_type: request.room_type.to_string(),
            beds: request.beds,
            total_price: Some(request.total_price),
            check_in: request.check_in.clone(),
            check_out: request.check_out.clone(),
            guests: request.guests,
            status: STATUS_CONFIRMED.to_string(),
            created_at,
            expected_host_name: expected_host_name.to_string(),
            verification_result: VERIFICATION_VERIFIED.to_string(),
        }
    }
}

impl SheetRecord for Booking {
    const SHEET: &'static str = tables::BOOKINGS;
    const COLUMNS: &'static [&'static str] = &[
        "booking_id",
        "stay_id",
        "stay_name",
        "host_name",
        "room_type",
        "beds",
        "total_price",
        "check_in",
        "check_out",
        "guests",
        "status",
        "created_at",
        "expected_host_name",
        "verification_result",
    ];
    const SCHEMA_VERSION: u32 = 1;

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::from(self.booking_id.as_str()),
            Value::from(self.stay_id.as_str()),
            Value::from(self.stay_name.as_str()),
            Value::from(self.host_name.as_str()),
            Value::from(self.room_type.as_str()),
            Value::from(self.beds),
            self.total_price.map(Value::from).unwrap_or_else(|| Value::from("")),
            Value::from(self.check_in.as_str()),
            Value::from(self.check_out.as_str()),
            Value::from(self.guests),
            Value::from(self.status.as_str()),
            Value::from(self.created_at.as_str()),
            Value::from(self.expected_host_name.as_str()),
            Value::from(self.verification_result.as_str()),
        ]
    }

    fn from_record(r: &Record) -> Self {
        Self {
            booking_id: r.get("booking_id").to_string(),
            stay_id: r.get("stay_id").to_string(),
            stay_name: r.get("stay_name").to_string(),
            host_name: r.get("host_name").to_string(),
            room_type: r.get("room_type").to_string(),
            beds: r.get("beds").trim().parse().unwrap_or(1),
            total_price: parse_price(r.get("total_price")),
            check_in: r.get("check_in").to_string(),
            check_out: r.get("check_out").to_string(),
            guests: r.get("guests").trim().parse().unwrap_or(1),
            status: r.get("status").to_string(),
            created_at: r.get("created_at").to_string(),
            expected_host_name: r.get("expected_host_name").to_string(),
            verification_result: r.get("verification_result").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::Record;

    fn stay() -> Stay {
        let mut stay = Stay::from_record(&Record::from([
            ("id", "stay_1"),
            ("stay_name", "Hilltop"),
            ("host_name", "Ratul Tarafder"),
            ("private_room_price", "1500"),
            ("dorm_price", "600"),
        ]));
        stay.status = "approved".to_string();
        stay
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_dorm_quote_is_per_bed() {
        let quote = BookingQuote::compute(&stay(), RoomType::Dorm, 3, date("2026-03-01"), date("2026-03-04")).unwrap();
        assert_eq!(quote.nights, 3);
        assert_eq!(quote.price_per_night, 1800.0);
        assert_eq!(quote.total_price, 5400.0);
    }

    #[test]
    fn test_private_quote_forces_one_bed() {
        let quote = BookingQuote::compute(&stay(), RoomType::Private, 4, date("2026-03-01"), date("2026-03-03")).unwrap();
        assert_eq!(quote.beds, 1);
        assert_eq!(quote.total_price, 3000.0);

        let request = quote.into_request(&stay(), date("2026-03-01"), date("2026-03-03"), None);
        assert_eq!(request.guests, 1);
        assert_eq!(request.check_in, "2026-03-01");
    }

    #[test]
    fn test_quote_rejects_empty_range() {
        let same_day = BookingQuote::compute(&stay(), RoomType::Private, 1, date("2026-03-01"), date("2026-03-01"));
        assert!(matches!(same_day, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_quote_rejects_missing_room_price() {
        let mut no_dorm = stay();
        no_dorm.dorm_price = None;
        let quote = BookingQuote::compute(&no_dorm, RoomType::Dorm, 1, date("2026-03-01"), date("2026-03-02"));
        assert!(matches!(quote, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_booking_request_camel_case() {
        let json = r#"{"stayId":"stay_1","stayName":"Hilltop","hostName":"Ratul",
                       "roomType":"dorm","beds":2,"totalPrice":1200}"#;
        let request: BookingRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.room_type, RoomType::Dorm);
        assert_eq!(request.guests, 1);
        assert_eq!(request.check_in, "");
    }
}
