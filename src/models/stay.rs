// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stay listings and the registration form.

use crate::sheets::{decode_or_default, parse_price, tables, Record, SheetRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

/// Checkbox-style options (activities, offerings) keyed by option name.
pub type Flags = BTreeMap<String, bool>;

/// Moderation state written on registration.
pub const STATUS_PENDING: &str = "pending";
/// Moderation state of listable stays.
pub const STATUS_APPROVED: &str = "approved";

/// Stay row in the Stays sheet (columns A..W).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stay {
    pub id: String,
    pub stay_name: String,
    pub stay_type: String,
    pub description: String,
    pub location: String,
    pub activities: Flags,
    pub private_room_price: Option<f64>,
    pub private_room_description: String,
    pub dorm_price: Option<f64>,
    pub dorm_room_description: String,
    pub meals_included: String,
    pub check_in_time: String,
    pub check_out_time: String,
    pub offerings: Flags,
    pub image_urls: Vec<String>,
    pub host_id: String,
    pub host_name: String,
    pub contact_number: String,
    pub upi_id: String,
    pub upi_qr_url: String,
    pub about_host: String,
    pub status: String,
    pub created_at: String,
}

impl Stay {
    /// Status compared after trimming and case folding.
    pub fn is_approved(&self) -> bool {
        self.status.trim().to_lowercase() == STATUS_APPROVED
    }
}

impl SheetRecord for Stay {
    const SHEET: &'static str = tables::STAYS;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "stay_name",
        "stay_type",
        "description",
        "location",
        "activities",
        "private_room_price",
        "private_room_description",
        "dorm_price",
        "dorm_room_description",
        "meals_included",
        "check_in_time",
        "check_out_time",
        "offerings",
        "image_urls",
        "host_id",
        "host_name",
        "contact_number",
        "upi_id",
        "upi_qr_url",
        "about_host",
        "status",
        "created_at",
    ];
    const SCHEMA_VERSION: u32 = 1;

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::from(self.id.as_str()),
            Value::from(self.stay_name.as_str()),
            Value::from(self.stay_type.as_str()),
            Value::from(self.description.as_str()),
            Value::from(self.location.as_str()),
            flags_cell(&self.activities),
            price_cell(self.private_room_price),
            Value::from(self.private_room_description.as_str()),
            price_cell(self.dorm_price),
            Value::from(self.dorm_room_description.as_str()),
            Value::from(self.meals_included.as_str()),
            Value::from(self.check_in_time.as_str()),
            Value::from(self.check_out_time.as_str()),
            flags_cell(&self.offerings),
            Value::from(self.image_urls.join(", ")),
            Value::from(self.host_id.as_str()),
            Value::from(self.host_name.as_str()),
            Value::from(self.contact_number.as_str()),
            Value::from(self.upi_id.as_str()),
            Value::from(self.upi_qr_url.as_str()),
            Value::from(self.about_host.as_str()),
            Value::from(self.status.as_str()),
            Value::from(self.created_at.as_str()),
        ]
    }

    fn from_record(r: &Record) -> Self {
        Self {
            id: r.get("id").to_string(),
            stay_name: r.get("stay_name").to_string(),
            stay_type: r.get("stay_type").to_string(),
            description: r.get("description").to_string(),
            location: r.get("location").to_string(),
            activities: decode_or_default("activities", r.get("activities")),
            private_room_price: parse_price(r.get("private_room_price")),
            private_room_description: r.get("private_room_description").to_string(),
            dorm_price: parse_price(r.get("dorm_price")),
            dorm_room_description: r.get("dorm_room_description").to_string(),
            meals_included: r.get("meals_included").to_string(),
            check_in_time: r.get("check_in_time").to_string(),
            check_out_time: r.get("check_out_time").to_string(),
            offerings: decode_or_default("offerings", r.get("offerings")),
            image_urls: split_image_urls(r.get("image_urls")),
            host_id: r.get("host_id").to_string(),
            host_name: r.get("host_name").to_string(),
            contact_number: r.get("contact_number").to_string(),
            upi_id: r.get("upi_id").to_string(),
            upi_qr_url: r.get("upi_qr_url").to_string(),
            about_host: r.get("about_host").to_string(),
            status: r.get("status").to_string(),
            created_at: r.get("created_at").to_string(),
        }
    }
}

fn flags_cell(flags: &Flags) -> Value {
    Value::from(serde_json::to_string(flags).unwrap_or_else(|_| "{}".to_string()))
}

fn price_cell(price: Option<f64>) -> Value {
    price.map(Value::from).unwrap_or_else(|| Value::from(""))
}

/// Split the `", "`-joined URL list, keeping only entries that look like URLs.
pub fn split_image_urls(raw: &str) -> Vec<String> {
    raw.split(", ")
        .map(str::trim)
        .filter(|url| url.starts_with("http"))
        .map(str::to_string)
        .collect()
}

/// Stay registration form, as submitted by a host.
///
/// Accepts both snake_case and camelCase keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct StayRegistration {
    #[serde(alias = "stayName")]
    #[validate(length(min = 1, message = "Stay name is required"))]
    pub stay_name: String,

    #[serde(alias = "stayType")]
    #[validate(length(min = 1, message = "Stay type is required"))]
    pub stay_type: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,

    #[serde(default)]
    #[validate(custom(function = "at_least_one_selected"))]
    pub activities: Flags,

    #[serde(default, alias = "privateRoomPrice")]
    #[validate(range(min = 0.0, message = "Prices cannot be negative"))]
    pub private_room_price: Option<f64>,

    #[serde(default, alias = "privateRoomDescription")]
    pub private_room_description: String,

    #[serde(default, alias = "dormPrice")]
    #[validate(range(min = 0.0, message = "Prices cannot be negative"))]
    pub dorm_price: Option<f64>,

    #[serde(default, alias = "dormRoomDescription")]
    pub dorm_room_description: String,

    #[serde(default, alias = "mealsIncluded")]
    pub meals_included: String,

    #[serde(default, alias = "checkInTime")]
    pub check_in_time: String,

    #[serde(default, alias = "checkOutTime")]
    pub check_out_time: String,

    #[serde(default)]
    pub offerings: Flags,

    #[serde(alias = "hostName")]
    #[validate(length(min = 1, message = "Host name is required"))]
    pub host_name: String,

    #[serde(alias = "contactNumber")]
    #[validate(custom(function = "contact_number_format"))]
    pub contact_number: String,

    #[serde(alias = "upiId")]
    #[validate(length(min = 1, message = "UPI ID is required"))]
    pub upi_id: String,

    #[serde(alias = "aboutHost")]
    #[validate(length(min = 1, message = "About host is required"))]
    pub about_host: String,
}

fn at_least_one_selected(flags: &Flags) -> Result<(), ValidationError> {
    if flags.values().any(|selected| *selected) {
        Ok(())
    } else {
        Err(ValidationError::new("activities").with_message("Select at least one activity".into()))
    }
}

/// Optional leading `+`, then at least ten digits, spaces or dashes.
fn contact_number_format(number: &str) -> Result<(), ValidationError> {
    let body = number.strip_prefix('+').unwrap_or(number);
    let well_formed = body.chars().count() >= 10
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || c == '-');

    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new("contact_number")
            .with_message("Please enter a valid contact number".into()))
    }
}
