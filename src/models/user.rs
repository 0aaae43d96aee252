// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model and the cached session projection.

use crate::sheets::{tables, Record, SheetRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User row in the Users sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque id (`user_<ms>_<random>`)
    pub id: String,
    /// Unique, compared case-sensitively
    pub email: String,
    pub name: String,
    /// ISO 8601 timestamp
    pub created_at: String,
    /// Stored as `TRUE` / `FALSE`
    pub email_verified: bool,
}

impl SheetRecord for User {
    const SHEET: &'static str = tables::USERS;
    const COLUMNS: &'static [&'static str] = &["Id", "Email", "Name", "Created At", "Email Verified"];
    const SCHEMA_VERSION: u32 = 1;

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::from(self.id.as_str()),
            Value::from(self.email.as_str()),
            Value::from(self.name.as_str()),
            Value::from(self.created_at.as_str()),
            Value::from(if self.email_verified { "TRUE" } else { "FALSE" }),
        ]
    }

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.get("id").to_string(),
            email: record.get("email").to_string(),
            name: record.get("name").to_string(),
            created_at: record.get("created_at").to_string(),
            email_verified: record.get("email_verified").trim().eq_ignore_ascii_case("true"),
        }
    }
}

/// Signed-in user as cached in memory and client storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for Session {
    fn from(user: &User) -> Self {
        Self {
            uid: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}
