// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time as Unix epoch milliseconds (the persisted expiry format).
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Human-readable clock time for an epoch-millis instant, e.g. "14:05 UTC".
pub fn expiry_label(expires_at_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(expires_at_ms)
        .map(|dt| dt.format("%H:%M UTC").to_string())
        .unwrap_or_else(|| "soon".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_label_formats_clock_time() {
        // 2026-01-01T14:05:00Z
        assert_eq!(expiry_label(1_767_276_300_000), "14:05 UTC");
    }

    #[test]
    fn test_rfc3339_uses_z_suffix() {
        let date = DateTime::<Utc>::from_timestamp_millis(0).unwrap();
        assert_eq!(format_utc_rfc3339(date), "1970-01-01T00:00:00.000Z");
    }
}
