// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Opaque identifiers for rows written to the spreadsheet.

use crate::time_utils::now_millis;
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random lowercase base36 string of `len` characters.
fn base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// `user_<ms>_<6 base36>`
pub fn user_id() -> String {
    format!("user_{}_{}", now_millis(), base36(6))
}

/// `stay_<ms>_<9 base36>`
pub fn stay_id() -> String {
    format!("stay_{}_{}", now_millis(), base36(9))
}

/// `BK<ms><6 uppercase base36>`
pub fn booking_id() -> String {
    format!("BK{}{}", now_millis(), base36(6).to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_shape() {
        let id = user_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn test_booking_id_is_uppercase() {
        let id = booking_id();
        assert!(id.starts_with("BK"));
        assert_eq!(id, id.to_uppercase());
    }
}
