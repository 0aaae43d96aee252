// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment verification and booking confirmation.

use nomadic_stays::error::AppError;
use nomadic_stays::models::{Booking, BookingRequest, RoomType};
use nomadic_stays::services::{PaymentOracle, PaymentService};

mod common;

const SCREENSHOT: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

fn request() -> BookingRequest {
    BookingRequest {
        stay_id: "stay_1_abcdefghi".to_string(),
        stay_name: "Hilltop".to_string(),
        host_name: "Ratul Tarafder".to_string(),
        room_type: RoomType::Dorm,
        beds: 2,
        total_price: 2400.0,
        check_in: "2026-03-01".to_string(),
        check_out: "2026-03-03".to_string(),
        guests: 2,
    }
}

#[tokio::test]
async fn test_true_verdict_confirms_booking() {
    let (ctx, handles) = common::offline_context().await;
    handles.oracle.set_reply("true");

    let result = ctx
        .payments
        .verify_payment_screenshot(SCREENSHOT, "Ratul Tarafder", &request())
        .await
        .unwrap();

    assert!(result.verified);
    assert_eq!(result.message, "Payment verified successfully");
    let booking_id = result.booking_id.unwrap();
    assert!(booking_id.starts_with("BK"));
    assert_eq!(handles.oracle.asked(), vec!["Ratul Tarafder"]);

    let bookings = ctx.gateway.fetch_records::<Booking>().await.unwrap();
    assert_eq!(bookings.len(), 1);
    let booking = &bookings[0];
    assert_eq!(booking.booking_id, booking_id);
    assert_eq!(booking.status, "confirmed");
    assert_eq!(booking.verification_result, "verified");
    assert_eq!(booking.expected_host_name, "Ratul Tarafder");
    assert_eq!(booking.room_type, "dorm");
    assert_eq!(booking.beds, 2);
    assert_eq!(booking.guests, 2);
    assert_eq!(booking.total_price, Some(2400.0));
}

#[tokio::test]
async fn test_anything_but_true_writes_nothing() {
    let (ctx, handles) = common::offline_context().await;

    for reply in ["false", "False", "", "maybe", "true, probably", "The recipient matches."] {
        handles.oracle.set_reply(reply);
        let result = ctx
            .payments
            .verify_payment_screenshot(SCREENSHOT, "Ratul Tarafder", &request())
            .await
            .unwrap();

        assert!(!result.verified, "reply {reply:?} must not verify");
        assert!(result.booking_id.is_none());
        assert_eq!(result.message, "Recipient name does not match");
    }

    let bookings = ctx.gateway.fetch_records::<Booking>().await.unwrap();
    assert!(bookings.is_empty());
}

#[tokio::test]
async fn test_unconfigured_oracle_is_an_error() {
    let (ctx, _) = common::offline_context().await;
    let payments = PaymentService::new(ctx.gateway.clone(), PaymentOracle::Disabled);

    let err = payments
        .verify_payment_screenshot(SCREENSHOT, "Ratul Tarafder", &request())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Transport(_)));
    assert!(ctx.gateway.fetch_records::<Booking>().await.unwrap().is_empty());
}
