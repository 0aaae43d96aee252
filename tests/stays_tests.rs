// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stay registration and listing read models.

use nomadic_stays::error::AppError;
use nomadic_stays::models::{Stay, StayRegistration};
use nomadic_stays::services::ImageUpload;
use nomadic_stays::sheets::{tables, SheetRecord};
use serde_json::json;

mod common;

/// Column of `status` in the Stays table (V).
const STATUS_COLUMN: &str = "V";

fn photo(name: &str) -> ImageUpload {
    ImageUpload {
        file_name: name.to_string(),
        bytes: b"\x89PNG fake".to_vec(),
    }
}

#[tokio::test]
async fn test_registered_stay_is_pending() {
    let (ctx, _) = common::offline_context().await;

    let registered = ctx
        .stays
        .register_stay(&common::stay_form("Hilltop"), &[], None, Some("user_1_abcdef"))
        .await
        .unwrap();
    assert!(registered.id.starts_with("stay_"));

    assert!(ctx.stays.get_approved_stays().await.unwrap().is_empty());

    let mine = ctx.stays.get_host_stays("user_1_abcdef").await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status, "pending");
    assert_eq!(mine[0].id, registered.id);
}

#[tokio::test]
async fn test_activities_round_trip_after_approval() {
    let (ctx, _) = common::offline_context().await;

    ctx.stays
        .register_stay(&common::stay_form("Hilltop"), &[], None, None)
        .await
        .unwrap();
    ctx.gateway
        .update(tables::STAYS, &format!("{}2", STATUS_COLUMN), vec![json!("approved")])
        .await
        .unwrap();

    let approved = ctx.stays.get_approved_stays().await.unwrap();
    assert_eq!(approved.len(), 1);
    let stay = &approved[0];
    assert_eq!(stay.activities.get("bonfire"), Some(&true));
    assert_eq!(stay.offerings.get("wifi"), Some(&true));
    assert_eq!(stay.private_room_price, Some(1500.0));
    assert_eq!(stay.dorm_price, Some(600.0));
    assert_eq!(stay.host_id, "guest");
}

#[tokio::test]
async fn test_approved_filter_ignores_case_and_spaces() {
    let (ctx, _) = common::offline_context().await;

    let statuses = ["Approved", "APPROVED ", "approved", "pending", "rejected", " approved"];
    for (i, status) in statuses.iter().enumerate() {
        ctx.stays
            .register_stay(&common::stay_form(&format!("Stay {i}")), &[], None, None)
            .await
            .unwrap();
        let row = i + 2;
        ctx.gateway
            .update(tables::STAYS, &format!("{STATUS_COLUMN}{row}"), vec![json!(status)])
            .await
            .unwrap();
    }

    let approved = ctx.stays.get_approved_stays().await.unwrap();
    let names: Vec<&str> = approved.iter().map(|s| s.stay_name.as_str()).collect();
    assert_eq!(names, vec!["Stay 0", "Stay 1", "Stay 2", "Stay 5"]);
    assert!(approved
        .iter()
        .all(|s| s.status.trim().to_lowercase() == "approved"));
}

#[tokio::test]
async fn test_malformed_rows_degrade() {
    let (ctx, _) = common::offline_context().await;

    let mut row = vec![json!(""); Stay::COLUMNS.len()];
    row[0] = json!("stay_legacy");
    row[1] = json!("Legacy Camp");
    row[5] = json!("{not json");
    row[6] = json!("call us");
    row[14] = json!("https://i.ibb.co/a.png, broken, http://x/b.jpg");
    row[21] = json!("Approved");
    ctx.gateway.append(tables::STAYS, row).await.unwrap();

    let approved = ctx.stays.get_approved_stays().await.unwrap();
    assert_eq!(approved.len(), 1);
    let stay = &approved[0];
    assert!(stay.activities.is_empty());
    assert!(stay.offerings.is_empty());
    assert_eq!(stay.private_room_price, None);
    assert_eq!(stay.image_urls, vec!["https://i.ibb.co/a.png", "http://x/b.jpg"]);
}

#[tokio::test]
async fn test_failed_uploads_become_placeholders() {
    let (ctx, handles) = common::offline_context().await;
    handles.images.reject("porch.jpg");
    handles.images.drop_connection("qr.png");

    let registered = ctx
        .stays
        .register_stay(
            &common::stay_form("Hilltop"),
            &[photo("room.jpg"), photo("porch.jpg")],
            Some(&photo("qr.png")),
            Some("user_9"),
        )
        .await
        .unwrap();
    assert_eq!(registered.uploads.len(), 2);
    assert_eq!(registered.failed_uploads(), 2);

    let stays = ctx.stays.get_host_stays("user_9").await.unwrap();
    let stay = &stays[0];
    assert_eq!(stay.image_urls.len(), 2);
    assert!(stay.image_urls[0].starts_with("https://i.ibb.co/mock/user_9_"));
    assert_eq!(
        stay.image_urls[1],
        "https://via.placeholder.com/800x600?text=porch.jpg"
    );
    assert_eq!(
        stay.upi_qr_url,
        "https://via.placeholder.com/800x600?text=Upload+Failed"
    );
}

#[tokio::test]
async fn test_invalid_form_is_not_written() {
    let (ctx, handles) = common::offline_context().await;

    let form = StayRegistration {
        contact_number: "12-34".to_string(),
        ..common::stay_form("Hilltop")
    };
    let err = ctx
        .stays
        .register_stay(&form, &[photo("room.jpg")], None, Some("user_9"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(handles.images.uploaded().is_empty());
    assert!(ctx.stays.get_host_stays("user_9").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_approved_stay_by_id() {
    let (ctx, _) = common::offline_context().await;
    let registered = ctx
        .stays
        .register_stay(&common::stay_form("Hilltop"), &[], None, None)
        .await
        .unwrap();

    let err = ctx.stays.get_approved_stay(&registered.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    ctx.gateway
        .update(tables::STAYS, "V2", vec![json!("approved")])
        .await
        .unwrap();
    let stay = ctx.stays.get_approved_stay(&registered.id).await.unwrap();
    assert_eq!(stay.stay_name, "Hilltop");
}

#[tokio::test]
async fn test_oversized_range_is_a_transport_error() {
    let (ctx, _) = common::offline_context().await;

    let err = ctx
        .gateway
        .read(tables::STAYS, "AAAAAAAAAAAAAAAAAAAA1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Transport(_)));

    let err = ctx
        .gateway
        .update(tables::STAYS, "ZZZZZZZZZZZZZZZZZZZZ2", vec![json!("approved")])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Transport(_)));
}
