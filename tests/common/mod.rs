// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use nomadic_stays::config::Config;
use nomadic_stays::models::{Flags, StayRegistration};
use nomadic_stays::services::oauth::GoogleProfile;
use nomadic_stays::{AppContext, OfflineHandles};

/// Create an offline context (in-memory sheets, storage and mocks).
#[allow(dead_code)]
pub async fn offline_context() -> (AppContext, OfflineHandles) {
    AppContext::offline(Config::test_default())
        .await
        .expect("Failed to build offline context")
}

/// Offline context whose Google profile is `email` / `name`.
#[allow(dead_code)]
pub async fn offline_context_as(email: &str, name: &str) -> (AppContext, OfflineHandles) {
    let (ctx, handles) = offline_context().await;
    handles.consent.set_profile(GoogleProfile {
        email: Some(email.to_string()),
        name: Some(name.to_string()),
        given_name: None,
    });
    (ctx, handles)
}

/// A registration form that passes validation.
#[allow(dead_code)]
pub fn stay_form(name: &str) -> StayRegistration {
    StayRegistration {
        stay_name: name.to_string(),
        stay_type: "hostel".to_string(),
        description: "Quiet rooms above the valley".to_string(),
        location: "Manali".to_string(),
        activities: Flags::from([("bonfire".to_string(), true), ("trek".to_string(), false)]),
        private_room_price: Some(1500.0),
        private_room_description: "Double bed, valley view".to_string(),
        dorm_price: Some(600.0),
        dorm_room_description: "6-bed mixed dorm".to_string(),
        meals_included: "breakfast".to_string(),
        check_in_time: "12:00".to_string(),
        check_out_time: "10:00".to_string(),
        offerings: Flags::from([("wifi".to_string(), true)]),
        host_name: "Ratul Tarafder".to_string(),
        contact_number: "+91 98765 43210".to_string(),
        upi_id: "ratul@upi".to_string(),
        about_host: "Trek guide and cook".to_string(),
    }
}
