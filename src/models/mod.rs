// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod booking;
pub mod stay;
pub mod user;

pub use booking::{Booking, BookingQuote, BookingRequest, RoomType};
pub use stay::{Flags, Stay, StayRegistration};
pub use user::{Session, User};
