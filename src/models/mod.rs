// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod participation;
pub mod stats;
pub mod user;

pub use activity::{Activity, ActivityLocation, ActivityStatus, CheckInConfig, TimeStatus};
pub use participation::{CheckIn, CheckOut, Participation, ParticipationStatus};
pub use stats::UserStats;
pub use user::User;
