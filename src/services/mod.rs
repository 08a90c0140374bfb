// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod geofence;
pub mod participation;
pub mod ranking;
pub mod stats;

pub use participation::{CheckOutResult, ParticipationService};
pub use ranking::{RankingEntry, RankingPage, RankingService, UserRankDetail};
pub use stats::StatsAggregator;
