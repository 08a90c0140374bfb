// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! A volunteer's participation in one activity.

use crate::services::geofence::GeoPoint;
use crate::time_utils::hours_between;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ParticipationStatus {
    Registered,
    Cancelled,
    Completed,
    /// Set by an external no-show sweep, never by this service.
    Absent,
}

impl ParticipationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipationStatus::Registered => "registered",
            ParticipationStatus::Cancelled => "cancelled",
            ParticipationStatus::Completed => "completed",
            ParticipationStatus::Absent => "absent",
        }
    }
}

impl std::fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arrival record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub time: DateTime<Utc>,
    pub location: Option<GeoPoint>,
    pub device: Option<String>,
}

/// Departure record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOut {
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub time: DateTime<Utc>,
    pub location: Option<GeoPoint>,
}

/// Stored participation record.
///
/// Stored at: `participations/{activity_id}_{user_id}`. The deterministic
/// document ID is what makes (user, activity) unique in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participation {
    pub id: String,
    pub user_id: u64,
    pub activity_id: u64,
    pub status: ParticipationStatus,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub registration_time: DateTime<Utc>,
    pub check_in: Option<CheckIn>,
    pub check_out: Option<CheckOut>,
    /// Attended hours, two decimals; zero until checked out
    #[serde(default)]
    pub participation_hours: f64,
    pub notes: Option<String>,
}

impl Participation {
    /// Document ID for a (user, activity) pair.
    pub fn doc_id(user_id: u64, activity_id: u64) -> String {
        format!("{}_{}", activity_id, user_id)
    }

    /// A fresh registration.
    pub fn register(user_id: u64, activity_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            id: Self::doc_id(user_id, activity_id),
            user_id,
            activity_id,
            status: ParticipationStatus::Registered,
            registration_time: now,
            check_in: None,
            check_out: None,
            participation_hours: 0.0,
            notes: None,
        }
    }

    pub fn is_checked_in(&self) -> bool {
        self.check_in.is_some()
    }

    pub fn check_out_time(&self) -> Option<DateTime<Utc>> {
        self.check_out.as_ref().map(|c| c.time)
    }

    /// Recompute `participation_hours` when both timestamps are present.
    pub fn recalculate_hours(&mut self) {
        if let (Some(check_in), Some(check_out)) = (&self.check_in, &self.check_out) {
            self.participation_hours = hours_between(check_in.time, check_out.time);
        }
    }
}
