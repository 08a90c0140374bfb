// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Participation lifecycle service.
//!
//! Handles the state machine for one volunteer and one activity:
//! 1. Register (increments the activity's participant count)
//! 2. Cancel (decrements it again)
//! 3. Check in, within the check-in window and the geofence
//! 4. Check out, which completes the participation and refreshes the
//!    volunteer's stats in the same store write

use crate::db::DynStore;
use crate::error::{AppError, Result};
use crate::models::{Activity, CheckIn, CheckOut, Participation, ParticipationStatus};
use crate::services::geofence::GeoPoint;
use crate::services::StatsAggregator;
use chrono::{DateTime, Utc};

/// Outcome of a check-out.
#[derive(Debug, Clone)]
pub struct CheckOutResult {
    pub participation: Participation,
    /// The volunteer's total hours after this check-out
    pub total_hours: f64,
}

#[derive(Clone)]
pub struct ParticipationService {
    store: DynStore,
    stats: StatsAggregator,
}

impl ParticipationService {
    pub fn new(store: DynStore, stats: StatsAggregator) -> Self {
        Self { store, stats }
    }

    async fn load_activity(&self, activity_id: u64) -> Result<Activity> {
        self.store
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", activity_id)))
    }

    async fn load_participation(&self, user_id: u64, activity_id: u64) -> Result<Participation> {
        self.store
            .get_participation(user_id, activity_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No participation for activity {}",
                    activity_id
                ))
            })
    }

    /// Register a volunteer for an activity.
    pub async fn register(
        &self,
        user_id: u64,
        activity_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Participation> {
        let activity = self.load_activity(activity_id).await?;

        if !activity.is_registerable(now) {
            tracing::warn!(user_id, activity_id, "Registration rejected: not registerable");
            return Err(AppError::NotRegisterable { activity_id });
        }

        if self
            .store
            .get_participation(user_id, activity_id)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyRegistered { activity_id });
        }

        // The store re-checks uniqueness, so a concurrent duplicate still fails here.
        let participation = Participation::register(user_id, activity_id, now);
        self.store.create_registration(&participation).await?;

        tracing::info!(user_id, activity_id, "Volunteer registered");
        Ok(participation)
    }

    /// Cancel a registration.
    pub async fn cancel(&self, user_id: u64, activity_id: u64) -> Result<Participation> {
        let mut participation = self.load_participation(user_id, activity_id).await?;

        if participation.status != ParticipationStatus::Registered {
            return Err(AppError::InvalidState {
                status: participation.status.to_string(),
            });
        }

        // The store re-checks the status, so a concurrent cancel cannot decrement twice.
        participation.status = ParticipationStatus::Cancelled;
        self.store.cancel_registration(&participation).await?;

        tracing::info!(user_id, activity_id, "Registration cancelled");
        Ok(participation)
    }

    /// Record arrival. Status stays `registered`.
    pub async fn check_in(
        &self,
        user_id: u64,
        activity_id: u64,
        location: Option<GeoPoint>,
        device: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Participation> {
        let activity = self.load_activity(activity_id).await?;
        let mut participation = self.load_participation(user_id, activity_id).await?;

        if participation.status != ParticipationStatus::Registered {
            return Err(AppError::InvalidState {
                status: participation.status.to_string(),
            });
        }

        if !activity.is_check_in_enabled(now) {
            tracing::warn!(user_id, activity_id, "Check-in rejected: window closed");
            return Err(AppError::OutsideCheckInWindow { activity_id });
        }

        match location {
            Some(point) => {
                if !activity.is_location_valid(point) {
                    // is_location_valid only rejects when center and range are configured.
                    let center = activity.location.center().unwrap_or(point);
                    let distance_meters = activity.distance_to(point).unwrap_or_default();
                    let range_meters = activity.location.range_meters.unwrap_or_default();
                    tracing::warn!(
                        user_id,
                        activity_id,
                        distance_meters,
                        range_meters,
                        "Check-in rejected: outside geofence"
                    );
                    return Err(AppError::OutsideGeofence {
                        distance_meters,
                        range_meters,
                        center_latitude: center.latitude,
                        center_longitude: center.longitude,
                    });
                }
            }
            None if activity.location.require_location => {
                return Err(AppError::LocationRequired { activity_id });
            }
            None => {}
        }

        participation.check_in = Some(CheckIn {
            time: now,
            location,
            device,
        });
        self.store.record_check_in(&participation).await?;

        tracing::info!(user_id, activity_id, "Volunteer checked in");
        Ok(participation)
    }

    /// Record departure, complete the participation and refresh stats.
    ///
    /// The participation and the stats row are committed together; the
    /// global re-rank runs after the commit.
    pub async fn check_out(
        &self,
        user_id: u64,
        activity_id: u64,
        location: Option<GeoPoint>,
        now: DateTime<Utc>,
    ) -> Result<CheckOutResult> {
        let mut participation = self.load_participation(user_id, activity_id).await?;

        let Some(check_in_time) = participation.check_in.as_ref().map(|c| c.time) else {
            return Err(AppError::CheckInRequired);
        };

        // Completed may be checked out again; the hours are just recomputed.
        if matches!(
            participation.status,
            ParticipationStatus::Cancelled | ParticipationStatus::Absent
        ) {
            return Err(AppError::InvalidState {
                status: participation.status.to_string(),
            });
        }

        participation.check_out = Some(CheckOut {
            time: now.max(check_in_time),
            location,
        });
        participation.status = ParticipationStatus::Completed;
        participation.recalculate_hours();

        let stats = self.stats.build(user_id, Some(&participation), now).await?;
        self.store
            .complete_participation(&participation, &stats)
            .await?;

        tracing::info!(
            user_id,
            activity_id,
            hours = participation.participation_hours,
            total_hours = stats.total_hours,
            "Volunteer checked out"
        );

        self.stats.recompute_all_ranks().await?;

        Ok(CheckOutResult {
            total_hours: stats.total_hours,
            participation,
        })
    }

    /// The caller's participations, newest registration first.
    pub async fn list_for_user(&self, user_id: u64) -> Result<Vec<Participation>> {
        self.store.list_participations_for_user(user_id).await
    }
}
