// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Volunteer activity model and its eligibility windows.
//!
//! `status` is set by administrators only. Everything that depends on the
//! wall clock (time status, registration and check-in windows) is computed
//! from a caller-supplied `now` and never stored.

use crate::error::AppError;
use crate::services::geofence::{self, GeoPoint};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Early check-in allowance used when an activity doesn't configure one.
pub const DEFAULT_EARLY_CHECK_IN_HOURS: u32 = 3;
/// Largest early check-in allowance an activity may configure.
pub const MAX_EARLY_CHECK_IN_HOURS: u32 = 24;

const UPCOMING_WITHIN_DAYS: i64 = 7;

/// Administrator-controlled lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ActivityStatus {
    Draft,
    Published,
    Cancelled,
    Completed,
}

/// Read-only projection of status and wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum TimeStatus {
    Cancelled,
    Completed,
    Draft,
    Past,
    Ongoing,
    Upcoming,
    Planned,
}

/// Where an activity takes place, plus its optional geofence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityLocation {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Geofence radius in meters
    pub range_meters: Option<f64>,
    /// Whether check-in must prove presence inside the geofence
    #[serde(default)]
    pub require_location: bool,
}

impl ActivityLocation {
    /// Geofence center, if both coordinates are configured.
    pub fn center(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInConfig {
    #[serde(default = "default_early_check_in_hours")]
    pub early_check_in_hours: u32,
    /// When false, check-in opens at the activity start.
    #[serde(default)]
    pub require_early_check_in: bool,
}

fn default_early_check_in_hours() -> u32 {
    DEFAULT_EARLY_CHECK_IN_HOURS
}

impl Default for CheckInConfig {
    fn default() -> Self {
        Self {
            early_check_in_hours: DEFAULT_EARLY_CHECK_IN_HOURS,
            require_early_check_in: false,
        }
    }
}

/// Stored activity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Activity ID (also used as document ID)
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: ActivityLocation,
    #[serde(default)]
    pub check_in_config: CheckInConfig,
    pub status: ActivityStatus,
    pub max_participants: u32,
    #[serde(default)]
    pub current_participants: u32,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub end_time: DateTime<Utc>,
}

impl Activity {
    /// Check write-time invariants.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.end_time <= self.start_time {
            return Err(AppError::BadRequest(
                "Activity end time must be after its start time".to_string(),
            ));
        }
        if self.check_in_config.early_check_in_hours > MAX_EARLY_CHECK_IN_HOURS {
            return Err(AppError::BadRequest(format!(
                "early_check_in_hours must be at most {}",
                MAX_EARLY_CHECK_IN_HOURS
            )));
        }
        if self.max_participants == 0 {
            return Err(AppError::BadRequest(
                "max_participants must be at least 1".to_string(),
            ));
        }
        if let Some(range) = self.location.range_meters {
            if range.is_nan() || range < 0.0 {
                return Err(AppError::BadRequest(
                    "Geofence range must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn time_status(&self, now: DateTime<Utc>) -> TimeStatus {
        match self.status {
            ActivityStatus::Cancelled => return TimeStatus::Cancelled,
            ActivityStatus::Completed => return TimeStatus::Completed,
            ActivityStatus::Draft => return TimeStatus::Draft,
            ActivityStatus::Published => {}
        }

        if now > self.end_time {
            TimeStatus::Past
        } else if now >= self.start_time {
            TimeStatus::Ongoing
        } else if days_until_ceil(now, self.start_time) <= UPCOMING_WITHIN_DAYS {
            TimeStatus::Upcoming
        } else {
            TimeStatus::Planned
        }
    }

    pub fn is_registerable(&self, now: DateTime<Utc>) -> bool {
        self.status == ActivityStatus::Published
            && now < self.start_time
            && self.current_participants < self.max_participants
    }

    /// When check-in opens.
    pub fn check_in_start(&self) -> DateTime<Utc> {
        if self.check_in_config.require_early_check_in {
            self.start_time - Duration::hours(i64::from(self.check_in_config.early_check_in_hours))
        } else {
            self.start_time
        }
    }

    pub fn is_check_in_enabled(&self, now: DateTime<Utc>) -> bool {
        self.status == ActivityStatus::Published
            && now >= self.check_in_start()
            && now <= self.end_time
    }

    /// Distance from the geofence center, if one is configured.
    pub fn distance_to(&self, point: GeoPoint) -> Option<f64> {
        self.location
            .center()
            .map(|center| geofence::distance_meters(center, point))
    }

    /// Whether `point` satisfies this activity's geofence.
    ///
    /// Missing geofence configuration never rejects.
    pub fn is_location_valid(&self, point: GeoPoint) -> bool {
        if !self.location.require_location {
            return true;
        }
        let (Some(range), Some(center)) = (self.location.range_meters, self.location.center())
        else {
            return true;
        };
        geofence::is_within(center, range, point)
    }
}

/// Whole days until `target`, rounded up.
fn days_until_ceil(now: DateTime<Utc>, target: DateTime<Utc>) -> i64 {
    let millis = target.signed_duration_since(now).num_milliseconds();
    let per_day = Duration::days(1).num_milliseconds();
    (millis + per_day - 1).div_euclid(per_day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn make_activity(status: ActivityStatus, start_in: Duration) -> Activity {
        let start = base_time() + start_in;
        Activity {
            id: 1,
            name: "Beach cleanup".to_string(),
            description: String::new(),
            location: ActivityLocation {
                name: "Ocean Beach".to_string(),
                ..Default::default()
            },
            check_in_config: CheckInConfig::default(),
            status,
            max_participants: 10,
            current_participants: 0,
            start_time: start,
            end_time: start + Duration::hours(3),
        }
    }

    #[test]
    fn test_time_status_projection() {
        let now = base_time();
        let published = |d| make_activity(ActivityStatus::Published, d);

        assert_eq!(published(Duration::days(10)).time_status(now), TimeStatus::Planned);
        assert_eq!(published(Duration::days(7)).time_status(now), TimeStatus::Upcoming);
        assert_eq!(published(Duration::hours(1)).time_status(now), TimeStatus::Upcoming);
        assert_eq!(published(Duration::hours(-1)).time_status(now), TimeStatus::Ongoing);
        assert_eq!(published(Duration::hours(-4)).time_status(now), TimeStatus::Past);

        let draft = make_activity(ActivityStatus::Draft, Duration::hours(-4));
        assert_eq!(draft.time_status(now), TimeStatus::Draft);
        let cancelled = make_activity(ActivityStatus::Cancelled, Duration::days(2));
        assert_eq!(cancelled.time_status(now), TimeStatus::Cancelled);
    }

    #[test]
    fn test_is_registerable() {
        let now = base_time();
        let mut activity = make_activity(ActivityStatus::Published, Duration::hours(2));
        assert!(activity.is_registerable(now));

        activity.current_participants = activity.max_participants;
        assert!(!activity.is_registerable(now));

        let started = make_activity(ActivityStatus::Published, Duration::zero());
        assert!(!started.is_registerable(now));

        let draft = make_activity(ActivityStatus::Draft, Duration::hours(2));
        assert!(!draft.is_registerable(now));
    }

    #[test]
    fn test_check_in_window_without_early_requirement() {
        let now = base_time();
        let activity = make_activity(ActivityStatus::Published, Duration::hours(2));

        assert!(!activity.is_check_in_enabled(now));
        assert!(activity.is_check_in_enabled(now + Duration::hours(2)));
        assert!(activity.is_check_in_enabled(now + Duration::hours(5)));
        assert!(!activity.is_check_in_enabled(now + Duration::hours(5) + Duration::seconds(1)));
    }

    #[test]
    fn test_check_in_window_with_early_requirement() {
        let now = base_time();
        let mut activity = make_activity(ActivityStatus::Published, Duration::hours(2));
        activity.check_in_config.require_early_check_in = true;

        assert_eq!(activity.check_in_start(), now - Duration::hours(1));
        assert!(!activity.is_check_in_enabled(now - Duration::hours(2)));
        assert!(activity.is_check_in_enabled(now - Duration::hours(1)));
        assert!(activity.is_check_in_enabled(now));
    }

    #[test]
    fn test_missing_geofence_is_permissive() {
        let mut activity = make_activity(ActivityStatus::Published, Duration::hours(2));
        let far_away = GeoPoint::new(-33.86, 151.21);

        activity.location.require_location = true;
        assert!(activity.is_location_valid(far_away), "no range, no center");

        activity.location.range_meters = Some(50.0);
        assert!(activity.is_location_valid(far_away), "no center");

        activity.location.latitude = Some(40.0);
        activity.location.longitude = Some(-75.0);
        assert!(!activity.is_location_valid(far_away));
        assert!(activity.is_location_valid(GeoPoint::new(40.0, -75.0)));

        activity.location.require_location = false;
        assert!(activity.is_location_valid(far_away));
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let mut activity = make_activity(ActivityStatus::Draft, Duration::hours(2));
        assert!(activity.validate().is_ok());
        activity.end_time = activity.start_time;
        assert!(matches!(activity.validate(), Err(AppError::BadRequest(_))));
    }
}
