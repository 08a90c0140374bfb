// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity read routes.

use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityStatus, TimeStatus};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/activities/{id}", get(get_activity))
}

/// Activity as shown to volunteers, with the time-dependent flags resolved.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub name: String,
    pub description: String,
    pub location_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub range_meters: Option<f64>,
    pub require_location: bool,
    pub status: ActivityStatus,
    pub time_status: TimeStatus,
    pub start_time: String,
    pub end_time: String,
    pub check_in_start: String,
    pub max_participants: u32,
    pub current_participants: u32,
    pub is_registerable: bool,
    pub is_check_in_enabled: bool,
}

impl ActivityResponse {
    pub fn build(activity: Activity, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            time_status: activity.time_status(now),
            is_registerable: activity.is_registerable(now),
            is_check_in_enabled: activity.is_check_in_enabled(now),
            check_in_start: format_utc_rfc3339(activity.check_in_start()),
            start_time: format_utc_rfc3339(activity.start_time),
            end_time: format_utc_rfc3339(activity.end_time),
            id: activity.id,
            name: activity.name,
            description: activity.description,
            location_name: activity.location.name,
            latitude: activity.location.latitude,
            longitude: activity.location.longitude,
            range_meters: activity.location.range_meters,
            require_location: activity.location.require_location,
            status: activity.status,
            max_participants: activity.max_participants,
            current_participants: activity.current_participants,
        }
    }
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<ActivityResponse>> {
    let activity = state
        .store
        .get_activity(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))?;

    Ok(Json(ActivityResponse::build(activity, chrono::Utc::now())))
}
