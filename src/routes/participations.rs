// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Participation routes: the lifecycle transitions for the caller.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Participation, ParticipationStatus};
use crate::services::geofence::GeoPoint;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Participation routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/participations/my", get(list_my_participations))
        .route("/api/participations/{activity_id}/register", post(register))
        .route("/api/participations/{activity_id}/cancel", post(cancel))
        .route("/api/participations/{activity_id}/check-in", post(check_in))
        .route("/api/participations/{activity_id}/check-out", post(check_out))
}

// ─── Request bodies ──────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CheckInRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(length(max = 200))]
    pub device: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CheckOutRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

/// Coordinates are all-or-nothing.
fn coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<Option<GeoPoint>> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Ok(Some(GeoPoint::new(lat, lon))),
        (None, None) => Ok(None),
        _ => Err(AppError::BadRequest(
            "latitude and longitude must be supplied together".to_string(),
        )),
    }
}

// ─── Responses ───────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ParticipationResponse {
    pub id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub activity_id: u64,
    pub status: ParticipationStatus,
    pub registration_time: String,
    pub check_in_time: Option<String>,
    pub check_out_time: Option<String>,
    pub participation_hours: f64,
}

impl From<Participation> for ParticipationResponse {
    fn from(p: Participation) -> Self {
        Self {
            registration_time: format_utc_rfc3339(p.registration_time),
            check_in_time: p.check_in.as_ref().map(|c| format_utc_rfc3339(c.time)),
            check_out_time: p.check_out_time().map(format_utc_rfc3339),
            id: p.id,
            activity_id: p.activity_id,
            status: p.status,
            participation_hours: p.participation_hours,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckOutResponse {
    pub participation: ParticipationResponse,
    pub total_hours: f64,
}

// ─── Handlers ────────────────────────────────────────────────

async fn list_my_participations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ParticipationResponse>>> {
    let list = state
        .participation_service
        .list_for_user(user.user_id)
        .await?;
    Ok(Json(list.into_iter().map(Into::into).collect()))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<u64>,
) -> Result<Json<ParticipationResponse>> {
    let participation = state
        .participation_service
        .register(user.user_id, activity_id, chrono::Utc::now())
        .await?;
    Ok(Json(participation.into()))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<u64>,
) -> Result<Json<ParticipationResponse>> {
    let participation = state
        .participation_service
        .cancel(user.user_id, activity_id)
        .await?;
    Ok(Json(participation.into()))
}

async fn check_in(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<u64>,
    body: Option<Json<CheckInRequest>>,
) -> Result<Json<ParticipationResponse>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()?;
    let location = coordinates(body.latitude, body.longitude)?;

    let participation = state
        .participation_service
        .check_in(
            user.user_id,
            activity_id,
            location,
            body.device,
            chrono::Utc::now(),
        )
        .await?;
    Ok(Json(participation.into()))
}

async fn check_out(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<u64>,
    body: Option<Json<CheckOutRequest>>,
) -> Result<Json<CheckOutResponse>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()?;
    let location = coordinates(body.latitude, body.longitude)?;

    let result = state
        .participation_service
        .check_out(user.user_id, activity_id, location, chrono::Utc::now())
        .await?;
    Ok(Json(CheckOutResponse {
        participation: result.participation.into(),
        total_hours: result.total_hours,
    }))
}
