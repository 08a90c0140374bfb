// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    // ─── Participation state conflicts ───────────────────────────
    #[error("Already registered for activity {activity_id}")]
    AlreadyRegistered { activity_id: u64 },

    #[error("Participation is {status}, expected registered")]
    InvalidState { status: String },

    #[error("Check-in required before check-out")]
    CheckInRequired,

    // ─── Eligibility ─────────────────────────────────────────────
    #[error("Activity {activity_id} is not open for registration")]
    NotRegisterable { activity_id: u64 },

    #[error("Check-in is not open for activity {activity_id}")]
    OutsideCheckInWindow { activity_id: u64 },

    #[error("Check-in location is {distance_meters:.1}m from the activity, limit is {range_meters}m")]
    OutsideGeofence {
        distance_meters: f64,
        range_meters: f64,
        center_latitude: f64,
        center_longitude: f64,
    },

    #[error("Activity {activity_id} requires a location to check in")]
    LocationRequired { activity_id: u64 },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl AppError {
    /// Machine-readable error code used in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidToken => "invalid_token",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::AlreadyRegistered { .. } => "already_registered",
            AppError::InvalidState { .. } => "invalid_state",
            AppError::CheckInRequired => "check_in_required",
            AppError::NotRegisterable { .. } => "not_registerable",
            AppError::OutsideCheckInWindow { .. } => "outside_check_in_window",
            AppError::OutsideGeofence { .. } => "outside_geofence",
            AppError::LocationRequired { .. } => "location_required",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::NotRegisterable { .. }
            | AppError::OutsideCheckInWindow { .. }
            | AppError::OutsideGeofence { .. }
            | AppError::LocationRequired { .. } => StatusCode::BAD_REQUEST,
            AppError::AlreadyRegistered { .. }
            | AppError::InvalidState { .. }
            | AppError::CheckInRequired => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let details = match &self {
            AppError::NotFound(msg) | AppError::BadRequest(msg) => {
                Some(serde_json::Value::String(msg.clone()))
            }
            AppError::OutsideGeofence {
                distance_meters,
                range_meters,
                center_latitude,
                center_longitude,
            } => Some(serde_json::json!({
                "distance_meters": distance_meters,
                "range_meters": range_meters,
                "activity_location": {
                    "latitude": center_latitude,
                    "longitude": center_longitude,
                },
            })),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                None
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                None
            }
            AppError::Unauthorized | AppError::InvalidToken => None,
            other => Some(serde_json::Value::String(other.to_string())),
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            details,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
