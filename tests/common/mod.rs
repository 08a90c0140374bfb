// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use volunteer_tracker::config::Config;
use volunteer_tracker::db::{DynStore, FirestoreDb, MemoryStore};
use volunteer_tracker::models::{Activity, ActivityLocation, ActivityStatus, CheckInConfig, User};
use volunteer_tracker::routes::create_router;
use volunteer_tracker::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Shared state over a fresh in-memory store.
#[allow(dead_code)]
pub fn test_state() -> Arc<AppState> {
    let store: DynStore = Arc::new(MemoryStore::new());
    Arc::new(AppState::new(Config::test_default(), store))
}

/// Create a test app over an in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state();
    (create_router(state.clone()), state)
}

/// Mint a session token the auth middleware accepts.
#[allow(dead_code)]
pub fn create_test_jwt(state: &AppState, user_id: u64) -> String {
    volunteer_tracker::middleware::auth::create_jwt(user_id, &state.config.jwt_signing_key)
        .expect("Failed to create JWT")
}

/// Fixed reference instant for scenario tests.
#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 10, 9, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn test_user(id: u64, join_date: DateTime<Utc>) -> User {
    User {
        id,
        username: format!("volunteer{}", id),
        name: format!("Volunteer {}", id),
        join_date,
        birthday: None,
    }
}

/// Published activity with a 100 m geofence at (40.0, -75.0).
#[allow(dead_code)]
pub fn test_activity(id: u64, start: DateTime<Utc>, hours: i64) -> Activity {
    Activity {
        id,
        name: format!("Activity {}", id),
        description: String::new(),
        location: ActivityLocation {
            name: "Community Center".to_string(),
            latitude: Some(40.0),
            longitude: Some(-75.0),
            range_meters: Some(100.0),
            require_location: true,
        },
        check_in_config: CheckInConfig::default(),
        status: ActivityStatus::Published,
        max_participants: 20,
        current_participants: 0,
        start_time: start,
        end_time: start + Duration::hours(hours),
    }
}
