// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Participation lifecycle tests over the in-memory store.
//!
//! These tests verify that:
//! 1. The early check-in window and geofence guards reject in order
//! 2. Registration and cancel stay consistent under concurrent requests
//! 3. Check-out completes the participation and updates stats together

use chrono::Duration;
use std::sync::Arc;
use tokio::sync::Barrier;
use volunteer_tracker::error::AppError;
use volunteer_tracker::models::{Participation, ParticipationStatus};
use volunteer_tracker::services::geofence::GeoPoint;

mod common;
use common::{t0, test_activity, test_state, test_user};

#[tokio::test]
async fn test_early_check_in_window() {
    let state = test_state();
    let mut activity = test_activity(1, t0() + Duration::hours(2), 2);
    activity.location.require_location = false;
    activity.check_in_config.require_early_check_in = true;
    state.store.upsert_activity(&activity).await.unwrap();
    state.store.upsert_user(&test_user(10, t0())).await.unwrap();
    let service = &state.participation_service;

    service.register(10, 1, t0()).await.unwrap();

    // Window opens at start - 3h = T-1h.
    let too_early = t0() - Duration::hours(1) - Duration::minutes(1);
    let err = service
        .check_in(10, 1, None, None, too_early)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OutsideCheckInWindow { activity_id: 1 }));

    let p = service
        .check_in(10, 1, None, None, t0() + Duration::hours(1))
        .await
        .unwrap();
    assert!(p.is_checked_in());
    assert_eq!(p.status, ParticipationStatus::Registered);
}

#[tokio::test]
async fn test_check_in_opens_at_start_without_early_window() {
    let state = test_state();
    let mut activity = test_activity(1, t0() + Duration::hours(2), 2);
    activity.location.require_location = false;
    state.store.upsert_activity(&activity).await.unwrap();
    let service = &state.participation_service;

    service.register(10, 1, t0()).await.unwrap();

    let err = service
        .check_in(10, 1, None, None, t0() + Duration::hours(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OutsideCheckInWindow { .. }));

    service
        .check_in(10, 1, None, None, t0() + Duration::hours(2))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_geofence_check_in() {
    let state = test_state();
    let mut activity = test_activity(2, t0(), 3);
    activity.location.range_meters = Some(50.0);
    state.store.upsert_activity(&activity).await.unwrap();
    let service = &state.participation_service;

    service
        .register(10, 2, t0() - Duration::days(1))
        .await
        .unwrap();

    // About 200 m north of the center.
    let far = GeoPoint::new(40.0018, -75.0);
    let err = service
        .check_in(10, 2, Some(far), None, t0())
        .await
        .unwrap_err();
    match err {
        AppError::OutsideGeofence {
            distance_meters,
            range_meters,
            center_latitude,
            center_longitude,
        } => {
            assert!((distance_meters - 200.0).abs() < 1.0, "got {}", distance_meters);
            assert_eq!(range_meters, 50.0);
            assert_eq!((center_latitude, center_longitude), (40.0, -75.0));
        }
        other => panic!("expected OutsideGeofence, got {:?}", other),
    }

    let err = service.check_in(10, 2, None, None, t0()).await.unwrap_err();
    assert!(matches!(err, AppError::LocationRequired { activity_id: 2 }));

    service
        .check_in(10, 2, Some(GeoPoint::new(40.0, -75.0)), None, t0())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_geofence_without_center_is_permissive() {
    let state = test_state();
    let mut activity = test_activity(3, t0(), 3);
    activity.location.latitude = None;
    activity.location.longitude = None;
    state.store.upsert_activity(&activity).await.unwrap();
    let service = &state.participation_service;

    service
        .register(10, 3, t0() - Duration::days(1))
        .await
        .unwrap();
    service
        .check_in(10, 3, Some(GeoPoint::new(10.0, 10.0)), None, t0())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_duplicate_registration() {
    let state = test_state();
    state
        .store
        .upsert_activity(&test_activity(4, t0() + Duration::days(1), 2))
        .await
        .unwrap();

    // Both requests pass the existence check before either one inserts, so
    // only the store's uniqueness constraint can reject the second.
    let barrier = Arc::new(Barrier::new(2));
    let mut handles = vec![];
    for _ in 0..2 {
        let store = state.store.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            assert!(store.get_participation(10, 4).await.unwrap().is_none());
            barrier.wait().await;
            store
                .create_registration(&Participation::register(10, 4, t0()))
                .await
        }));
    }

    let mut results = vec![];
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let dup = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::AlreadyRegistered { activity_id: 4 })))
        .count();
    assert_eq!((ok, dup), (1, 1));

    let activity = state.store.get_activity(4).await.unwrap().unwrap();
    assert_eq!(activity.current_participants, 1);
}

#[tokio::test]
async fn test_concurrent_cancel_decrements_once() {
    let state = test_state();
    state
        .store
        .upsert_activity(&test_activity(6, t0() + Duration::days(1), 2))
        .await
        .unwrap();
    let service = &state.participation_service;
    service.register(10, 6, t0()).await.unwrap();
    service.register(11, 6, t0()).await.unwrap();

    // Two cancels for user 10 that both read `registered`.
    let barrier = Arc::new(Barrier::new(2));
    let mut handles = vec![];
    for _ in 0..2 {
        let store = state.store.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            let mut p = store.get_participation(10, 6).await.unwrap().unwrap();
            assert_eq!(p.status, ParticipationStatus::Registered);
            barrier.wait().await;
            p.status = ParticipationStatus::Cancelled;
            store.cancel_registration(&p).await
        }));
    }

    let mut results = vec![];
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::InvalidState { .. }))));

    let activity = state.store.get_activity(6).await.unwrap().unwrap();
    assert_eq!(activity.current_participants, 1);
}

#[tokio::test]
async fn test_register_full_or_started_activity() {
    let state = test_state();
    let mut full = test_activity(5, t0() + Duration::days(1), 2);
    full.max_participants = 1;
    full.current_participants = 1;
    state.store.upsert_activity(&full).await.unwrap();
    state
        .store
        .upsert_activity(&test_activity(6, t0() - Duration::hours(1), 2))
        .await
        .unwrap();
    let service = &state.participation_service;

    assert!(matches!(
        service.register(10, 5, t0()).await,
        Err(AppError::NotRegisterable { activity_id: 5 })
    ));
    assert!(matches!(
        service.register(10, 6, t0()).await,
        Err(AppError::NotRegisterable { activity_id: 6 })
    ));
    assert!(matches!(
        service.register(10, 99, t0()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_check_out_requires_check_in() {
    let state = test_state();
    state
        .store
        .upsert_activity(&test_activity(7, t0(), 3))
        .await
        .unwrap();
    state.store.upsert_user(&test_user(10, t0())).await.unwrap();
    let service = &state.participation_service;

    service
        .register(10, 7, t0() - Duration::days(1))
        .await
        .unwrap();

    let err = service
        .check_out(10, 7, None, t0() + Duration::hours(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CheckInRequired));

    let stored = state.store.get_participation(10, 7).await.unwrap().unwrap();
    assert!(stored.check_out.is_none());
    assert_eq!(stored.status, ParticipationStatus::Registered);
}

#[tokio::test]
async fn test_check_out_completes_and_updates_stats() {
    let state = test_state();
    state
        .store
        .upsert_activity(&test_activity(8, t0(), 4))
        .await
        .unwrap();
    state
        .store
        .upsert_user(&test_user(10, t0() - Duration::days(60)))
        .await
        .unwrap();
    let service = &state.participation_service;

    service
        .register(10, 8, t0() - Duration::days(1))
        .await
        .unwrap();
    service
        .check_in(10, 8, Some(GeoPoint::new(40.0, -75.0)), None, t0())
        .await
        .unwrap();

    let result = service
        .check_out(
            10,
            8,
            None,
            t0() + Duration::hours(2) + Duration::minutes(20),
        )
        .await
        .unwrap();

    assert_eq!(result.participation.status, ParticipationStatus::Completed);
    assert_eq!(result.participation.participation_hours, 2.33);
    assert_eq!(result.total_hours, 2.33);

    let check_in = result.participation.check_in.as_ref().unwrap().time;
    assert!(result.participation.check_out_time().unwrap() >= check_in);

    let stats = state.store.get_user_stats(10).await.unwrap().unwrap();
    assert_eq!(stats.total_hours, 2.33);
    assert_eq!(stats.participation_count, 1);
    assert_eq!(stats.last_activity_id, Some(8));
    assert_eq!(stats.last_activity_name.as_deref(), Some("Activity 8"));
    assert_eq!(stats.rank, 1);
}

#[tokio::test]
async fn test_check_out_for_unknown_user_writes_nothing() {
    let state = test_state();
    state
        .store
        .upsert_activity(&test_activity(9, t0(), 4))
        .await
        .unwrap();
    let service = &state.participation_service;

    service
        .register(77, 9, t0() - Duration::days(1))
        .await
        .unwrap();
    service
        .check_in(77, 9, Some(GeoPoint::new(40.0, -75.0)), None, t0())
        .await
        .unwrap();

    // No user profile: the stats step fails, so the check-out is not committed.
    let err = service
        .check_out(77, 9, None, t0() + Duration::hours(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let stored = state.store.get_participation(77, 9).await.unwrap().unwrap();
    assert!(stored.check_out.is_none());
    assert!(state.store.get_user_stats(77).await.unwrap().is_none());
}
