// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard cache tests.
//!
//! These tests verify that:
//! 1. Stats totals come from completed participations only
//! 2. Fresh cache entries are served without recomputation
//! 3. Ranks are dense and follow hours, then join date

use chrono::{DateTime, Duration, Utc};
use volunteer_tracker::models::{CheckIn, CheckOut, Participation, ParticipationStatus, UserStats};
use volunteer_tracker::services::StatsAggregator;
use volunteer_tracker::AppState;

mod common;
use common::{t0, test_activity, test_state, test_user};

/// Store a completed participation lasting `minutes`.
async fn complete(
    state: &AppState,
    user_id: u64,
    activity_id: u64,
    at: DateTime<Utc>,
    minutes: i64,
) {
    let mut p = Participation::register(user_id, activity_id, at - Duration::days(1));
    p.check_in = Some(CheckIn {
        time: at,
        location: None,
        device: None,
    });
    p.check_out = Some(CheckOut {
        time: at + Duration::minutes(minutes),
        location: None,
    });
    p.status = ParticipationStatus::Completed;
    p.recalculate_hours();
    state.store.save_participation(&p).await.unwrap();
}

fn aggregator(state: &AppState) -> StatsAggregator {
    StatsAggregator::new(state.store.clone(), state.config.stats_ttl())
}

#[tokio::test]
async fn test_recompute_sums_completed_hours() {
    let state = test_state();
    state.store.upsert_user(&test_user(1, t0())).await.unwrap();
    for id in [1, 2, 3] {
        state
            .store
            .upsert_activity(&test_activity(id, t0() - Duration::days(10), 8))
            .await
            .unwrap();
    }
    complete(&state, 1, 1, t0() - Duration::days(3), 120).await;
    complete(&state, 1, 2, t0() - Duration::days(2), 210).await;

    // A cancelled participation never counts.
    let mut cancelled = Participation::register(1, 3, t0());
    cancelled.status = ParticipationStatus::Cancelled;
    state.store.save_participation(&cancelled).await.unwrap();

    let stats = aggregator(&state).recompute(1, t0()).await.unwrap();

    assert_eq!(stats.total_hours, 5.5);
    assert_eq!(stats.participation_count, 2);
    assert_eq!(stats.last_activity_id, Some(2));
    assert_eq!(stats.last_activity_name.as_deref(), Some("Activity 2"));
    assert_eq!(stats.next_update_due, t0() + Duration::hours(1));
}

#[tokio::test]
async fn test_recompute_twice_is_stable() {
    let state = test_state();
    state.store.upsert_user(&test_user(1, t0())).await.unwrap();
    complete(&state, 1, 1, t0() - Duration::days(3), 95).await;
    let aggregator = aggregator(&state);

    let first = aggregator.recompute(1, t0()).await.unwrap();
    let second = aggregator
        .recompute(1, t0() + Duration::minutes(1))
        .await
        .unwrap();

    assert_eq!(first.total_hours, second.total_hours);
    assert_eq!(first.participation_count, second.participation_count);
    assert_eq!(state.store.count_user_stats().await.unwrap(), 1);
}

#[tokio::test]
async fn test_fresh_cache_is_served_unchanged() {
    let state = test_state();
    let due = t0() + Duration::hours(1);

    // Stored ranks deliberately disagree with the hours, so a re-rank would show.
    for (id, hours, rank) in [(1u64, 1.0, 1u32), (2, 9.0, 2), (3, 5.0, 3)] {
        let mut stats = UserStats::new(&test_user(id, t0() - Duration::days(30)), t0());
        stats.total_hours = hours;
        stats.rank = rank;
        stats.next_update_due = due;
        state.store.upsert_user_stats(&stats).await.unwrap();
    }

    let page = state
        .ranking_service
        .get_page(1, 10, 2, t0() + Duration::minutes(30))
        .await
        .unwrap();

    let order: Vec<(u64, u32)> = page.rankings.iter().map(|r| (r.user_id, r.rank)).collect();
    assert_eq!(order, vec![(1, 1), (2, 2), (3, 3)]);
    assert_eq!(page.current_user.map(|c| c.rank), Some(2));

    for row in state.store.list_all_user_stats().await.unwrap() {
        assert_eq!(row.updated_at, t0(), "user {} was recomputed", row.user_id);
    }
}

#[tokio::test]
async fn test_expired_cache_is_refreshed_and_reranked() {
    let state = test_state();
    for id in 1..=3u64 {
        state
            .store
            .upsert_user(&test_user(id, t0() - Duration::days(id as i64)))
            .await
            .unwrap();
        state
            .store
            .upsert_user_stats(&UserStats::new(
                &test_user(id, t0() - Duration::days(id as i64)),
                t0(),
            ))
            .await
            .unwrap();
    }
    complete(&state, 1, 1, t0() - Duration::days(1), 60).await;
    complete(&state, 2, 1, t0() - Duration::days(1), 180).await;

    let page = state
        .ranking_service
        .get_page(1, 10, 3, t0() + Duration::minutes(1))
        .await
        .unwrap();

    let order: Vec<(u64, u32, f64)> = page
        .rankings
        .iter()
        .map(|r| (r.user_id, r.rank, r.total_hours))
        .collect();
    assert_eq!(order, vec![(2, 1, 3.0), (1, 2, 1.0), (3, 3, 0.0)]);
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn test_ranks_are_dense_and_ordered() {
    let state = test_state();
    let aggregator = aggregator(&state);
    let minutes = [90, 30, 90, 0, 240, 30, 60];

    for (i, &m) in minutes.iter().enumerate() {
        let id = i as u64 + 1;
        // Later IDs joined earlier.
        state
            .store
            .upsert_user(&test_user(id, t0() - Duration::days(id as i64)))
            .await
            .unwrap();
        if m > 0 {
            complete(&state, id, 1, t0() - Duration::days(1), m).await;
        }
        aggregator.recompute(id, t0()).await.unwrap();
    }

    aggregator.recompute_all_ranks().await.unwrap();

    let mut rows = state.store.list_all_user_stats().await.unwrap();
    rows.sort_by_key(|s| s.rank);

    let ranks: Vec<u32> = rows.iter().map(|s| s.rank).collect();
    assert_eq!(ranks, (1..=minutes.len() as u32).collect::<Vec<_>>());

    for pair in rows.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.total_hours >= b.total_hours);
        if a.total_hours == b.total_hours {
            assert!(a.join_date <= b.join_date);
        }
    }

    // Equal hours: user 3 joined before user 1.
    let pos = |id: u64| rows.iter().position(|s| s.user_id == id).unwrap();
    assert!(pos(3) < pos(1));
    assert!(pos(6) < pos(2));
}

#[tokio::test]
async fn test_unranked_rows_trigger_rank_pass() {
    let state = test_state();
    let aggregator = aggregator(&state);
    state.store.upsert_user(&test_user(1, t0())).await.unwrap();
    aggregator.recompute(1, t0()).await.unwrap();
    assert_eq!(state.store.get_user_stats(1).await.unwrap().unwrap().rank, 0);

    // Fresh but unranked: the read still assigns a rank.
    let page = state
        .ranking_service
        .get_page(1, 10, 1, t0() + Duration::minutes(5))
        .await
        .unwrap();

    assert_eq!(page.rankings[0].rank, 1);
    assert_eq!(state.store.get_user_stats(1).await.unwrap().unwrap().rank, 1);
}

#[tokio::test]
async fn test_row_without_profile_does_not_block_leaderboard() {
    let state = test_state();
    state.store.upsert_user(&test_user(1, t0())).await.unwrap();
    complete(&state, 1, 1, t0() - Duration::days(1), 60).await;
    aggregator(&state).recompute(1, t0()).await.unwrap();

    // User 2 has a stale cache row but no profile any more.
    let mut orphan = UserStats::new(&test_user(2, t0() - Duration::days(400)), t0());
    orphan.total_hours = 4.0;
    orphan.next_update_due = t0();
    state.store.upsert_user_stats(&orphan).await.unwrap();
    complete(&state, 2, 1, t0() - Duration::days(1), 240).await;

    for now in [t0() + Duration::minutes(1), t0() + Duration::hours(5)] {
        let page = state
            .ranking_service
            .get_page(1, 10, 1, now)
            .await
            .unwrap();

        let order: Vec<(u64, u32)> = page.rankings.iter().map(|r| (r.user_id, r.rank)).collect();
        assert_eq!(order, vec![(2, 1), (1, 2)]);
        assert_eq!(page.rankings[0].username, "volunteer2");
    }
}
