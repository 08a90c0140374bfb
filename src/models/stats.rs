//! Per-volunteer service-hour aggregates backing the leaderboard.
//!
//! Rows are a cache: everything here can be rebuilt from participation
//! history, so they are refreshed lazily once `next_update_due` passes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{Participation, ParticipationStatus, User};
use crate::time_utils::round_hours;

/// Pre-computed statistics for a user.
///
/// Stored at: `user_stats/{user_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: u64,
    /// Denormalized from the user profile for display
    pub username: String,
    /// Denormalized from the user profile; ranking tie-break
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub join_date: DateTime<Utc>,

    // ─── Totals ──────────────────────────────────────────────────
    #[serde(default)]
    pub total_hours: f64,
    #[serde(default)]
    pub participation_count: u32,

    // ─── Most recent completion ──────────────────────────────────
    pub last_activity_id: Option<u64>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub last_activity_date: Option<DateTime<Utc>>,
    pub last_activity_name: Option<String>,

    // ─── Ranking ─────────────────────────────────────────────────
    /// 1-based dense rank; 0 until the first full ranking pass
    #[serde(default)]
    pub rank: u32,

    // ─── Cache metadata ──────────────────────────────────────────
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub next_update_due: DateTime<Utc>,
}

impl UserStats {
    /// Empty, unranked row for a user. Due immediately.
    pub fn new(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            join_date: user.join_date,
            total_hours: 0.0,
            participation_count: 0,
            last_activity_id: None,
            last_activity_date: None,
            last_activity_name: None,
            rank: 0,
            updated_at: now,
            next_update_due: now,
        }
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_update_due
    }

    /// Replace totals from a user's participations.
    ///
    /// Only completed participations count. The most recent check-out wins
    /// the `last_activity_*` fields; `last_activity_name` is left for the
    /// caller, which owns the activity lookup. Rank is untouched.
    pub fn apply_completed(
        &mut self,
        participations: &[Participation],
        now: DateTime<Utc>,
        ttl: Duration,
    ) {
        let mut completed: Vec<&Participation> = participations
            .iter()
            .filter(|p| p.status == ParticipationStatus::Completed)
            .collect();
        completed.sort_by(|a, b| b.check_out_time().cmp(&a.check_out_time()));

        self.total_hours = round_hours(completed.iter().map(|p| p.participation_hours).sum());
        self.participation_count = completed.len() as u32;

        match completed.first() {
            Some(latest) => {
                if self.last_activity_id != Some(latest.activity_id) {
                    self.last_activity_name = None;
                }
                self.last_activity_id = Some(latest.activity_id);
                self.last_activity_date = latest.check_out_time();
            }
            None => {
                self.last_activity_id = None;
                self.last_activity_date = None;
                self.last_activity_name = None;
            }
        }

        self.updated_at = now;
        self.next_update_due = now + ttl;
    }
}

/// Leaderboard order: most hours first, earlier joiners win ties.
///
/// User ID is the last resort so the order is total.
pub fn rank_order(a: &UserStats, b: &UserStats) -> Ordering {
    b.total_hours
        .total_cmp(&a.total_hours)
        .then_with(|| a.join_date.cmp(&b.join_date))
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Sort rows into leaderboard order and assign dense 1-based ranks.
///
/// Returns the `(user_id, rank)` pairs whose rank changed.
pub fn assign_ranks(stats: &mut [UserStats]) -> Vec<(u64, u32)> {
    stats.sort_by(rank_order);
    let mut changed = Vec::new();
    for (index, row) in stats.iter_mut().enumerate() {
        let rank = index as u32 + 1;
        if row.rank != rank {
            row.rank = rank;
            changed.push((row.user_id, rank));
        }
    }
    changed
}
