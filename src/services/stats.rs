// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stats aggregation service.
//!
//! Rebuilds a volunteer's `UserStats` row from their completed
//! participations and assigns the global dense rank.

use crate::db::DynStore;
use crate::error::{AppError, Result};
use crate::models::stats::assign_ranks;
use crate::models::{Participation, UserStats};
use chrono::{DateTime, Duration, Utc};

#[derive(Clone)]
pub struct StatsAggregator {
    store: DynStore,
    ttl: Duration,
}

impl StatsAggregator {
    pub fn new(store: DynStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Build the user's refreshed stats row without writing it.
    ///
    /// `overlay` replaces the stored copy of the same participation, so a
    /// check-out that has not been committed yet is already counted.
    pub async fn build(
        &self,
        user_id: u64,
        overlay: Option<&Participation>,
        now: DateTime<Utc>,
    ) -> Result<UserStats> {
        let user = self.store.get_user(user_id).await?;

        let mut stats = match (self.store.get_user_stats(user_id).await?, user) {
            (Some(mut existing), Some(user)) => {
                // Profile fields may have changed since the row was created.
                existing.username = user.username;
                existing.join_date = user.join_date;
                existing
            }
            (Some(existing), None) => {
                tracing::warn!(user_id, "User profile missing, keeping cached profile fields");
                existing
            }
            (None, Some(user)) => UserStats::new(&user, now),
            (None, None) => {
                return Err(AppError::NotFound(format!("User {} not found", user_id)));
            }
        };

        let mut history = self.store.list_completed_participations(user_id).await?;
        if let Some(p) = overlay {
            history.retain(|existing| existing.activity_id != p.activity_id);
            history.push(p.clone());
        }

        let previous_activity = stats.last_activity_id;
        stats.apply_completed(&history, now, self.ttl);

        // Activities can be renamed, so the name is always re-read.
        if let Some(activity_id) = stats.last_activity_id {
            match self.store.get_activity(activity_id).await? {
                Some(activity) => stats.last_activity_name = Some(activity.name),
                None if previous_activity != Some(activity_id) => stats.last_activity_name = None,
                None => {}
            }
        }

        Ok(stats)
    }

    /// Recompute and persist one user's stats row.
    ///
    /// Safe to repeat: the result depends only on participation history.
    pub async fn recompute(&self, user_id: u64, now: DateTime<Utc>) -> Result<UserStats> {
        let stats = self.build(user_id, None, now).await?;
        self.store.upsert_user_stats(&stats).await?;

        tracing::debug!(
            user_id,
            total_hours = stats.total_hours,
            participation_count = stats.participation_count,
            "User stats recomputed"
        );
        Ok(stats)
    }

    /// Re-rank every stats row and persist the ranks that moved.
    ///
    /// Returns the number of rows whose rank changed.
    pub async fn recompute_all_ranks(&self) -> Result<usize> {
        let mut rows = self.store.list_all_user_stats().await?;
        let changed = assign_ranks(&mut rows);

        if !changed.is_empty() {
            self.store.set_ranks(&changed).await?;
        }

        tracing::info!(
            total = rows.len(),
            changed = changed.len(),
            "Ranks recomputed"
        );
        Ok(changed.len())
    }
}
