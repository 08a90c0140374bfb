// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store backed by `DashMap`.
//!
//! Each map entry is guarded by its shard lock, so counter updates happen in
//! place and the participation insert uses the vacant-entry API as its
//! uniqueness constraint.

use super::{ensure_status, Store, CHECK_OUT_FROM};
use crate::error::AppError;
use crate::models::{Activity, Participation, ParticipationStatus, User, UserStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<u64, User>,
    activities: DashMap<u64, Activity>,
    /// Keyed by (user_id, activity_id)
    participations: DashMap<(u64, u64), Participation>,
    stats: DashMap<u64, UserStats>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a participation under its shard lock if its stored status allows it.
    fn replace_if(
        &self,
        participation: &Participation,
        allowed: &[ParticipationStatus],
    ) -> Result<(), AppError> {
        let key = (participation.user_id, participation.activity_id);
        let mut stored = self.participations.get_mut(&key);
        ensure_status(stored.as_deref(), allowed)?;
        if let Some(slot) = stored.as_deref_mut() {
            *slot = participation.clone();
        }
        Ok(())
    }

    fn adjust_participants(&self, activity_id: u64, delta: i32) -> Result<(), AppError> {
        let mut activity = self
            .activities
            .get_mut(&activity_id)
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", activity_id)))?;
        activity.current_participants = activity.current_participants.saturating_add_signed(delta);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_activity(&self, activity_id: u64) -> Result<Option<Activity>, AppError> {
        Ok(self.activities.get(&activity_id).map(|a| a.clone()))
    }

    async fn upsert_activity(&self, activity: &Activity) -> Result<(), AppError> {
        activity.validate()?;
        self.activities.insert(activity.id, activity.clone());
        Ok(())
    }

    async fn get_participation(
        &self,
        user_id: u64,
        activity_id: u64,
    ) -> Result<Option<Participation>, AppError> {
        Ok(self
            .participations
            .get(&(user_id, activity_id))
            .map(|p| p.clone()))
    }

    async fn create_registration(&self, participation: &Participation) -> Result<(), AppError> {
        let key = (participation.user_id, participation.activity_id);
        match self.participations.entry(key) {
            Entry::Occupied(_) => {
                return Err(AppError::AlreadyRegistered {
                    activity_id: participation.activity_id,
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(participation.clone());
            }
        }

        if let Err(e) = self.adjust_participants(participation.activity_id, 1) {
            self.participations.remove(&key);
            return Err(e);
        }
        Ok(())
    }

    async fn cancel_registration(&self, participation: &Participation) -> Result<(), AppError> {
        // Only one caller can move the row off `registered`, so the counter drops once.
        self.replace_if(participation, &[ParticipationStatus::Registered])?;
        self.adjust_participants(participation.activity_id, -1)
    }

    async fn record_check_in(&self, participation: &Participation) -> Result<(), AppError> {
        self.replace_if(participation, &[ParticipationStatus::Registered])
    }

    async fn save_participation(&self, participation: &Participation) -> Result<(), AppError> {
        self.participations.insert(
            (participation.user_id, participation.activity_id),
            participation.clone(),
        );
        Ok(())
    }

    async fn complete_participation(
        &self,
        participation: &Participation,
        stats: &UserStats,
    ) -> Result<(), AppError> {
        self.replace_if(participation, CHECK_OUT_FROM)?;
        self.stats.insert(stats.user_id, stats.clone());
        Ok(())
    }

    async fn list_participations_for_user(
        &self,
        user_id: u64,
    ) -> Result<Vec<Participation>, AppError> {
        let mut list: Vec<Participation> = self
            .participations
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.clone())
            .collect();
        list.sort_by(|a, b| b.registration_time.cmp(&a.registration_time));
        Ok(list)
    }

    async fn list_completed_participations(
        &self,
        user_id: u64,
    ) -> Result<Vec<Participation>, AppError> {
        Ok(self
            .participations
            .iter()
            .filter(|p| p.user_id == user_id && p.status == ParticipationStatus::Completed)
            .map(|p| p.clone())
            .collect())
    }

    async fn get_user_stats(&self, user_id: u64) -> Result<Option<UserStats>, AppError> {
        Ok(self.stats.get(&user_id).map(|s| s.clone()))
    }

    async fn upsert_user_stats(&self, stats: &UserStats) -> Result<(), AppError> {
        self.stats.insert(stats.user_id, stats.clone());
        Ok(())
    }

    async fn list_stale_stats_users(&self, now: DateTime<Utc>) -> Result<Vec<u64>, AppError> {
        Ok(self
            .stats
            .iter()
            .filter(|s| s.is_stale(now))
            .map(|s| s.user_id)
            .collect())
    }

    async fn list_all_user_stats(&self) -> Result<Vec<UserStats>, AppError> {
        Ok(self.stats.iter().map(|s| s.clone()).collect())
    }

    async fn set_ranks(&self, ranks: &[(u64, u32)]) -> Result<(), AppError> {
        for &(user_id, rank) in ranks {
            if let Some(mut row) = self.stats.get_mut(&user_id) {
                row.rank = rank;
            }
        }
        Ok(())
    }

    async fn count_user_stats(&self) -> Result<u64, AppError> {
        Ok(self.stats.len() as u64)
    }

    async fn list_user_stats_by_rank(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<UserStats>, AppError> {
        let mut rows: Vec<UserStats> = self.stats.iter().map(|s| s.clone()).collect();
        rows.sort_by_key(|s| (s.rank, s.user_id));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn has_unranked_stats(&self) -> Result<bool, AppError> {
        Ok(self.stats.iter().any(|s| s.rank == 0))
    }
}
