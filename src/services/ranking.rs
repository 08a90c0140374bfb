// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard read path.
//!
//! Stats rows are refreshed lazily: every read first recomputes the rows
//! whose `next_update_due` has passed, then re-ranks if anything moved.

use crate::db::DynStore;
use crate::error::{AppError, Result};
use crate::models::UserStats;
use crate::services::StatsAggregator;
use crate::time_utils::age_on;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankingEntry {
    pub rank: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    pub username: String,
    pub total_hours: f64,
}

impl From<&UserStats> for RankingEntry {
    fn from(stats: &UserStats) -> Self {
        Self {
            rank: stats.rank,
            user_id: stats.user_id,
            username: stats.username.clone(),
            total_hours: stats.total_hours,
        }
    }
}

/// A page of the leaderboard plus the caller's own position.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankingPage {
    pub rankings: Vec<RankingEntry>,
    /// None until the caller has a stats row
    pub current_user: Option<RankingEntry>,
    pub page: u32,
    pub total_pages: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total: u64,
}

/// Stats detail for one volunteer.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserRankDetail {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    pub username: String,
    pub age: Option<i32>,
    pub total_hours: f64,
    pub participation_count: u32,
    pub rank: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub last_activity_id: Option<u64>,
    pub last_activity_name: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub last_activity_date: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct RankingService {
    store: DynStore,
    stats: StatsAggregator,
}

impl RankingService {
    pub fn new(store: DynStore, stats: StatsAggregator) -> Self {
        Self { store, stats }
    }

    /// Recompute every expired stats row and re-rank if any were touched.
    ///
    /// Returns the number of rows recomputed. Concurrent callers may redo
    /// the same rows; the work is idempotent.
    pub async fn refresh_if_stale(&self, now: DateTime<Utc>) -> Result<usize> {
        let stale = self.store.list_stale_stats_users(now).await?;

        for &user_id in &stale {
            self.stats.recompute(user_id, now).await?;
        }

        if !stale.is_empty() {
            tracing::info!(count = stale.len(), "Refreshed stale user stats");
            self.stats.recompute_all_ranks().await?;
        }

        Ok(stale.len())
    }

    /// One page of the leaderboard, refreshed first.
    ///
    /// `page` is 1-based.
    pub async fn get_page(
        &self,
        page: u32,
        page_size: u32,
        current_user_id: u64,
        now: DateTime<Utc>,
    ) -> Result<RankingPage> {
        if page == 0 || page_size == 0 {
            return Err(AppError::BadRequest(
                "page and page size must be at least 1".to_string(),
            ));
        }

        let refreshed = self.refresh_if_stale(now).await?;
        if refreshed == 0 && self.store.has_unranked_stats().await? {
            self.stats.recompute_all_ranks().await?;
        }

        let total = self.store.count_user_stats().await?;
        let offset = (page - 1).saturating_mul(page_size);
        let rows = self.store.list_user_stats_by_rank(offset, page_size).await?;
        let current_user = self
            .store
            .get_user_stats(current_user_id)
            .await?
            .map(|s| RankingEntry::from(&s));

        tracing::debug!(page, page_size, total, "Serving ranking page");

        Ok(RankingPage {
            rankings: rows.iter().map(RankingEntry::from).collect(),
            current_user,
            page,
            total_pages: total.div_ceil(u64::from(page_size)) as u32,
            total,
        })
    }

    /// Stats detail for one volunteer, with age as of `today`.
    pub async fn user_detail(&self, user_id: u64, today: NaiveDate) -> Result<UserRankDetail> {
        let stats = self
            .store
            .get_user_stats(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No stats for user {}", user_id)))?;

        let age = self
            .store
            .get_user(user_id)
            .await?
            .and_then(|u| u.birthday)
            .map(|birthday| age_on(birthday, today));

        Ok(UserRankDetail {
            user_id,
            username: stats.username,
            age,
            total_hours: stats.total_hours,
            participation_count: stats.participation_count,
            rank: stats.rank,
            last_activity_id: stats.last_activity_id,
            last_activity_name: stats.last_activity_name,
            last_activity_date: stats.last_activity_date,
        })
    }
}
