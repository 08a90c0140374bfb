// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::{RankingPage, UserRankDetail};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/rankings", get(get_rankings))
        .route("/api/rankings/user/{user_id}", get(get_user_detail))
        .route("/api/rankings/update", post(update_rankings))
}

#[derive(Deserialize)]
struct RankingsQuery {
    /// Pagination: page number (1-indexed)
    #[serde(default = "default_page")]
    page: u32,
    /// Pagination: items per page
    limit: Option<u32>,
}

fn default_page() -> u32 {
    1
}

async fn get_rankings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RankingsQuery>,
) -> Result<Json<RankingPage>> {
    let limit = params
        .limit
        .unwrap_or(state.config.default_page_size)
        .min(state.config.max_page_size);

    let page = state
        .ranking_service
        .get_page(params.page, limit, user.user_id, chrono::Utc::now())
        .await?;
    Ok(Json(page))
}

async fn get_user_detail(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
) -> Result<Json<UserRankDetail>> {
    let today = chrono::Utc::now().date_naive();
    let detail = state.ranking_service.user_detail(user_id, today).await?;
    Ok(Json(detail))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UpdateRankingsResponse {
    pub updated_count: u32,
}

/// Run the stale-stats sweep now instead of waiting for the next read.
async fn update_rankings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UpdateRankingsResponse>> {
    let updated = state
        .ranking_service
        .refresh_if_stale(chrono::Utc::now())
        .await?;
    tracing::info!(updated, "Manual ranking refresh");
    Ok(Json(UpdateRankingsResponse {
        updated_count: updated as u32,
    }))
}
