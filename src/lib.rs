// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Volunteer-Tracker: volunteer hours with geofenced attendance
//!
//! This crate provides the backend API for registering volunteers for
//! activities, validating check-in against an activity's geofence, and
//! ranking volunteers by accumulated service hours.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DynStore;
use services::{ParticipationService, RankingService, StatsAggregator};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: DynStore,
    pub participation_service: ParticipationService,
    pub ranking_service: RankingService,
}

impl AppState {
    /// Wire the services over a store.
    pub fn new(config: Config, store: DynStore) -> Self {
        let stats = StatsAggregator::new(store.clone(), config.stats_ttl());
        Self {
            participation_service: ParticipationService::new(store.clone(), stats.clone()),
            ranking_service: RankingService::new(store.clone(), stats),
            config,
            store,
        }
    }
}
