//! Database layer.
//!
//! Services talk to storage through the [`Store`] trait. `FirestoreDb` is the
//! production backend; `MemoryStore` backs tests and local runs.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use self::memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Activity, Participation, ParticipationStatus, User, UserStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ACTIVITIES: &str = "activities";
    /// Keyed by `{activity_id}_{user_id}`
    pub const PARTICIPATIONS: &str = "participations";
    /// Leaderboard cache (keyed by user_id)
    pub const USER_STATS: &str = "user_stats";
}

/// Statuses a check-out may overwrite.
const CHECK_OUT_FROM: &[ParticipationStatus] =
    &[ParticipationStatus::Registered, ParticipationStatus::Completed];

/// Reject a write when the stored participation moved on to another status.
fn ensure_status(
    stored: Option<&Participation>,
    allowed: &[ParticipationStatus],
) -> Result<(), AppError> {
    match stored {
        None => Err(AppError::NotFound("Participation not found".to_string())),
        Some(p) if allowed.contains(&p.status) => Ok(()),
        Some(p) => Err(AppError::InvalidState {
            status: p.status.to_string(),
        }),
    }
}

/// Shared handle to the configured store.
pub type DynStore = Arc<dyn Store>;

/// Storage operations used by the participation and ranking services.
///
/// Implementations must provide:
/// - a uniqueness guarantee on (user, activity) participations
/// - atomic counter updates on `current_participants`
/// - an atomic write of a completed participation together with its stats row
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Users (written by the account service) ──────────────────
    async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError>;
    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    // ─── Activities (written by the admin service) ───────────────
    async fn get_activity(&self, activity_id: u64) -> Result<Option<Activity>, AppError>;
    async fn upsert_activity(&self, activity: &Activity) -> Result<(), AppError>;

    // ─── Participations ──────────────────────────────────────────
    async fn get_participation(
        &self,
        user_id: u64,
        activity_id: u64,
    ) -> Result<Option<Participation>, AppError>;

    /// Insert a new participation and increment the activity's counter.
    ///
    /// Fails with `AppError::AlreadyRegistered` if the pair already exists.
    async fn create_registration(&self, participation: &Participation) -> Result<(), AppError>;

    /// Persist a cancelled participation and decrement the activity's counter.
    ///
    /// The stored copy must still be `registered`, otherwise
    /// `AppError::InvalidState` is returned and nothing is written.
    async fn cancel_registration(&self, participation: &Participation) -> Result<(), AppError>;

    /// Persist a check-in. The stored copy must still be `registered`.
    async fn record_check_in(&self, participation: &Participation) -> Result<(), AppError>;

    /// Write a participation as-is, without any status guard (imports and fixtures).
    async fn save_participation(&self, participation: &Participation) -> Result<(), AppError>;

    /// Persist a checked-out participation and the owner's recomputed stats together.
    ///
    /// The stored copy must be `registered` or `completed`.
    async fn complete_participation(
        &self,
        participation: &Participation,
        stats: &UserStats,
    ) -> Result<(), AppError>;

    /// All participations of a user, newest registration first.
    async fn list_participations_for_user(
        &self,
        user_id: u64,
    ) -> Result<Vec<Participation>, AppError>;

    /// Completed participations of a user (any order).
    async fn list_completed_participations(
        &self,
        user_id: u64,
    ) -> Result<Vec<Participation>, AppError>;

    // ─── User Stats ──────────────────────────────────────────────
    async fn get_user_stats(&self, user_id: u64) -> Result<Option<UserStats>, AppError>;
    async fn upsert_user_stats(&self, stats: &UserStats) -> Result<(), AppError>;

    /// User IDs whose stats are due (`next_update_due <= now`).
    async fn list_stale_stats_users(&self, now: DateTime<Utc>) -> Result<Vec<u64>, AppError>;

    async fn list_all_user_stats(&self) -> Result<Vec<UserStats>, AppError>;

    /// Write ranks for many users in batches.
    async fn set_ranks(&self, ranks: &[(u64, u32)]) -> Result<(), AppError>;

    async fn count_user_stats(&self) -> Result<u64, AppError>;

    /// One page of stats ordered by rank ascending.
    async fn list_user_stats_by_rank(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<UserStats>, AppError>;

    /// Whether any row is still waiting for its first ranking pass.
    async fn has_unranked_stats(&self) -> Result<bool, AppError>;
}
