// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users and activities (read, plus upserts for the admin side)
//! - Participations (registration, cancel and check-out run in transactions)
//! - User stats (leaderboard cache rows and batched rank writes)

use super::{ensure_status, Store, CHECK_OUT_FROM};
use crate::db::collections;
use crate::error::AppError;
use crate::models::{Activity, Participation, ParticipationStatus, User, UserStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use firestore::{
    FirestoreConsistencySelector, FirestoreQueryDirection, FirestoreTimestamp,
    FirestoreTransaction, FirestoreWritePrecondition,
};
use serde::{Deserialize, Serialize};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Field-masked write of a single rank.
#[derive(Serialize, Deserialize)]
struct RankUpdate {
    rank: u32,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn begin(&self) -> Result<FirestoreTransaction<'_>, AppError> {
        self.get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))
    }

    /// Add a `current_participants` increment to a transaction.
    fn add_participant_delta(
        &self,
        transaction: &mut FirestoreTransaction<'_>,
        activity_id: u64,
        delta: i64,
    ) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(activity_id.to_string())
            .transforms(|t| t.fields([t.field("current_participants").increment(delta)]))
            .only_transform()
            .add_to_transaction(transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add counter to transaction: {}", e))
            })?;
        Ok(())
    }

    fn add_participation(
        &self,
        transaction: &mut FirestoreTransaction<'_>,
        participation: &Participation,
        precondition: FirestoreWritePrecondition,
    ) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::PARTICIPATIONS)
            .precondition(precondition)
            .document_id(&participation.id)
            .object(participation)
            .add_to_transaction(transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add participation to transaction: {}", e))
            })?;
        Ok(())
    }

    /// Read the stored participation inside `transaction` and check its status.
    ///
    /// The read registers the document with the transaction, so a concurrent
    /// change to it makes the commit fail instead of being overwritten.
    async fn guard_participation<'a>(
        &'a self,
        transaction: FirestoreTransaction<'a>,
        participation: &Participation,
        allowed: &[ParticipationStatus],
    ) -> Result<FirestoreTransaction<'a>, AppError> {
        let stored: Option<Participation> = self
            .get_client()?
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
            .fluent()
            .select()
            .by_id_in(collections::PARTICIPATIONS)
            .obj()
            .one(&participation.id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read participation in transaction: {}", e))
            })?;

        if let Err(e) = ensure_status(stored.as_ref(), allowed) {
            tracing::debug!(
                user_id = participation.user_id,
                activity_id = participation.activity_id,
                error = %e,
                "Participation changed concurrently, rolling back"
            );
            let _ = transaction.rollback().await;
            return Err(e);
        }
        Ok(transaction)
    }

    async fn commit(transaction: FirestoreTransaction<'_>) -> Result<(), AppError> {
        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
        Ok(())
    }

    async fn query_participations(
        &self,
        user_id: u64,
        completed_only: bool,
    ) -> Result<Vec<Participation>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PARTICIPATIONS);

        let query = if completed_only {
            query.filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id as i64),
                    q.field("status").eq("completed"),
                ])
            })
        } else {
            query
                .filter(move |q| q.field("user_id").eq(user_id as i64))
                .order_by([(
                    "registration_time",
                    FirestoreQueryDirection::Descending,
                )])
        };

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user.id.to_string())
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Activity Operations ─────────────────────────────────────

    async fn get_activity(&self, activity_id: u64) -> Result<Option<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(&activity_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_activity(&self, activity: &Activity) -> Result<(), AppError> {
        activity.validate()?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(activity.id.to_string())
            .object(activity)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Participation Operations ────────────────────────────────

    async fn get_participation(
        &self,
        user_id: u64,
        activity_id: u64,
    ) -> Result<Option<Participation>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PARTICIPATIONS)
            .obj()
            .one(&Participation::doc_id(user_id, activity_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The `exists=false` precondition on the deterministic document ID is the
    /// uniqueness constraint; a second registration fails at commit.
    async fn create_registration(&self, participation: &Participation) -> Result<(), AppError> {
        let mut transaction = self.begin().await?;

        self.add_participation(
            &mut transaction,
            participation,
            FirestoreWritePrecondition::Exists(false),
        )?;
        self.add_participant_delta(&mut transaction, participation.activity_id, 1)?;

        transaction.commit().await.map_err(|e| match e {
            FirestoreError::DataConflictError(_) => AppError::AlreadyRegistered {
                activity_id: participation.activity_id,
            },
            other => AppError::Database(format!("Transaction commit failed: {}", other)),
        })?;

        tracing::debug!(
            user_id = participation.user_id,
            activity_id = participation.activity_id,
            "Registration committed"
        );
        Ok(())
    }

    async fn cancel_registration(&self, participation: &Participation) -> Result<(), AppError> {
        let transaction = self.begin().await?;
        let mut transaction = self
            .guard_participation(transaction, participation, &[ParticipationStatus::Registered])
            .await?;

        self.add_participation(
            &mut transaction,
            participation,
            FirestoreWritePrecondition::Exists(true),
        )?;
        self.add_participant_delta(&mut transaction, participation.activity_id, -1)?;

        Self::commit(transaction).await
    }

    async fn record_check_in(&self, participation: &Participation) -> Result<(), AppError> {
        let transaction = self.begin().await?;
        let mut transaction = self
            .guard_participation(transaction, participation, &[ParticipationStatus::Registered])
            .await?;

        self.add_participation(
            &mut transaction,
            participation,
            FirestoreWritePrecondition::Exists(true),
        )?;

        Self::commit(transaction).await
    }

    async fn save_participation(&self, participation: &Participation) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PARTICIPATIONS)
            .document_id(&participation.id)
            .object(participation)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn complete_participation(
        &self,
        participation: &Participation,
        stats: &UserStats,
    ) -> Result<(), AppError> {
        let transaction = self.begin().await?;
        let mut transaction = self
            .guard_participation(transaction, participation, CHECK_OUT_FROM)
            .await?;

        self.add_participation(
            &mut transaction,
            participation,
            FirestoreWritePrecondition::Exists(true),
        )?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_STATS)
            .document_id(stats.user_id.to_string())
            .object(stats)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add stats to transaction: {}", e))
            })?;

        Self::commit(transaction).await?;

        tracing::debug!(
            user_id = participation.user_id,
            activity_id = participation.activity_id,
            total_hours = stats.total_hours,
            "Check-out and stats committed atomically"
        );
        Ok(())
    }

    async fn list_participations_for_user(
        &self,
        user_id: u64,
    ) -> Result<Vec<Participation>, AppError> {
        self.query_participations(user_id, false).await
    }

    async fn list_completed_participations(
        &self,
        user_id: u64,
    ) -> Result<Vec<Participation>, AppError> {
        self.query_participations(user_id, true).await
    }

    // ─── User Stats Operations ──────────────────────────────────

    async fn get_user_stats(&self, user_id: u64) -> Result<Option<UserStats>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_STATS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_user_stats(&self, stats: &UserStats) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_STATS)
            .document_id(stats.user_id.to_string())
            .object(stats)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_stale_stats_users(&self, now: DateTime<Utc>) -> Result<Vec<u64>, AppError> {
        let stale: Vec<UserStats> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USER_STATS)
            .filter(move |q| {
                q.field("next_update_due")
                    .less_than_or_equal(FirestoreTimestamp(now))
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(stale.into_iter().map(|s| s.user_id).collect())
    }

    async fn list_all_user_stats(&self) -> Result<Vec<UserStats>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USER_STATS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_ranks(&self, ranks: &[(u64, u32)]) -> Result<(), AppError> {
        let client = self.get_client()?;

        for chunk in ranks.chunks(BATCH_SIZE) {
            let mut transaction = self.begin().await?;

            for &(user_id, rank) in chunk {
                client
                    .fluent()
                    .update()
                    .fields(["rank"])
                    .in_col(collections::USER_STATS)
                    .document_id(user_id.to_string())
                    .object(&RankUpdate { rank })
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add rank to transaction: {}", e))
                    })?;
            }

            transaction
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("Failed to commit ranks: {}", e)))?;
        }

        Ok(())
    }

    async fn count_user_stats(&self) -> Result<u64, AppError> {
        Ok(self.list_all_user_stats().await?.len() as u64)
    }

    async fn list_user_stats_by_rank(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<UserStats>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USER_STATS)
            .order_by([("rank", FirestoreQueryDirection::Ascending)])
            .offset(offset)
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn has_unranked_stats(&self) -> Result<bool, AppError> {
        let unranked: Vec<UserStats> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USER_STATS)
            .filter(|q| q.field("rank").eq(0i64))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(!unranked.is_empty())
    }
}
