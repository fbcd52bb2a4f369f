// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile and aggregate stats)
//! - Episode progress (one document per user, series and episode)

use crate::db::{
    collections, progress_doc_id, ProgressStore, RankField, SetValue, UserSetField,
};
use crate::error::AppError;
use crate::models::user::SCALAR_FIELDS;
use crate::models::{ContentId, EpisodeProgress, User, UserStatus};

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
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
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
}

impl ProgressStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(AppError::from)
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(AppError::from)?;
        tracing::info!(uid = %user.uid, "Created user document");
        Ok(())
    }

    /// Masked write: set fields are not in the mask and survive untouched.
    async fn update_user_scalars(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(SCALAR_FIELDS)
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    /// Uses the `appendMissingElements` transform, so two concurrent grants of
    /// the same value collapse into one array entry server-side.
    async fn append_to_user_set(
        &self,
        uid: &str,
        field: UserSetField,
        value: SetValue,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let field_name = field.field_name();

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let update = client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid);

        let update = match value {
            SetValue::Badge(badge_id) => update.transforms(move |t| {
                t.fields([t
                    .field(field_name)
                    .append_missing_elements([badge_id.clone()])])
            }),
            SetValue::Series(series_id) => update.transforms(move |t| {
                t.fields([t
                    .field(field_name)
                    .append_missing_elements([series_id.0])])
            }),
        };

        update
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add set append to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::debug!(uid, field = field_name, "Appended to user set");
        Ok(())
    }

    // ─── Progress Operations ─────────────────────────────────────

    async fn get_progress(
        &self,
        uid: &str,
        series_id: ContentId,
        episode_id: ContentId,
    ) -> Result<Option<EpisodeProgress>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::EPISODE_PROGRESS)
            .obj()
            .one(&progress_doc_id(uid, series_id, episode_id))
            .await
            .map_err(AppError::from)
    }

    async fn put_progress(&self, record: &EpisodeProgress) -> Result<(), AppError> {
        let doc_id = progress_doc_id(&record.uid, record.series_id, record.episode_id);
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::EPISODE_PROGRESS)
            .document_id(&doc_id)
            .object(record)
            .execute()
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn list_series_progress(
        &self,
        uid: &str,
        series_id: ContentId,
    ) -> Result<Vec<EpisodeProgress>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::EPISODE_PROGRESS)
            .filter(|q| {
                q.for_all([
                    q.field("uid").eq(uid),
                    q.field("series_id").eq(series_id.0),
                ])
            })
            .order_by([("episode_id", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(AppError::from)
    }

    async fn list_recent_progress(
        &self,
        uid: &str,
        limit: u32,
    ) -> Result<Vec<EpisodeProgress>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::EPISODE_PROGRESS)
            .filter(|q| q.for_all([q.field("uid").eq(uid)]))
            // Most recent first
            .order_by([(
                "last_access",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(AppError::from)
    }

    async fn list_all_progress(&self, uid: &str) -> Result<Vec<EpisodeProgress>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::EPISODE_PROGRESS)
            .filter(|q| q.for_all([q.field("uid").eq(uid)]))
            .obj()
            .query()
            .await
            .map_err(AppError::from)
    }

    // ─── Ranking ─────────────────────────────────────────────────

    /// Needs a composite index on (`status`, `<field>` desc), plus
    /// (`status`, `weekly_time_start`, `weekly_time_spent` desc) for the
    /// weekly board.
    async fn list_ranked_users(
        &self,
        field: RankField,
        week_key: Option<&str>,
        limit: u32,
    ) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| {
                q.for_all([
                    q.field("status").eq(UserStatus::Active),
                    week_key.and_then(|key| q.field("weekly_time_start").eq(key)),
                ])
            })
            .order_by([(
                field.field_name(),
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(AppError::from)
    }
}
