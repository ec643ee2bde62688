use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::backend::client::{DataAccess, from_row, from_rows, to_row};
use crate::backend::query::Query;
use crate::core::entities::models::UserProfile;
use crate::core::types::errors::backend_error::BackendError;

pub const PROFILES_TABLE: &str = "profiles";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, BackendError>;

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, BackendError>;

    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile, BackendError>;

    /// Enrichment lookup: a missing or unreadable profile degrades to the
    /// "Anonymous" placeholder instead of failing the caller.
    async fn get_profile_or_anonymous(&self, user_id: &str) -> UserProfile {
        match self.get_profile(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => UserProfile::anonymous(user_id),
            Err(err) => {
                debug!(user_id, "profile enrichment failed: {err}");
                UserProfile::anonymous(user_id)
            }
        }
    }
}

#[derive(Clone)]
pub struct UserRepositoryImpl {
    backend: Arc<dyn DataAccess>,
}

impl UserRepositoryImpl {
    pub fn new(backend: Arc<dyn DataAccess>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, BackendError> {
        let rows = self
            .backend
            .select(
                PROFILES_TABLE,
                Query::new().eq("user_id", user_id).limit(1),
            )
            .await?;

        rows.into_iter().next().map(from_row).transpose()
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, BackendError> {
        let rows = self
            .backend
            .select(PROFILES_TABLE, Query::new().order_desc("created_at"))
            .await?;

        from_rows(rows)
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile, BackendError> {
        let row = self
            .backend
            .upsert(PROFILES_TABLE, to_row(&profile)?, &["user_id"])
            .await?;

        from_row(row)
    }
}
