use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::backend::client::DataAccess;
use crate::core::entities::models::UserProfile;
use crate::core::types::errors::user_error::UserError;
use crate::core::utils::id_utils::generate_object_key;

use super::repository::UserRepository;

#[async_trait]
pub trait UserService: Send + Sync {
    async fn update_display_name(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> Result<UserProfile, UserError>;

    /// Stores the avatar bytes and points the profile at their public URL.
    async fn upload_avatar(&self, user_id: &str, bytes: Vec<u8>)
    -> Result<UserProfile, UserError>;
}

#[derive(Clone)]
pub struct UserServiceImpl<U: UserRepository> {
    backend: Arc<dyn DataAccess>,
    user_repository: U,
    avatar_bucket: String,
}

impl<U: UserRepository> UserServiceImpl<U> {
    pub fn new(backend: Arc<dyn DataAccess>, user_repository: U, avatar_bucket: String) -> Self {
        Self {
            backend,
            user_repository,
            avatar_bucket,
        }
    }

    async fn require_profile(&self, user_id: &str) -> Result<UserProfile, UserError> {
        self.user_repository
            .get_profile(user_id)
            .await?
            .ok_or_else(|| UserError::ProfileNotFound(user_id.to_string()))
    }
}

#[async_trait]
impl<U: UserRepository> UserService for UserServiceImpl<U> {
    async fn update_display_name(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> Result<UserProfile, UserError> {
        let mut profile = self.require_profile(user_id).await?;
        profile.display_name = display_name.to_string();

        let profile = self.user_repository.upsert_profile(profile).await?;
        Ok(profile)
    }

    async fn upload_avatar(
        &self,
        user_id: &str,
        bytes: Vec<u8>,
    ) -> Result<UserProfile, UserError> {
        let mut profile = self.require_profile(user_id).await?;

        let key = format!("{user_id}/{}", generate_object_key());
        let path = self
            .backend
            .upload_object(&self.avatar_bucket, &key, bytes)
            .await?;
        let url = self.backend.get_public_url(&self.avatar_bucket, &path);

        info!(user_id, %url, "avatar uploaded");

        profile.avatar = Some(url);
        let profile = self.user_repository.upsert_profile(profile).await?;
        Ok(profile)
    }
}
