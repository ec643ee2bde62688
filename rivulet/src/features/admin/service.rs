use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::backend::client::DataAccess;
use crate::core::entities::models::UserProfile;
use crate::core::types::errors::admin_error::AdminError;
use crate::core::types::errors::auth_error::AuthError;
use crate::core::types::responses::admin_response::{
    AdminUserOverview, AudioCaptureView, CaptureReport, ImageCaptureView,
};
use crate::features::auth::service::AuthService;
use crate::features::user::repository::UserRepository;

use super::repository::CaptureRepository;

/// The workflow has no read path to auth emails.
pub const PLACEHOLDER_EMAIL: &str = "hidden@example.com";

#[async_trait]
pub trait AdminService: Send + Sync {
    async fn list_users(&self) -> Result<Vec<AdminUserOverview>, AdminError>;

    /// Loads the three capture categories independently; a failed category
    /// comes back empty instead of blocking the others.
    async fn load_capture_data(&self, user_id: &str) -> Result<CaptureReport, AdminError>;
}

#[derive(Clone)]
pub struct AdminServiceImpl<A, C, U>
where
    A: AuthService,
    C: CaptureRepository,
    U: UserRepository,
{
    backend: Arc<dyn DataAccess>,
    auth_service: A,
    capture_repository: C,
    user_repository: U,
    capture_bucket: String,
}

impl<A, C, U> AdminServiceImpl<A, C, U>
where
    A: AuthService,
    C: CaptureRepository,
    U: UserRepository,
{
    pub fn new(
        backend: Arc<dyn DataAccess>,
        auth_service: A,
        capture_repository: C,
        user_repository: U,
        capture_bucket: String,
    ) -> Self {
        Self {
            backend,
            auth_service,
            capture_repository,
            user_repository,
            capture_bucket,
        }
    }

    /// Checked before any read; callers are redirected away on failure.
    async fn require_admin(&self) -> Result<UserProfile, AdminError> {
        let user = self.auth_service.current_user().await.map_err(|err| match err {
            AuthError::Unauthenticated => AdminError::NotPermitted,
            AuthError::Backend(err) => AdminError::Backend(err),
        })?;

        if !user.is_admin() {
            warn!(user_id = %user.user_id, "admin access denied");
            return Err(AdminError::NotPermitted);
        }

        Ok(user)
    }
}

#[async_trait]
impl<A, C, U> AdminService for AdminServiceImpl<A, C, U>
where
    A: AuthService,
    C: CaptureRepository,
    U: UserRepository,
{
    async fn list_users(&self) -> Result<Vec<AdminUserOverview>, AdminError> {
        self.require_admin().await?;

        let profiles = self.user_repository.list_profiles().await?;
        let overviews = profiles
            .into_iter()
            .map(|profile| AdminUserOverview {
                profile,
                email: PLACEHOLDER_EMAIL.to_string(),
            })
            .collect();

        Ok(overviews)
    }

    async fn load_capture_data(&self, user_id: &str) -> Result<CaptureReport, AdminError> {
        self.require_admin().await?;

        let (images, audio, locations) = tokio::join!(
            self.capture_repository.recent_images(user_id),
            self.capture_repository.recent_audio(user_id),
            self.capture_repository.recent_locations(user_id),
        );

        let images = images
            .unwrap_or_else(|err| {
                warn!(user_id, "image capture load failed: {err}");
                Vec::new()
            })
            .into_iter()
            .map(|record| {
                let url = self
                    .backend
                    .get_public_url(&self.capture_bucket, &record.storage_path);
                ImageCaptureView { record, url }
            })
            .collect();

        let audio = audio
            .unwrap_or_else(|err| {
                warn!(user_id, "audio capture load failed: {err}");
                Vec::new()
            })
            .into_iter()
            .map(|record| {
                let url = self
                    .backend
                    .get_public_url(&self.capture_bucket, &record.storage_path);
                AudioCaptureView { record, url }
            })
            .collect();

        let locations = locations.unwrap_or_else(|err| {
            warn!(user_id, "location capture load failed: {err}");
            Vec::new()
        });

        Ok(CaptureReport {
            images,
            audio,
            locations,
        })
    }
}
