use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::backend::client::{AuthSession, DataAccess};
use crate::core::entities::models::{UserProfile, UserRole};
use crate::core::types::errors::auth_error::AuthError;

use crate::features::user::repository::UserRepository;

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Resolves the current session to a profile, or `Unauthenticated` when
    /// there is none.
    async fn current_user(&self) -> Result<UserProfile, AuthError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, AuthError>;

    async fn sign_in_with_provider(
        &self,
        provider: &str,
        id_token: &str,
    ) -> Result<UserProfile, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

#[derive(Clone)]
pub struct AuthServiceImpl<U: UserRepository> {
    backend: Arc<dyn DataAccess>,
    user_repository: U,
}

impl<U: UserRepository> AuthServiceImpl<U> {
    pub fn new(backend: Arc<dyn DataAccess>, user_repository: U) -> Self {
        Self {
            backend,
            user_repository,
        }
    }

    /// First sight of an authenticated user creates their profile row.
    async fn ensure_profile(&self, session: &AuthSession) -> Result<UserProfile, AuthError> {
        if let Some(profile) = self.user_repository.get_profile(&session.user_id).await? {
            return Ok(profile);
        }

        let profile = UserProfile {
            user_id: session.user_id.clone(),
            display_name: display_name_from_email(session.email.as_deref()),
            avatar: None,
            verified: false,
            role: UserRole::Member,
            created_at: Utc::now(),
        };

        info!(user_id = %profile.user_id, "creating profile on first sign-in");
        let profile = self.user_repository.upsert_profile(profile).await?;
        Ok(profile)
    }
}

fn display_name_from_email(email: Option<&str>) -> String {
    email
        .and_then(|email| email.split('@').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UserProfile::ANONYMOUS_NAME.to_string())
}

#[async_trait]
impl<U: UserRepository> AuthService for AuthServiceImpl<U> {
    async fn current_user(&self) -> Result<UserProfile, AuthError> {
        let session = self
            .backend
            .get_session()
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        self.ensure_profile(&session).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, AuthError> {
        let session = self.backend.sign_in_with_password(email, password).await?;
        self.ensure_profile(&session).await
    }

    async fn sign_in_with_provider(
        &self,
        provider: &str,
        id_token: &str,
    ) -> Result<UserProfile, AuthError> {
        let session = self
            .backend
            .sign_in_with_provider(provider, id_token)
            .await?;
        self.ensure_profile(&session).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.backend.sign_out().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_placeholder() {
        assert_eq!(display_name_from_email(Some("ada@example.com")), "ada");
        assert_eq!(display_name_from_email(Some("@example.com")), "Anonymous");
        assert_eq!(display_name_from_email(None), "Anonymous");
    }
}
