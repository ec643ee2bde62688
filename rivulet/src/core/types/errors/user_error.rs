use thiserror::Error;

use super::backend_error::BackendError;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Profile for user {0} not found")]
    ProfileNotFound(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
