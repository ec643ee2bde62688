use thiserror::Error;

use super::backend_error::BackendError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No active session")]
    Unauthenticated,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
