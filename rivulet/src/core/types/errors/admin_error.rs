use thiserror::Error;

use super::backend_error::BackendError;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Only the admin role has permission")]
    NotPermitted,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
