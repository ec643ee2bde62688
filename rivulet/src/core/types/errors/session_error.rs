use thiserror::Error;

use super::backend_error::BackendError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No active session")]
    Unauthenticated,

    #[error("Room with code {0} not found")]
    RoomCodeNotFound(String),

    #[error("Session already closed")]
    Closed,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
