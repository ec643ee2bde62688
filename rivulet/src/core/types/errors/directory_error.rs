use thiserror::Error;

use super::backend_error::BackendError;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Invalid room input: {0}")]
    Validation(String),

    #[error("Room with code {0} not found")]
    RoomCodeNotFound(String),

    #[error("Room with ID {0} not found")]
    RoomNotFound(String),

    #[error("Room is password protected")]
    PasswordRequired,

    #[error("Password is not correct")]
    PasswordMismatch,

    #[error("Room is full (capacity {capacity})")]
    RoomFull { capacity: i32 },

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
