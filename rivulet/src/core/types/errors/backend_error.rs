use thiserror::Error;

/// Any failure surfaced by the data-access collaborator, wrapped with the
/// underlying message.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(String),

    #[error("failed to decode backend row: {0}")]
    Decode(String),

    #[error("authentication request rejected: {0}")]
    Auth(String),

    #[error("object storage operation failed: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
