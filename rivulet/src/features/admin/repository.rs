use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::client::{DataAccess, from_rows};
use crate::backend::query::Query;
use crate::core::entities::models::{CaptureAudio, CaptureImage, CaptureLocation};
use crate::core::types::errors::backend_error::BackendError;

pub const CAPTURE_IMAGES_TABLE: &str = "capture_images";
pub const CAPTURE_AUDIO_TABLE: &str = "capture_audio";
pub const CAPTURE_LOCATIONS_TABLE: &str = "capture_locations";

pub const IMAGE_CAPTURE_LIMIT: usize = 20;
pub const AUDIO_CAPTURE_LIMIT: usize = 20;
pub const LOCATION_CAPTURE_LIMIT: usize = 50;

#[async_trait]
pub trait CaptureRepository: Send + Sync {
    async fn recent_images(&self, user_id: &str) -> Result<Vec<CaptureImage>, BackendError>;

    async fn recent_audio(&self, user_id: &str) -> Result<Vec<CaptureAudio>, BackendError>;

    async fn recent_locations(&self, user_id: &str)
    -> Result<Vec<CaptureLocation>, BackendError>;
}

#[derive(Clone)]
pub struct CaptureRepositoryImpl {
    backend: Arc<dyn DataAccess>,
}

impl CaptureRepositoryImpl {
    pub fn new(backend: Arc<dyn DataAccess>) -> Self {
        Self { backend }
    }

    fn recent(user_id: &str, limit: usize) -> Query {
        Query::new()
            .eq("user_id", user_id)
            .order_desc("created_at")
            .limit(limit)
    }
}

#[async_trait]
impl CaptureRepository for CaptureRepositoryImpl {
    async fn recent_images(&self, user_id: &str) -> Result<Vec<CaptureImage>, BackendError> {
        let rows = self
            .backend
            .select(
                CAPTURE_IMAGES_TABLE,
                Self::recent(user_id, IMAGE_CAPTURE_LIMIT),
            )
            .await?;
        from_rows(rows)
    }

    async fn recent_audio(&self, user_id: &str) -> Result<Vec<CaptureAudio>, BackendError> {
        let rows = self
            .backend
            .select(
                CAPTURE_AUDIO_TABLE,
                Self::recent(user_id, AUDIO_CAPTURE_LIMIT),
            )
            .await?;
        from_rows(rows)
    }

    async fn recent_locations(
        &self,
        user_id: &str,
    ) -> Result<Vec<CaptureLocation>, BackendError> {
        let rows = self
            .backend
            .select(
                CAPTURE_LOCATIONS_TABLE,
                Self::recent(user_id, LOCATION_CAPTURE_LIMIT),
            )
            .await?;
        from_rows(rows)
    }
}
