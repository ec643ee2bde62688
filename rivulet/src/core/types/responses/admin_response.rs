use serde::Serialize;

use crate::core::entities::models::{CaptureAudio, CaptureImage, CaptureLocation, UserProfile};

#[derive(Debug, Serialize, Clone)]
pub struct AdminUserOverview {
    #[serde(flatten)]
    pub profile: UserProfile,
    /// The workflow has no read path to auth emails; always a placeholder.
    pub email: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct ImageCaptureView {
    #[serde(flatten)]
    pub record: CaptureImage,
    pub url: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct AudioCaptureView {
    #[serde(flatten)]
    pub record: CaptureAudio,
    pub url: String,
}

/// Per-user capture review data. Categories load independently; a category
/// whose read failed comes back empty.
#[derive(Debug, Serialize, Clone, Default)]
pub struct CaptureReport {
    pub images: Vec<ImageCaptureView>,
    pub audio: Vec<AudioCaptureView>,
    pub locations: Vec<CaptureLocation>,
}
