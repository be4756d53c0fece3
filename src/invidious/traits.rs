// Metadata provider trait definition

use async_trait::async_trait;

use super::errors::ApiError;
use super::models::VideoItem;

/// Source of per-video metadata (formats, title, recommendations)
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Name of the provider (for logging)
    fn name(&self) -> &'static str;

    /// Fetch full details, including ranked quality options
    async fn fetch_video(&self, video_id: &str) -> Result<VideoItem, ApiError>;
}
