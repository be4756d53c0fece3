// Glue between metadata and playback: pick what to play for a video

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::invidious::{ApiError, MetadataProvider, VideoItem};
use crate::selection::{FormatSelector, QualityOption, SelectionError};

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Everything the player needs to start a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRequest {
    pub video_url: String,
    /// Set only for adaptive options
    pub audio_url: Option<String>,
    pub title: Option<String>,
    /// Option actually played
    pub quality: QualityOption,
    /// Position of `quality` in the video's option list
    pub quality_index: usize,
}

/// Request for the option closest to `preferred_px`.
///
/// A video with no ranked qualities has nothing playable, whatever its
/// `stream_url` says, and yields `SelectionError::Empty`.
pub fn request_for(video: &VideoItem, preferred_px: u32) -> Result<PlaybackRequest, SelectionError> {
    let index = FormatSelector::select_closest(&video.available_qualities, preferred_px)
        .ok_or_else(|| {
            debug!(video_id = %video.id, "No playable renditions");
            SelectionError::Empty
        })?;
    request_for_index(video, index)
}

/// Request for an explicit choice from `available_qualities`
pub fn request_for_index(video: &VideoItem, index: usize) -> Result<PlaybackRequest, SelectionError> {
    let options = &video.available_qualities;
    let option = FormatSelector::resolve_playable(options, index)?;
    let resolved = options
        .iter()
        .position(|o| std::ptr::eq(o, option))
        .unwrap_or(index);

    info!(
        video_id = %video.id,
        quality = %option,
        separate_audio = option.has_separate_audio,
        "Selected quality"
    );

    Ok(PlaybackRequest {
        video_url: option.video_url.clone(),
        audio_url: if option.has_separate_audio {
            option.audio_url.clone()
        } else {
            None
        },
        title: title_of(video),
        quality: option.clone(),
        quality_index: resolved,
    })
}

/// Fetch a video and build the request for its preferred quality
pub async fn prepare_playback(
    provider: &dyn MetadataProvider,
    video_id: &str,
    preferred_px: u32,
) -> Result<(VideoItem, PlaybackRequest), PrepareError> {
    debug!(provider = provider.name(), video_id, "Preparing playback");
    let video = provider.fetch_video(video_id).await?;
    let request = request_for(&video, preferred_px)?;
    Ok((video, request))
}

fn title_of(video: &VideoItem) -> Option<String> {
    Some(video.title.clone()).filter(|t| !t.is_empty())
}
