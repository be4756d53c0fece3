// Invidious API models and the domain items built from them
//
// Wire structs mirror the JSON returned by /api/v1 (camelCase fields, every
// field optional in practice). Domain items are what the rest of the app
// consumes: display strings are pre-formatted and qualities are ranked.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::selection::{FormatSelector, QualityOption};

// ---------------------------------------------------------------------------
// Wire models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thumbnail {
    pub quality: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Single-file stream with both audio and video (`formatStreams`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CombinedFormat {
    pub url: String,
    #[serde(deserialize_with = "string_or_number")]
    pub itag: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub container: String,
    pub quality_label: String,
}

/// Audio-only or video-only stream (`adaptiveFormats`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdaptiveFormat {
    pub url: String,
    #[serde(deserialize_with = "string_or_number")]
    pub itag: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub container: String,
    pub encoding: String,
    pub quality_label: Option<String>,
    /// Bits per second; the API sends this as a string
    #[serde(deserialize_with = "lenient_u64")]
    pub bitrate: u64,
    pub resolution: Option<String>,
    pub fps: u32,
}

impl AdaptiveFormat {
    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }
}

/// Entry of /trending and a channel's latest videos
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoSummary {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub author_id: String,
    pub view_count: u64,
    pub view_count_text: String,
    pub length_seconds: u64,
    pub published: i64,
    pub published_text: String,
    pub video_thumbnails: Vec<Thumbnail>,
    pub description: String,
    pub is_new: bool,
    pub is_4k: bool,
    pub live_now: bool,
}

impl VideoSummary {
    pub fn to_video_item(&self) -> VideoItem {
        VideoItem {
            id: self.video_id.clone(),
            title: self.title.clone(),
            channel: self.author.clone(),
            channel_id: self.author_id.clone(),
            views: views_text(&self.view_count_text, self.view_count),
            duration: format_duration(self.length_seconds),
            thumbnail_url: pick_thumbnail(&self.video_thumbnails),
            description: self.description.clone(),
            published_text: self.published_text.clone(),
            is_new: self.is_new,
            is_4k: self.is_4k,
            is_live: self.live_now,
            ..VideoItem::default()
        }
    }
}

/// Entry of /search; only `type == "video"` results are videos
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResult {
    #[serde(rename = "type")]
    pub kind: String,
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub author_id: String,
    pub author_verified: bool,
    pub view_count: u64,
    pub view_count_text: String,
    pub length_seconds: u64,
    pub published_text: String,
    pub video_thumbnails: Vec<Thumbnail>,
    pub description: String,
    pub is_new: bool,
    pub is_4k: bool,
    pub live_now: bool,
}

impl SearchResult {
    pub fn is_video(&self) -> bool {
        self.kind == "video"
    }

    pub fn to_video_item(&self) -> VideoItem {
        VideoItem {
            id: self.video_id.clone(),
            title: self.title.clone(),
            channel: self.author.clone(),
            channel_id: self.author_id.clone(),
            views: views_text(&self.view_count_text, self.view_count),
            duration: format_duration(self.length_seconds),
            thumbnail_url: pick_thumbnail(&self.video_thumbnails),
            description: self.description.clone(),
            published_text: self.published_text.clone(),
            is_verified: self.author_verified,
            is_new: self.is_new,
            is_4k: self.is_4k,
            is_live: self.live_now,
            ..VideoItem::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendedVideo {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub author_id: String,
    pub author_verified: bool,
    pub length_seconds: u64,
    pub view_count: u64,
    pub view_count_text: String,
    pub video_thumbnails: Vec<Thumbnail>,
}

impl RecommendedVideo {
    pub fn to_video_item(&self) -> VideoItem {
        VideoItem {
            id: self.video_id.clone(),
            title: self.title.clone(),
            channel: self.author.clone(),
            channel_id: self.author_id.clone(),
            views: self.view_count_text.clone(),
            duration: format_duration(self.length_seconds),
            thumbnail_url: pick_thumbnail(&self.video_thumbnails),
            is_verified: self.author_verified,
            ..VideoItem::default()
        }
    }
}

/// Full response of /api/v1/videos/{id}
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub author_id: String,
    pub view_count: u64,
    pub view_count_text: String,
    pub length_seconds: u64,
    pub published_text: String,
    pub video_thumbnails: Vec<Thumbnail>,
    pub author_thumbnails: Vec<Thumbnail>,
    pub description: String,
    pub like_count: u64,
    pub dislike_count: u64,
    pub adaptive_formats: Vec<AdaptiveFormat>,
    pub format_streams: Vec<CombinedFormat>,
    pub dash_url: String,
    pub recommended_videos: Vec<RecommendedVideo>,
}

impl VideoDetails {
    /// Build the domain item; `base_url` is used for the proxy stream fallback
    pub fn to_video_item(&self, base_url: &str) -> VideoItem {
        debug!(
            video_id = %self.video_id,
            combined = self.format_streams.len(),
            adaptive = self.adaptive_formats.len(),
            "Converting video details"
        );

        VideoItem {
            id: self.video_id.clone(),
            title: self.title.clone(),
            channel: self.author.clone(),
            channel_id: self.author_id.clone(),
            channel_thumbnail_url: pick_author_thumbnail(&self.author_thumbnails),
            views: views_text(&self.view_count_text, self.view_count),
            duration: format_duration(self.length_seconds),
            thumbnail_url: pick_thumbnail(&self.video_thumbnails),
            description: self.description.clone(),
            published_text: self.published_text.clone(),
            like_count: self.like_count,
            stream_url: FormatSelector::best_stream_url(
                &self.format_streams,
                &self.adaptive_formats,
                base_url,
                &self.video_id,
            ),
            available_qualities: FormatSelector::build_quality_list(
                &self.format_streams,
                &self.adaptive_formats,
            ),
            recommended_videos: self
                .recommended_videos
                .iter()
                .map(RecommendedVideo::to_video_item)
                .collect(),
            ..VideoItem::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Channel {
    pub author: String,
    pub author_id: String,
    pub author_url: String,
    pub author_verified: bool,
    pub author_banners: Vec<Thumbnail>,
    pub author_thumbnails: Vec<Thumbnail>,
    pub sub_count: u64,
    pub total_views: u64,
    pub joined: i64,
    pub auto_generated: bool,
    pub description: String,
    pub latest_videos: Vec<VideoSummary>,
}

impl Channel {
    pub fn to_channel_item(&self) -> ChannelItem {
        let thumbnail_url = pick_author_thumbnail(&self.author_thumbnails);

        ChannelItem {
            id: self.author_id.clone(),
            name: self.author.clone(),
            description: self.description.clone(),
            thumbnail_url,
            banner_url: self
                .author_banners
                .first()
                .map(|t| t.url.clone())
                .unwrap_or_default(),
            subscriber_count: self.sub_count,
            // The API has no video total; the latest page is what we know
            video_count: self.latest_videos.len() as u64,
            latest_videos: self
                .latest_videos
                .iter()
                .map(VideoSummary::to_video_item)
                .collect(),
            verified: self.author_verified,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    pub author: String,
    pub author_thumbnails: Vec<Thumbnail>,
    pub author_id: String,
    pub is_edited: bool,
    pub is_pinned: bool,
    pub content: String,
    pub published: i64,
    pub published_text: String,
    pub like_count: u64,
    pub comment_id: String,
    pub author_is_channel_owner: bool,
}

impl Comment {
    pub fn to_comment_item(&self) -> CommentItem {
        let author_thumbnail_url = self
            .author_thumbnails
            .iter()
            .find(|t| t.width == 48 || t.quality == "medium")
            .or_else(|| self.author_thumbnails.first())
            .map(|t| t.url.clone())
            .unwrap_or_default();

        CommentItem {
            id: self.comment_id.clone(),
            author: self.author.clone(),
            author_id: self.author_id.clone(),
            author_thumbnail_url,
            content: self.content.clone(),
            published_text: self.published_text.clone(),
            like_count: self.like_count,
            is_author_channel_owner: self.author_is_channel_owner,
            is_pinned: self.is_pinned,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentResponse {
    pub comment_count: Option<u64>,
    pub video_id: String,
    pub comments: Vec<Comment>,
    pub continuation: Option<String>,
}

// ---------------------------------------------------------------------------
// Domain items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub channel_id: String,
    pub channel_thumbnail_url: String,
    pub views: String,
    pub duration: String,
    pub thumbnail_url: String,
    pub description: String,
    pub published_text: String,
    pub like_count: u64,
    /// Default single stream; playback goes through `available_qualities`
    pub stream_url: String,
    pub available_qualities: Vec<QualityOption>,
    pub recommended_videos: Vec<VideoItem>,
    pub is_verified: bool,
    pub is_new: bool,
    pub is_4k: bool,
    pub is_live: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub thumbnail_url: String,
    pub banner_url: String,
    pub subscriber_count: u64,
    pub video_count: u64,
    pub latest_videos: Vec<VideoItem>,
    pub verified: bool,
}

impl ChannelItem {
    pub fn subscriber_count_text(&self) -> String {
        let n = self.subscriber_count;
        if n >= 1_000_000 {
            format!("{:.1}M subscribers", n as f64 / 1_000_000.0)
        } else if n >= 1_000 {
            format!("{:.1}K subscribers", n as f64 / 1_000.0)
        } else {
            format!("{} subscribers", n)
        }
    }

    pub fn video_count_text(&self) -> String {
        format!("{} videos", self.video_count)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentItem {
    pub id: String,
    pub author: String,
    pub author_id: String,
    pub author_thumbnail_url: String,
    pub content: String,
    pub published_text: String,
    pub like_count: u64,
    pub is_author_channel_owner: bool,
    pub is_pinned: bool,
}

impl CommentItem {
    pub fn like_count_text(&self) -> String {
        if self.like_count > 0 {
            format!("{} likes", self.like_count)
        } else {
            String::new()
        }
    }
}

/// One page of comments plus the token for the next one
#[derive(Debug, Clone, Default)]
pub struct CommentPage {
    pub comments: Vec<CommentItem>,
    pub continuation: Option<String>,
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// "1.5B views", "2.3M views", "4.1K views", "12 views"
pub fn format_views(views: u64) -> String {
    match views {
        v if v >= 1_000_000_000 => format!("{:.1}B views", v as f64 / 1_000_000_000.0),
        v if v >= 1_000_000 => format!("{:.1}M views", v as f64 / 1_000_000.0),
        v if v >= 1_000 => format!("{:.1}K views", v as f64 / 1_000.0),
        v => format!("{} views", v),
    }
}

/// "1:02:03" for an hour or more, "4:05" otherwise
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

fn views_text(server_text: &str, count: u64) -> String {
    if server_text.is_empty() {
        format_views(count)
    } else {
        server_text.to_string()
    }
}

fn pick_thumbnail(thumbnails: &[Thumbnail]) -> String {
    thumbnails
        .iter()
        .find(|t| t.quality == "medium" || t.quality == "mqdefault")
        .or_else(|| thumbnails.first())
        .map(|t| t.url.clone())
        .unwrap_or_default()
}

fn pick_author_thumbnail(thumbnails: &[Thumbnail]) -> String {
    thumbnails
        .iter()
        .find(|t| t.quality == "medium")
        .or_else(|| thumbnails.first())
        .map(|t| t.url.clone())
        .unwrap_or_default()
}

/// Parse an API body, treating explicit `null`s like missing keys.
///
/// Every wire struct is `#[serde(default)]`, so dropping null members (and
/// null array entries) lets a sparse response fall back to defaults instead
/// of failing as a whole.
pub fn from_api_json<T: DeserializeOwned>(body: &str) -> Result<T, serde_json::Error> {
    let mut value: Value = serde_json::from_str(body)?;
    strip_nulls(&mut value);
    serde_json::from_value(value)
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => {
            items.retain(|v| !v.is_null());
            items.iter_mut().for_each(strip_nulls);
        }
        _ => {}
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Unparsable bitrates count as 0 rather than failing the whole response
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().parse().unwrap_or(0),
        Value::Number(n) => n.as_u64().unwrap_or(0),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_views() {
        assert_eq!(format_views(12), "12 views");
        assert_eq!(format_views(4_100), "4.1K views");
        assert_eq!(format_views(2_345_678), "2.3M views");
        assert_eq!(format_views(1_500_000_000), "1.5B views");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(245), "4:05");
        assert_eq!(format_duration(3723), "1:02:03");
    }

    #[test]
    fn test_adaptive_format_bitrate_string_or_number() {
        let as_string: AdaptiveFormat = serde_json::from_value(json!({
            "url": "https://cdn/v1080",
            "itag": "137",
            "type": "video/mp4; codecs=\"avc1.640028\"",
            "qualityLabel": "1080p",
            "bitrate": "4400000"
        }))
        .unwrap();
        assert_eq!(as_string.bitrate, 4_400_000);
        assert!(as_string.is_video());

        let as_number: AdaptiveFormat = serde_json::from_value(json!({
            "url": "https://cdn/a140",
            "itag": 140,
            "type": "audio/mp4",
            "bitrate": 130000
        }))
        .unwrap();
        assert_eq!(as_number.itag, "140");
        assert_eq!(as_number.bitrate, 130_000);
        assert!(as_number.is_audio());
        assert!(as_number.quality_label.is_none());
    }

    #[test]
    fn test_video_details_conversion() {
        let details: VideoDetails = serde_json::from_value(json!({
            "videoId": "abc123",
            "title": "Test video",
            "author": "Someone",
            "authorId": "UC1",
            "viewCount": 1234,
            "lengthSeconds": 61,
            "authorThumbnails": [
                {"url": "https://img/author32.jpg", "width": 32},
                {"quality": "medium", "url": "https://img/author88.jpg", "width": 88}
            ],
            "videoThumbnails": [
                {"quality": "maxres", "url": "https://img/max.jpg"},
                {"quality": "medium", "url": "https://img/med.jpg"}
            ],
            "formatStreams": [
                {"url": "https://cdn/c720", "itag": "22", "type": "video/mp4", "qualityLabel": "720p"}
            ],
            "adaptiveFormats": [
                {"url": "https://cdn/v1080", "itag": "137", "type": "video/mp4", "qualityLabel": "1080p", "bitrate": "4000000"}
            ],
            "recommendedVideos": [
                {"videoId": "rec1", "title": "Next", "lengthSeconds": 3600, "viewCountText": "5 views"}
            ]
        }))
        .unwrap();

        let item = details.to_video_item("http://host");
        assert_eq!(item.id, "abc123");
        assert_eq!(item.views, "1.2K views");
        assert_eq!(item.duration, "1:01");
        assert_eq!(item.thumbnail_url, "https://img/med.jpg");
        assert_eq!(item.stream_url, "https://cdn/c720");
        assert_eq!(item.channel_thumbnail_url, "https://img/author88.jpg");
        assert_eq!(item.available_qualities.len(), 2);
        assert_eq!(item.recommended_videos[0].duration, "1:00:00");
        assert_eq!(item.recommended_videos[0].views, "5 views");
    }

    #[test]
    fn test_search_filters_by_type() {
        let results: Vec<SearchResult> = serde_json::from_value(json!([
            {"type": "video", "videoId": "v1", "title": "A"},
            {"type": "channel", "author": "Chan"},
            {"type": "playlist", "title": "P"}
        ]))
        .unwrap();

        let videos: Vec<VideoItem> = results
            .iter()
            .filter(|r| r.is_video())
            .map(SearchResult::to_video_item)
            .collect();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].id, "v1");
    }

    #[test]
    fn test_channel_conversion() {
        let channel: Channel = serde_json::from_value(json!({
            "author": "Chan",
            "authorId": "UC9",
            "subCount": 1_260_000,
            "authorThumbnails": [
                {"quality": "small", "url": "s.jpg"},
                {"quality": "medium", "url": "m.jpg"}
            ],
            "authorBanners": [{"url": "banner.jpg"}],
            "latestVideos": [{"videoId": "x"}, {"videoId": "y"}]
        }))
        .unwrap();

        let item = channel.to_channel_item();
        assert_eq!(item.thumbnail_url, "m.jpg");
        assert_eq!(item.banner_url, "banner.jpg");
        assert_eq!(item.subscriber_count_text(), "1.3M subscribers");
        assert_eq!(item.video_count_text(), "2 videos");
    }

    #[test]
    fn test_explicit_nulls_fall_back_to_defaults() {
        let body = r#"{
            "videoId": "abc123",
            "title": null,
            "viewCountText": null,
            "authorThumbnails": null,
            "videoThumbnails": [null, {"quality": "medium", "url": "https://img/m.jpg", "width": null}],
            "formatStreams": [
                {"url": "https://cdn/c360", "itag": 18, "type": "video/mp4", "qualityLabel": "360p", "container": null},
                {"url": "https://cdn/odd", "itag": "43", "type": "video/webm", "qualityLabel": null}
            ],
            "adaptiveFormats": [
                {"url": "https://cdn/v720", "itag": "136", "type": "video/mp4", "qualityLabel": "720p", "bitrate": null, "fps": null}
            ]
        }"#;

        let details: VideoDetails = from_api_json(body).unwrap();
        assert_eq!(details.title, "");
        assert_eq!(details.video_thumbnails.len(), 1);
        assert_eq!(details.video_thumbnails[0].width, 0);
        assert_eq!(details.format_streams[1].quality_label, "");
        assert_eq!(details.adaptive_formats[0].bitrate, 0);

        let item = details.to_video_item("http://host");
        assert_eq!(item.thumbnail_url, "https://img/m.jpg");
        assert_eq!(item.channel_thumbnail_url, "");
        let labels: Vec<&str> = item
            .available_qualities
            .iter()
            .map(|o| o.label.as_str())
            .collect();
        assert_eq!(labels, vec!["720p", "360p ✓"]);
    }

    #[test]
    fn test_comment_thumbnail_prefers_48px() {
        let comment: Comment = serde_json::from_value(json!({
            "author": "Viewer",
            "commentId": "c1",
            "likeCount": 3,
            "authorThumbnails": [
                {"url": "32.jpg", "width": 32},
                {"url": "48.jpg", "width": 48}
            ]
        }))
        .unwrap();

        let item = comment.to_comment_item();
        assert_eq!(item.author_thumbnail_url, "48.jpg");
        assert_eq!(item.like_count_text(), "3 likes");
    }
}
