// Invidious HTTP client
//
// One shared reqwest::Client per instance (connection reuse). Video details
// are retried with backoff on server errors and network trouble; list
// endpoints fail fast and let the caller decide.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::ApiError;
use super::models::{
    from_api_json, Channel, ChannelItem, CommentPage, CommentResponse, SearchResult,
    VideoDetails, VideoItem, VideoSummary,
};
use super::traits::MetadataProvider;
use crate::settings::{AppSettings, NetworkConfig};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";

/// Attempts for /videos/{id} before giving up
const MAX_VIDEO_ATTEMPTS: u32 = 3;

/// Connection checks should answer quickly or not at all
const CONNECTION_TEST_TIMEOUT: Duration = Duration::from_secs(10);

lazy_static! {
    static ref ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

pub struct InvidiousClient {
    http: reqwest::Client,
    base_url: String,
    /// Backoff unit: timeouts wait attempt x unit, other failures 2 x attempt x unit
    retry_unit: Duration,
}

impl InvidiousClient {
    pub fn new(base_url: impl Into<String>, network: &NetworkConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(network.timeout);

        if let Some(proxy_url) = network.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| ApiError::InvalidInput(format!("proxy {}: {}", proxy_url, e)))?;
            info!("Using proxy: {}", proxy_url);
            builder = builder.proxy(proxy);
        } else if !network.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_unit: Duration::from_secs(1),
        })
    }

    pub fn from_settings(settings: &AppSettings, network: &NetworkConfig) -> Result<Self, ApiError> {
        Self::new(settings.api_base_url(), network)
    }

    pub fn with_retry_unit(mut self, unit: Duration) -> Self {
        self.retry_unit = unit;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = response.text().await?;
        debug!("Response length: {} chars", body.len());
        Ok(from_api_json(&body)?)
    }

    /// Probe `/api/v1/stats`; Ok when the instance answers with a 2xx
    pub async fn check_connection(&self) -> Result<(), ApiError> {
        let url = format!("{}/api/v1/stats", self.base_url);
        debug!("Testing connection: {}", url);

        let response = self
            .http
            .get(&url)
            .timeout(CONNECTION_TEST_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            info!("Connection to {} OK", self.base_url);
            Ok(())
        } else {
            Err(ApiError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            })
        }
    }

    pub async fn trending(&self, region: &str) -> Result<Vec<VideoItem>, ApiError> {
        let videos: Vec<VideoSummary> = self
            .get_json("/api/v1/trending", &[("region", region)])
            .await?;
        Ok(videos.iter().map(VideoSummary::to_video_item).collect())
    }

    /// Search; channels and playlists in the results are skipped
    pub async fn search(&self, query: &str) -> Result<Vec<VideoItem>, ApiError> {
        let results: Vec<SearchResult> = self.get_json("/api/v1/search", &[("q", query)]).await?;
        Ok(results
            .iter()
            .filter(|r| r.is_video())
            .map(SearchResult::to_video_item)
            .collect())
    }

    /// Video details with formats, retried on transient failures
    pub async fn video(&self, video_id: &str) -> Result<VideoItem, ApiError> {
        let path = format!("/api/v1/videos/{}", checked_id(video_id)?);
        let mut attempt = 1;

        loop {
            debug!("Fetching video details {} (attempt {})", video_id, attempt);

            match self.get_json::<VideoDetails>(&path, &[]).await {
                Ok(details) => {
                    info!(
                        title = %details.title,
                        combined = details.format_streams.len(),
                        adaptive = details.adaptive_formats.len(),
                        "Video details fetched"
                    );
                    return Ok(details.to_video_item(&self.base_url));
                }
                Err(e) if e.is_retryable() && attempt < MAX_VIDEO_ATTEMPTS => {
                    let delay = self.retry_delay(attempt, &e);
                    warn!("{} (attempt {}), retrying in {:?}", e, attempt, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn retry_delay(&self, attempt: u32, error: &ApiError) -> Duration {
        if error.is_timeout() {
            self.retry_unit * attempt
        } else {
            self.retry_unit * (2 * attempt)
        }
    }

    pub async fn channel(&self, channel_id: &str) -> Result<ChannelItem, ApiError> {
        let path = format!("/api/v1/channels/{}", checked_id(channel_id)?);
        let channel: Channel = self.get_json(&path, &[]).await?;
        debug!(
            "Channel {}: {} latest videos",
            channel.author,
            channel.latest_videos.len()
        );
        Ok(channel.to_channel_item())
    }

    pub async fn comments(
        &self,
        video_id: &str,
        continuation: Option<&str>,
    ) -> Result<CommentPage, ApiError> {
        let path = format!("/api/v1/comments/{}", checked_id(video_id)?);
        let query: Vec<(&str, &str)> = continuation
            .map(|token| vec![("continuation", token)])
            .unwrap_or_default();

        let response: CommentResponse = self.get_json(&path, &query).await?;
        Ok(CommentPage {
            comments: response.comments.iter().map(|c| c.to_comment_item()).collect(),
            continuation: response.continuation,
        })
    }

    pub fn thumbnail_url(&self, video_id: &str, quality: &str) -> String {
        format!("{}/vi/{}/{}.jpg", self.base_url, video_id, quality)
    }

    /// Server-proxied 360p combined stream
    pub fn stream_url(&self, video_id: &str) -> String {
        format!("{}/latest_version?id={}&itag=18", self.base_url, video_id)
    }

    pub fn embed_url(&self, video_id: &str) -> String {
        format!("{}/embed/{}", self.base_url, video_id)
    }

    pub fn watch_url(&self, video_id: &str) -> String {
        format!("{}/watch?v={}", self.base_url, video_id)
    }
}

#[async_trait]
impl MetadataProvider for InvidiousClient {
    fn name(&self) -> &'static str {
        "invidious"
    }

    async fn fetch_video(&self, video_id: &str) -> Result<VideoItem, ApiError> {
        self.video(video_id).await
    }
}

/// Ids go into URL paths; reject anything that is not a plain id
fn checked_id(id: &str) -> Result<&str, ApiError> {
    if ID_RE.is_match(id) {
        Ok(id)
    } else {
        Err(ApiError::InvalidInput(format!("bad id: {:?}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned response per connection, in order
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }

                let response = format!(
                    "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn client(base_url: &str) -> InvidiousClient {
        let network = NetworkConfig::default()
            .with_system_proxy(false)
            .with_timeout(Duration::from_secs(5));
        InvidiousClient::new(base_url, &network)
            .unwrap()
            .with_retry_unit(Duration::from_millis(1))
    }

    const VIDEO_JSON: &str = r#"{
        "videoId": "abc123",
        "title": "Test",
        "formatStreams": [
            {"url": "https://cdn/c22", "itag": "22", "type": "video/mp4", "qualityLabel": "720p"}
        ],
        "adaptiveFormats": [
            {"url": "https://cdn/v137", "itag": "137", "type": "video/mp4", "qualityLabel": "1080p", "bitrate": "4000000"}
        ]
    }"#;

    #[test]
    fn test_url_helpers() {
        let client = client("http://host:3000/");
        assert_eq!(client.base_url(), "http://host:3000");
        assert_eq!(
            client.thumbnail_url("abc", "mqdefault"),
            "http://host:3000/vi/abc/mqdefault.jpg"
        );
        assert_eq!(
            client.stream_url("abc"),
            "http://host:3000/latest_version?id=abc&itag=18"
        );
        assert_eq!(client.embed_url("abc"), "http://host:3000/embed/abc");
        assert_eq!(client.watch_url("abc"), "http://host:3000/watch?v=abc");
    }

    #[test]
    fn test_retry_delays() {
        let client = client("http://host").with_retry_unit(Duration::from_secs(1));
        let timeout = ApiError::Timeout("slow".to_string());
        let server = ApiError::Status {
            code: 503,
            reason: String::new(),
        };

        assert_eq!(client.retry_delay(1, &timeout), Duration::from_secs(1));
        assert_eq!(client.retry_delay(2, &timeout), Duration::from_secs(2));
        assert_eq!(client.retry_delay(1, &server), Duration::from_secs(2));
        assert_eq!(client.retry_delay(2, &server), Duration::from_secs(4));
    }

    #[test]
    fn test_checked_id() {
        assert!(checked_id("dQw4w9WgXcQ").is_ok());
        assert!(checked_id("UC-lHJZR3Gqxm24_Vd_AJ5Yw").is_ok());
        assert!(checked_id("").is_err());
        assert!(checked_id("../admin").is_err());
        assert!(checked_id("a?b=c").is_err());
    }

    #[tokio::test]
    async fn test_video_retries_server_error() {
        let (base, hits) = serve(vec![(503, "{}"), (200, VIDEO_JSON)]).await;

        let item = client(&base).video("abc123").await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(item.title, "Test");
        assert_eq!(item.available_qualities.len(), 2);
        assert_eq!(item.available_qualities[0].resolution_px, 1080);
    }

    #[tokio::test]
    async fn test_video_not_found_fails_fast() {
        let (base, hits) = serve(vec![(404, "{}")]).await;

        let err = client(&base).video("missing").await.unwrap_err();

        assert!(matches!(err, ApiError::Status { code: 404, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_video_gives_up_after_three_attempts() {
        let (base, hits) = serve(vec![(500, "{}"), (502, "{}"), (503, "{}")]).await;

        let err = client(&base).video("abc123").await.unwrap_err();

        assert!(matches!(err, ApiError::Status { code: 503, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_search_keeps_videos_only() {
        let body = r#"[
            {"type": "video", "videoId": "v1", "title": "One", "viewCount": 2000},
            {"type": "channel", "author": "Someone"}
        ]"#;
        let (base, _) = serve(vec![(200, body)]).await;

        let videos = client(&base).search("rust async").await.unwrap();

        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].views, "2.0K views");
    }

    #[tokio::test]
    async fn test_comments_page() {
        let body = r#"{
            "videoId": "v1",
            "comments": [{"author": "A", "content": "hi", "commentId": "c1"}],
            "continuation": "next-token"
        }"#;
        let (base, _) = serve(vec![(200, body)]).await;

        let page = client(&base).comments("v1", None).await.unwrap();

        assert_eq!(page.comments.len(), 1);
        assert_eq!(page.comments[0].content, "hi");
        assert_eq!(page.continuation.as_deref(), Some("next-token"));
    }

    #[tokio::test]
    async fn test_check_connection() {
        let (base, hits) = serve(vec![(200, r#"{"version":"2.0"}"#), (502, "{}")]).await;
        let client = client(&base);

        assert!(client.check_connection().await.is_ok());
        let err = client.check_connection().await.unwrap_err();
        assert!(matches!(err, ApiError::Status { code: 502, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_check_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = client(&base).check_connection().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let (base, hits) = serve(vec![(200, "not json")]).await;

        let err = client(&base).video("abc123").await.unwrap_err();

        assert!(matches!(err, ApiError::Parse(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
