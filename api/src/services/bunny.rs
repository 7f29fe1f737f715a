//! Bunny CDN client: Stream API for video containers and transcoding
//! status, Storage API for thumbnail objects.
//!
//! All binary payload transfer happens client-side; this module only
//! creates containers, hands out upload endpoints, and mutates/deletes
//! CDN-side resources.

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::constants::THUMBNAIL_PREFIX;

/// Stream API status code that marks a video as fully transcoded
pub const VIDEO_STATUS_PROCESSED: i32 = 4;

/// Terminal "processed" check for a Stream status code
pub fn is_processed(status: i32) -> bool {
    status == VIDEO_STATUS_PROCESSED
}

/// Object key for a video's thumbnail: `thumbnails/{millis}-{guid}-thumbnail`
pub fn thumbnail_object_key(video_id: &str, now_millis: i64) -> String {
    format!("{}/{}-{}-thumbnail", THUMBNAIL_PREFIX, now_millis, video_id)
}

/// Recover a thumbnail object key from its public CDN URL.
/// Returns None for URLs that don't point into the thumbnail folder.
pub fn thumbnail_key_from_url(cdn_url: &str) -> Option<String> {
    let marker = format!("{}/", THUMBNAIL_PREFIX);
    cdn_url
        .split_once(&marker)
        .map(|(_, rest)| format!("{}{}", marker, rest))
}

/// Configuration for the Bunny Stream + Storage APIs, read from the
/// environment in main
#[derive(Clone)]
pub struct BunnyConfig {
    /// Stream library the videos live in
    pub library_id: String,
    /// AccessKey for the Stream API
    pub stream_access_key: String,
    /// AccessKey for the Storage zone
    pub storage_access_key: String,
    /// Stream API base, e.g. `https://video.bunnycdn.com/library`
    pub stream_base_url: String,
    /// Storage zone base, e.g. `https://storage.bunnycdn.com/kast-media`
    pub storage_base_url: String,
    /// Public pull-zone base for stored objects
    pub cdn_base_url: String,
    /// Embed player base, e.g. `https://iframe.mediadelivery.net/embed`
    pub embed_base_url: String,
    /// Per-library delivery host serving auto-generated captions
    pub transcript_base_url: String,
}

#[derive(Clone)]
pub struct BunnyClient {
    config: BunnyConfig,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct CreatedVideo {
    guid: String,
}

/// Processing info for a Stream video
#[derive(Debug, Deserialize)]
pub struct VideoProcessingInfo {
    pub status: i32,
    #[serde(rename = "encodeProgress")]
    pub encode_progress: Option<i32>,
}

impl BunnyClient {
    pub fn new(config: BunnyConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn stream_video_url(&self, video_id: &str) -> String {
        format!(
            "{}/{}/videos/{}",
            self.config.stream_base_url, self.config.library_id, video_id
        )
    }

    /// Create a video container and return its CDN-assigned GUID
    pub async fn create_video(&self, title: &str) -> Result<String, BunnyError> {
        let url = format!(
            "{}/{}/videos",
            self.config.stream_base_url, self.config.library_id
        );

        let resp = self
            .http
            .post(&url)
            .header("AccessKey", &self.config.stream_access_key)
            .json(&serde_json::json!({ "title": title, "collectionId": "" }))
            .send()
            .await?;

        let created: CreatedVideo = Self::read_json(resp).await?;
        Ok(created.guid)
    }

    /// Endpoint the caller PUTs the video binary to, authorized with the
    /// stream access key
    pub fn upload_url(&self, video_id: &str) -> String {
        self.stream_video_url(video_id)
    }

    pub fn stream_access_key(&self) -> &str {
        &self.config.stream_access_key
    }

    pub fn storage_access_key(&self) -> &str {
        &self.config.storage_access_key
    }

    /// Fetch processing status for a video
    pub async fn get_video(&self, video_id: &str) -> Result<VideoProcessingInfo, BunnyError> {
        let resp = self
            .http
            .get(self.stream_video_url(video_id))
            .header("AccessKey", &self.config.stream_access_key)
            .send()
            .await?;

        Self::read_json(resp).await
    }

    /// Push the final title/description onto the video container
    pub async fn update_video(
        &self,
        video_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), BunnyError> {
        let resp = self
            .http
            .post(self.stream_video_url(video_id))
            .header("AccessKey", &self.config.stream_access_key)
            .json(&serde_json::json!({ "title": title, "description": description }))
            .send()
            .await?;

        Self::expect_success(resp).await
    }

    /// Delete the video container. A 404 means the asset is already gone
    /// and is treated as success.
    pub async fn delete_video(&self, video_id: &str) -> Result<(), BunnyError> {
        let resp = self
            .http
            .delete(self.stream_video_url(video_id))
            .header("AccessKey", &self.config.stream_access_key)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::expect_success(resp).await
    }

    /// Storage endpoint the caller PUTs a thumbnail binary to
    pub fn thumbnail_upload_url(&self, object_key: &str) -> String {
        format!("{}/{}", self.config.storage_base_url, object_key)
    }

    /// Public read URL for a stored thumbnail
    pub fn thumbnail_cdn_url(&self, object_key: &str) -> String {
        format!("{}/{}", self.config.cdn_base_url, object_key)
    }

    /// Delete a thumbnail object from storage, tolerating 404
    pub async fn delete_thumbnail(&self, object_key: &str) -> Result<(), BunnyError> {
        let resp = self
            .http
            .delete(self.thumbnail_upload_url(object_key))
            .header("AccessKey", &self.config.storage_access_key)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::expect_success(resp).await
    }

    /// Playback URL stored on the video row
    pub fn embed_url(&self, video_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.embed_base_url, self.config.library_id, video_id
        )
    }

    /// Fetch auto-generated captions for a video. Best-effort: any
    /// non-success response yields None rather than an error.
    pub async fn fetch_transcript(&self, video_id: &str) -> Result<Option<String>, BunnyError> {
        let url = format!(
            "{}/{}/captions/en-auto.vtt",
            self.config.transcript_base_url, video_id
        );

        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        Ok(Some(resp.text().await?))
    }

    async fn expect_success(resp: reqwest::Response) -> Result<(), BunnyError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BunnyError::Api { status, body });
        }
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, BunnyError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BunnyError::Api { status, body });
        }
        Ok(resp.json().await?)
    }
}

#[derive(Debug)]
pub enum BunnyError {
    Http(reqwest::Error),
    Api { status: StatusCode, body: String },
}

impl From<reqwest::Error> for BunnyError {
    fn from(e: reqwest::Error) -> Self {
        BunnyError::Http(e)
    }
}

impl std::fmt::Display for BunnyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BunnyError::Http(e) => write!(f, "HTTP error: {}", e),
            BunnyError::Api { status, body } => {
                write!(f, "Bunny API error {}: {}", status, body)
            }
        }
    }
}

impl std::error::Error for BunnyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_status_mapping() {
        assert!(is_processed(4));
        assert!(!is_processed(0));
        assert!(!is_processed(3));
    }

    #[test]
    fn test_thumbnail_object_key_format() {
        assert_eq!(
            thumbnail_object_key("abc-123", 1733500000000),
            "thumbnails/1733500000000-abc-123-thumbnail"
        );
    }

    #[test]
    fn test_thumbnail_key_recovered_from_cdn_url() {
        let key = thumbnail_object_key("abc-123", 1733500000000);
        let cdn_url = format!("https://kast.b-cdn.net/{}", key);
        assert_eq!(thumbnail_key_from_url(&cdn_url), Some(key));
    }

    #[test]
    fn test_thumbnail_key_missing_prefix() {
        assert_eq!(thumbnail_key_from_url("https://kast.b-cdn.net/other"), None);
    }
}
