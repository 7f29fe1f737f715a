//! Blocking API client for the Kast server and the CDN upload endpoints.

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

/// Errors that can occur while driving the upload pipeline.
#[derive(Debug)]
pub enum ApiError {
    Http(reqwest::Error),
    Io(std::io::Error),
    UnexpectedStatus { status: StatusCode, body: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Http(err) => write!(f, "http error: {err}"),
            ApiError::Io(err) => write!(f, "io error: {err}"),
            ApiError::UnexpectedStatus { status, body } => {
                write!(f, "unexpected status {status}: {body}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        ApiError::Http(value)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(value: std::io::Error) -> Self {
        ApiError::Io(value)
    }
}

/// Upload credentials for a freshly created CDN video container.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadCredentials {
    #[serde(rename = "videoId")]
    pub video_id: String,
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    #[serde(rename = "accessKey")]
    pub access_key: String,
}

/// Storage credentials for a derived thumbnail object key.
#[derive(Debug, Clone, Deserialize)]
pub struct ThumbnailCredentials {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    #[serde(rename = "cdnUrl")]
    pub cdn_url: String,
    #[serde(rename = "accessKey")]
    pub access_key: String,
}

/// Metadata persisted once both binaries are on the CDN.
#[derive(Debug, Serialize)]
pub struct SaveVideoRequest {
    #[serde(rename = "videoId")]
    pub video_id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,
    pub visibility: String,
    pub duration: i32,
}

/// Transcode status reported by the server's poll endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingStatus {
    #[serde(rename = "isProcessed")]
    pub is_processed: bool,
    #[serde(rename = "encodingProgress")]
    pub encoding_progress: i32,
    pub status: i32,
}

/// Blocking client that knows how to hit the Kast API and PUT binaries
/// straight to the CDN.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    api_token: String,
}

impl ApiClient {
    /// Create a client for the given API base URL and bearer token.
    /// No global timeout: recordings can be large and upload for minutes.
    pub fn new(base_url: impl Into<String>, api_token: String) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(None::<Duration>).build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            api_token,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(AUTHORIZATION, format!("Bearer {}", self.api_token))
    }

    fn expect_success(resp: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ApiError::UnexpectedStatus { status, body });
        }
        Ok(resp)
    }

    /// Ask the server for a CDN video container plus upload credentials.
    pub fn upload_credentials(&self) -> Result<UploadCredentials, ApiError> {
        let url = format!("{}/videos/upload", self.base_url);
        let resp = self.authed(self.http.post(url)).send()?;
        Ok(Self::expect_success(resp)?.json()?)
    }

    /// Ask the server for thumbnail storage credentials.
    pub fn thumbnail_credentials(&self, video_id: &str) -> Result<ThumbnailCredentials, ApiError> {
        let url = format!("{}/videos/{}/thumbnail-upload", self.base_url, video_id);
        let resp = self.authed(self.http.get(url)).send()?;
        Ok(Self::expect_success(resp)?.json()?)
    }

    /// Persist the metadata row after both binaries are uploaded.
    pub fn save_video(&self, req: &SaveVideoRequest) -> Result<(), ApiError> {
        let url = format!("{}/videos", self.base_url);
        let resp = self.authed(self.http.post(url)).json(req).send()?;
        Self::expect_success(resp)?;
        Ok(())
    }

    /// Fetch the current transcode status for a video.
    pub fn processing_status(&self, video_id: &str) -> Result<ProcessingStatus, ApiError> {
        let url = format!("{}/videos/{}/status", self.base_url, video_id);
        let resp = self.authed(self.http.get(url)).send()?;
        Ok(Self::expect_success(resp)?.json()?)
    }

    /// PUT a local file directly to a CDN endpoint, bypassing the server.
    pub fn put_cdn_object(
        &self,
        upload_url: &str,
        access_key: &str,
        content_type: &str,
        path: &Path,
    ) -> Result<(), ApiError> {
        let file = File::open(path)?;
        let resp = self
            .http
            .put(upload_url)
            .header("AccessKey", access_key)
            .header("Content-Type", content_type)
            .body(file)
            .send()?;
        Self::expect_success(resp)?;
        Ok(())
    }
}

/// Content type for an upload, guessed from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_content_type_guess() {
        assert_eq!(content_type_for(&PathBuf::from("a/demo.mp4")), "video/mp4");
        assert_eq!(content_type_for(&PathBuf::from("thumb.jpg")), "image/jpeg");
        assert_eq!(
            content_type_for(&PathBuf::from("unknown.bin")),
            "application/octet-stream"
        );
    }
}
