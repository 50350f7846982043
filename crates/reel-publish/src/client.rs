//! YouTube Data API v3 upload client.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use reel_models::{truncate_title, Visibility, MAX_TITLE_CHARS};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::credentials::AccessToken;
use crate::error::{PublishError, PublishResult};

pub const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com";
pub const DEFAULT_SHARE_HOST: &str = "youtu.be";

/// "Education"
const DEFAULT_CATEGORY_ID: &str = "27";

/// Public URL of a published video.
pub fn share_url(share_host: &str, video_id: &str) -> String {
    format!("https://{}/{}", share_host.trim_end_matches('/'), video_id)
}

/// Everything needed to publish one video.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub path: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub visibility: Visibility,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVideo {
    pub video_id: String,
}

/// Uploads a finished video to a hosting service.
#[async_trait]
pub trait VideoPublisher: Send + Sync {
    async fn publish(&self, upload: &VideoUpload, token: &AccessToken) -> PublishResult<PublishedVideo>;
}

/// YouTube client configuration.
#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    pub upload_base: String,
    pub category_id: String,
    pub timeout: Option<Duration>,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            category_id: DEFAULT_CATEGORY_ID.to_string(),
            timeout: None,
        }
    }
}

impl YoutubeConfig {
    pub fn from_env() -> Self {
        Self {
            upload_base: std::env::var("YOUTUBE_UPLOAD_BASE")
                .unwrap_or_else(|_| DEFAULT_UPLOAD_BASE.to_string()),
            category_id: std::env::var("YOUTUBE_CATEGORY_ID")
                .unwrap_or_else(|_| DEFAULT_CATEGORY_ID.to_string()),
            timeout: std::env::var("REEL_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadedVideo {
    id: String,
}

/// Resumable-upload client for the YouTube Data API.
#[derive(Debug, Clone)]
pub struct YoutubeClient {
    http: Client,
    config: YoutubeConfig,
}

impl YoutubeClient {
    pub fn new(config: YoutubeConfig) -> PublishResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("reel-publish/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            config,
        })
    }

    fn session_url(&self) -> String {
        format!(
            "{}/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status",
            self.config.upload_base.trim_end_matches('/')
        )
    }

    fn metadata(&self, upload: &VideoUpload) -> serde_json::Value {
        json!({
            "snippet": {
                "title": truncate_title(&upload.title, MAX_TITLE_CHARS),
                "description": upload.description,
                "tags": upload.tags,
                "categoryId": self.config.category_id,
            },
            "status": {
                "privacyStatus": upload.visibility.as_str(),
                "selfDeclaredMadeForKids": false,
            }
        })
    }

    /// Open a resumable session; returns the session URL.
    async fn start_session(
        &self,
        upload: &VideoUpload,
        token: &AccessToken,
        content_length: u64,
    ) -> PublishResult<String> {
        let response = self
            .http
            .post(self.session_url())
            .bearer_auth(&token.token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", content_length.to_string())
            .json(&self.metadata(upload))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }

        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| PublishError::upload_failed("upload session response had no Location header"))
    }

    async fn api_error(status: StatusCode, response: reqwest::Response) -> PublishError {
        let body = response.text().await.unwrap_or_default();
        PublishError::api(status.as_u16(), body.chars().take(300).collect::<String>())
    }
}

#[async_trait]
impl VideoPublisher for YoutubeClient {
    async fn publish(&self, upload: &VideoUpload, token: &AccessToken) -> PublishResult<PublishedVideo> {
        if !token.is_valid() {
            return Err(PublishError::NoCredential);
        }

        let file = tokio::fs::File::open(&upload.path).await?;
        let size = file.metadata().await?.len();
        debug!(size, "Opening upload session for {}", upload.path.display());

        let session = self.start_session(upload, token, size).await?;

        let response = self
            .http
            .put(&session)
            .bearer_auth(&token.token)
            .header(header::CONTENT_TYPE, "video/mp4")
            .header(header::CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }

        let uploaded: UploadedVideo = response
            .json()
            .await
            .map_err(|e| PublishError::upload_failed(format!("unreadable upload response: {}", e)))?;

        info!(video_id = %uploaded.id, size, "Video uploaded");
        Ok(PublishedVideo {
            video_id: uploaded.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Several read chunks' worth, so the body is streamed in pieces
    const UPLOAD_LEN: usize = 20_000;

    fn video_bytes() -> Vec<u8> {
        (0..UPLOAD_LEN).map(|i| (i % 251) as u8).collect()
    }

    async fn upload_in(dir: &TempDir, title: &str) -> VideoUpload {
        let path = dir.path().join("short.mp4");
        tokio::fs::write(&path, video_bytes()).await.unwrap();
        VideoUpload {
            path,
            title: title.to_string(),
            description: "Gold Rush Tale: a forgotten chapter of history.".to_string(),
            tags: vec!["history".to_string(), "shorts".to_string()],
            visibility: Visibility::Unlisted,
        }
    }

    fn client_for(server: &MockServer) -> YoutubeClient {
        YoutubeClient::new(YoutubeConfig {
            upload_base: server.uri(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_share_url() {
        assert_eq!(share_url("youtu.be", "abc123"), "https://youtu.be/abc123");
        assert_eq!(share_url("example.com/", "x"), "https://example.com/x");
    }

    #[tokio::test]
    async fn test_resumable_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .and(query_param("uploadType", "resumable"))
            .and(query_param("part", "snippet,status"))
            .and(header_eq("authorization", "Bearer tok"))
            .and(header_eq("x-upload-content-length", "20000"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Location", format!("{}/session/42", server.uri()).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/session/42"))
            .and(header_eq("content-length", "20000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "vid123"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let long_title = "The Extraordinary And Largely Forgotten Story Of The Gold Rush Tale";
        let upload = upload_in(&dir, long_title).await;

        let published = client_for(&server)
            .publish(&upload, &AccessToken::new("tok"))
            .await
            .unwrap();
        assert_eq!(published.video_id, "vid123");

        let requests = server.received_requests().await.unwrap();
        let metadata: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let title = metadata["snippet"]["title"].as_str().unwrap();
        assert!(title.chars().count() <= MAX_TITLE_CHARS);
        assert!(long_title.starts_with(title));
        assert_eq!(metadata["status"]["privacyStatus"], "unlisted");
        assert_eq!(metadata["snippet"]["tags"][1], "shorts");
        assert_eq!(requests[1].body, video_bytes());
    }

    #[tokio::test]
    async fn test_rejected_credential_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let upload = upload_in(&dir, "Title").await;
        let err = client_for(&server)
            .publish(&upload, &AccessToken::new("stale"))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Api { status: 401, .. }));
        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_missing_location_is_upload_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let upload = upload_in(&dir, "Title").await;
        let err = client_for(&server)
            .publish(&upload, &AccessToken::new("tok"))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::UploadFailed(_)));
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected_locally() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let upload = upload_in(&dir, "Title").await;

        let err = client_for(&server)
            .publish(&upload, &AccessToken::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::NoCredential));
    }
}
