//! Stock footage provider client (Pexels video search API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::{StockError, StockResult};

pub const DEFAULT_BASE_URL: &str = "https://api.pexels.com";

// =============================================================================
// Wire types
// =============================================================================

/// One video in a search response.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderVideo {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Reported length in seconds
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub video_files: Vec<Rendition>,
}

/// One encoded variant of a provider video.
#[derive(Debug, Clone, Deserialize)]
pub struct Rendition {
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    pub link: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<ProviderVideo>,
}

// =============================================================================
// Provider seam
// =============================================================================

/// Searches a stock-footage catalogue.
#[async_trait]
pub trait StockProvider: Send + Sync {
    /// Portrait-oriented results for `term`, at most `page_size` of them.
    async fn search(&self, term: &str, page_size: u32) -> StockResult<Vec<ProviderVideo>>;
}

// =============================================================================
// Configuration
// =============================================================================

/// Pexels client configuration.
#[derive(Debug, Clone)]
pub struct PexelsConfig {
    pub api_key: String,
    pub base_url: String,
    /// Per-request timeout; none waits indefinitely
    pub timeout: Option<Duration>,
}

impl PexelsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> StockResult<Self> {
        let api_key = std::env::var("PEXELS_API_KEY")
            .map_err(|_| StockError::config("PEXELS_API_KEY must be set to search stock footage"))?;

        if api_key.trim().is_empty() {
            return Err(StockError::config("PEXELS_API_KEY cannot be empty"));
        }

        let timeout = std::env::var("REEL_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs);

        Ok(Self {
            api_key,
            base_url: std::env::var("PEXELS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout,
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// Pexels video search client.
#[derive(Debug, Clone)]
pub struct PexelsClient {
    http: Client,
    config: PexelsConfig,
}

impl PexelsClient {
    pub fn new(config: PexelsConfig) -> StockResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("reel-stock/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self { http, config })
    }

    pub fn from_env() -> StockResult<Self> {
        Self::new(PexelsConfig::from_env()?)
    }

    /// Underlying HTTP client, shared with clip downloads.
    pub fn http(&self) -> &Client {
        &self.http
    }

    fn search_url(&self) -> String {
        format!("{}/videos/search", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl StockProvider for PexelsClient {
    async fn search(&self, term: &str, page_size: u32) -> StockResult<Vec<ProviderVideo>> {
        let url = self.search_url();
        let per_page = page_size.to_string();

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, &self.config.api_key)
            .query(&[
                ("query", term),
                ("orientation", "portrait"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(StockError::provider_failed(format!(
                "search '{}' returned {}: {}",
                term,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            StockError::provider_failed(format!("search '{}' returned undecodable body: {}", term, e))
        })?;

        debug!(term, results = parsed.videos.len(), "Stock search complete");
        Ok(parsed.videos)
    }
}
