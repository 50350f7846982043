//! Pipeline configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reel_media::graph::{DEFAULT_BRAND_CAPTION, DEFAULT_CROSSFADE_SECS, DEFAULT_TOTAL_SECS};
use reel_media::GraphOptions;
use reel_models::Visibility;
use reel_publish::client::DEFAULT_SHARE_HOST;
use tracing::warn;

/// Default location the hosting service's consent flow is served from.
pub const DEFAULT_AUTH_URL: &str = "/auth/youtube";

/// Whether a new run may start while another is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Overlapping runs are permitted
    #[default]
    Allow,
    /// A new run is refused while one is active
    Reject,
}

impl FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(OverlapPolicy::Allow),
            "reject" => Ok(OverlapPolicy::Reject),
            other => Err(format!("unknown overlap policy: {}", other)),
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapPolicy::Allow => f.write_str("allow"),
            OverlapPolicy::Reject => f.write_str("reject"),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory for clips, composed videos and the audio cache
    pub work_dir: PathBuf,
    pub pexels_api_key: Option<String>,
    pub pexels_base_url: Option<String>,
    pub background_audio_url: Option<String>,
    pub font_file: Option<String>,
    pub brand_caption: String,
    /// Host used to build share URLs
    pub share_host: String,
    /// Where callers are sent when no credential is present
    pub auth_url: String,
    /// Visibility used by scheduled runs
    pub default_visibility: Visibility,
    pub http_timeout: Option<Duration>,
    pub encode_timeout_secs: Option<u64>,
    pub overlap_policy: OverlapPolicy,
    pub crossfade_secs: f64,
    pub total_secs: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("reel"),
            pexels_api_key: None,
            pexels_base_url: None,
            background_audio_url: None,
            font_file: None,
            brand_caption: DEFAULT_BRAND_CAPTION.to_string(),
            share_host: DEFAULT_SHARE_HOST.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            default_visibility: Visibility::Public,
            http_timeout: None,
            encode_timeout_secs: None,
            overlap_policy: OverlapPolicy::Allow,
            crossfade_secs: DEFAULT_CROSSFADE_SECS,
            total_secs: DEFAULT_TOTAL_SECS,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_visibility = match std::env::var("REEL_DEFAULT_VISIBILITY") {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                warn!("Ignoring REEL_DEFAULT_VISIBILITY: {}", e);
                defaults.default_visibility
            }),
            Err(_) => defaults.default_visibility,
        };

        let overlap_policy = match std::env::var("REEL_OVERLAP_POLICY") {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                warn!("Ignoring REEL_OVERLAP_POLICY: {}", e);
                defaults.overlap_policy
            }),
            Err(_) => defaults.overlap_policy,
        };

        Self {
            work_dir: std::env::var("REEL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            pexels_api_key: non_empty_var("PEXELS_API_KEY"),
            pexels_base_url: non_empty_var("PEXELS_BASE_URL"),
            background_audio_url: non_empty_var("BACKGROUND_AUDIO_URL"),
            font_file: non_empty_var("REEL_FONT_FILE"),
            brand_caption: non_empty_var("REEL_BRAND_CAPTION").unwrap_or(defaults.brand_caption),
            share_host: non_empty_var("REEL_SHARE_HOST").unwrap_or(defaults.share_host),
            auth_url: non_empty_var("REEL_AUTH_URL").unwrap_or(defaults.auth_url),
            default_visibility,
            http_timeout: std::env::var("REEL_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
            encode_timeout_secs: std::env::var("REEL_ENCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
            overlap_policy,
            crossfade_secs: defaults.crossfade_secs,
            total_secs: defaults.total_secs,
        }
    }

    /// Filter graph options derived from this config.
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            crossfade_secs: self.crossfade_secs,
            total_secs: self.total_secs,
            brand_caption: self.brand_caption.clone(),
            font_file: self.font_file.clone(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.share_host, "youtu.be");
        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(config.overlap_policy, OverlapPolicy::Allow);
        assert!(config.http_timeout.is_none());
        assert!(config.encode_timeout_secs.is_none());
        assert!(config.work_dir.ends_with("reel"));
    }

    #[test]
    fn test_overlap_policy_parse() {
        assert_eq!(" Reject ".parse::<OverlapPolicy>(), Ok(OverlapPolicy::Reject));
        assert_eq!("allow".parse::<OverlapPolicy>(), Ok(OverlapPolicy::Allow));
        assert!("queue".parse::<OverlapPolicy>().is_err());
        assert_eq!(OverlapPolicy::Reject.to_string(), "reject");
    }

    #[test]
    fn test_graph_options_follow_config() {
        let config = PipelineConfig {
            brand_caption: "Archive Hour".to_string(),
            font_file: Some("/fonts/a.ttf".to_string()),
            ..Default::default()
        };
        let options = config.graph_options();
        assert_eq!(options.brand_caption, "Archive Hour");
        assert_eq!(options.font_file.as_deref(), Some("/fonts/a.ttf"));
        assert_eq!(options.total_secs, 15.0);
    }
}
