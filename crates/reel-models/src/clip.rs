//! Stock clip types.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A provider result that passed the acceptance filter.
///
/// `remote_url` points at the rendition chosen for download. Candidates are
/// never persisted; they only live until sourcing decides what to download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CandidateClip {
    /// Download link of the selected rendition
    pub remote_url: String,
    /// Duration reported by the provider (seconds)
    pub reported_duration_secs: f64,
    /// Width of the source video
    pub width: u32,
    /// Height of the source video
    pub height: u32,
}

impl CandidateClip {
    /// Whether the source is portrait (or square).
    pub fn is_portrait(&self) -> bool {
        self.height >= self.width
    }
}

/// A clip materialized on local storage for the duration of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedClip {
    pub local_path: PathBuf,
    pub duration_secs: f64,
}

impl SourcedClip {
    pub fn new(local_path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            local_path: local_path.into(),
            duration_secs,
        }
    }
}
