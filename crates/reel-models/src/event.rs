//! Progress event types pushed to observers.
//!
//! Every event is a JSON record tagged by `type`. A run emits any number of
//! `progress` events followed by exactly one terminal `done` or `error`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::RunId;

/// Pipeline stage reported in progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Starting,
    /// Searching and downloading stock footage (5-30%)
    Sourcing,
    /// Writing the publish caption (32%)
    Caption,
    /// FFmpeg running (35-75%)
    Encoding,
    /// Encoder finished, output being handed over (82%)
    Finalizing,
    Uploading,
    Complete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Starting => "starting",
            Stage::Sourcing => "sourcing",
            Stage::Caption => "caption",
            Stage::Encoding => "encoding",
            Stage::Finalizing => "finalizing",
            Stage::Uploading => "uploading",
            Stage::Complete => "complete",
        }
    }
}

/// Event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Stage progress (0-100)
    Progress {
        #[serde(rename = "runId", skip_serializing_if = "Option::is_none")]
        run_id: Option<RunId>,
        stage: Stage,
        label: String,
        percent: u8,
        timestamp: DateTime<Utc>,
    },

    /// Run published successfully
    Done {
        #[serde(rename = "runId", skip_serializing_if = "Option::is_none")]
        run_id: Option<RunId>,
        url: String,
        #[serde(rename = "videoId")]
        video_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Run failed, or a scheduled run was skipped
    Error {
        #[serde(rename = "runId", skip_serializing_if = "Option::is_none")]
        run_id: Option<RunId>,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ProgressEvent {
    /// Create a progress event. Percent is capped at 100.
    pub fn progress(run_id: &RunId, stage: Stage, label: impl Into<String>, percent: u8) -> Self {
        ProgressEvent::Progress {
            run_id: Some(run_id.clone()),
            stage,
            label: label.into(),
            percent: percent.min(100),
            timestamp: Utc::now(),
        }
    }

    /// Create a done event.
    pub fn done(run_id: &RunId, url: impl Into<String>, video_id: impl Into<String>) -> Self {
        ProgressEvent::Done {
            run_id: Some(run_id.clone()),
            url: url.into(),
            video_id: video_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an error event for a run.
    pub fn error(run_id: &RunId, message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            run_id: Some(run_id.clone()),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an error event that is not tied to a run (skipped schedule).
    pub fn detached_error(message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            run_id: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn run_id(&self) -> Option<&RunId> {
        match self {
            ProgressEvent::Progress { run_id, .. }
            | ProgressEvent::Done { run_id, .. }
            | ProgressEvent::Error { run_id, .. } => run_id.as_ref(),
        }
    }

    /// Percent carried by a progress event.
    pub fn percent(&self) -> Option<u8> {
        match self {
            ProgressEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        }
    }

    /// Whether this is the last event of its run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Done { .. } | ProgressEvent::Error { .. })
    }

    /// Event type as used in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::Progress { .. } => "progress",
            ProgressEvent::Done { .. } => "done",
            ProgressEvent::Error { .. } => "error",
        }
    }
}

/// Receiver of stage progress from long-running pipeline steps.
///
/// Stages report into this rather than into the broadcaster directly, so the
/// media and sourcing crates stay independent of how events are fanned out.
pub trait ProgressSink: Send + Sync {
    fn report(&self, stage: Stage, label: &str, percent: u8);
}

/// A contiguous percent range owned by one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBand {
    pub start: u8,
    pub end: u8,
}

impl ProgressBand {
    /// Clip search and download.
    pub const SOURCING: ProgressBand = ProgressBand { start: 5, end: 30 };
    /// FFmpeg encode.
    pub const ENCODING: ProgressBand = ProgressBand { start: 35, end: 75 };

    /// Map a stage-local percent (0-100) into this band.
    ///
    /// `start + round(native * width / 100)`, clamped to `[start, end]`.
    pub fn map(&self, native_percent: f64) -> u8 {
        let width = f64::from(self.end - self.start);
        let native = if native_percent.is_finite() {
            native_percent.max(0.0)
        } else {
            0.0
        };
        let mapped = f64::from(self.start) + (native * width / 100.0).round();
        mapped.clamp(f64::from(self.start), f64::from(self.end)) as u8
    }

    /// Map a completed fraction (0.0-1.0) into this band.
    pub fn map_fraction(&self, fraction: f64) -> u8 {
        self.map(fraction * 100.0)
    }
}
