//! Shared data models for the Reel Foundry pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Topics and the titles derived from them
//! - Candidate and sourced stock clips
//! - Run identifiers and the run state machine
//! - Progress events pushed to observers
//! - Automation settings and publish visibility

pub mod clip;
pub mod event;
pub mod run;
pub mod settings;
pub mod topic;

// Re-export common types
pub use clip::{CandidateClip, SourcedClip};
pub use event::{ProgressBand, ProgressEvent, ProgressSink, Stage};
pub use run::{RunId, RunState};
pub use settings::{RunSettings, Visibility, VisibilityParseError, DEFAULT_AUTO_SCHEDULE};
pub use topic::{resolve_topic, title_from_topic, truncate_title, MAX_TITLE_CHARS, TOPIC_POOL};
