#![deny(unreachable_patterns)]
//! FFmpeg composition for vertical shorts.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building for multi-input encodes
//! - Progress parsing from `-progress pipe:2` and mapping into pipeline bands
//! - A structured filter graph (per-clip scale/crop, cross-fade chain, text overlays)
//! - The composition engine that turns sourced clips into one MP4
//! - A process-wide cache for the optional background audio track
//! - Streaming HTTP downloads and temp-file housekeeping

pub mod audio;
pub mod command;
pub mod compose;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod graph;
pub mod progress;

pub use audio::BackgroundAudioCache;
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use compose::{ComposeConfig, Compositor, FfmpegEncoder, MediaEncoder, ProgressCallback};
pub use download::download_to_file;
pub use error::{MediaError, MediaResult};
pub use fs_utils::{remove_all_quietly, remove_quietly, unique_path};
pub use graph::{
    build_graph, effective_clip_count, escape_text, plan_segments, FilterGraph, FilterNode,
    GraphOptions, NodeKind, SegmentPlan,
};
pub use progress::{BandMapper, FfmpegProgress};
