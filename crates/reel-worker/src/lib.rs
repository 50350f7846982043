//! Pipeline orchestration for automated vertical shorts.
//!
//! A run sources stock clips, composes them into one video and publishes it,
//! reporting progress to every observer through the [`ProgressBroadcaster`].
//! The [`Scheduler`] starts runs on a cron schedule read from the
//! [`SettingsStore`].

pub mod caption;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod scheduler;
pub mod settings;

pub use caption::{build_caption, caption_tags, CAPTION_TAGS, MAX_CAPTION_CHARS};
pub use config::{OverlapPolicy, PipelineConfig};
pub use context::PipelineContext;
pub use error::{PreconditionError, WorkerError, WorkerResult};
pub use logging::RunLogger;
pub use pipeline::{Pipeline, RunHandle, RunOutcome, RunRequest, RunTrigger};
pub use progress::{ProgressBroadcaster, RunProgress};
pub use scheduler::{normalize_cron, parse_schedule, Scheduler, TickOutcome};
pub use settings::SettingsStore;
