//! Pipeline orchestrator: sourcing, composition, publishing.
//!
//! A run is started with [`Pipeline::start`], which checks preconditions,
//! resolves the topic and spawns the run on the runtime. From then on the
//! outcome is only observable through progress events and the status line;
//! no error escapes the run task.

use std::path::PathBuf;
use std::sync::Arc;

use metrics::counter;
use reel_media::{remove_all_quietly, remove_quietly, ComposeConfig, Compositor, FfmpegEncoder};
use reel_models::{
    resolve_topic, title_from_topic, ProgressSink, RunId, RunState, SourcedClip, Stage, Visibility,
};
use reel_publish::{
    share_url, PublishError, VideoPublisher, VideoUpload, YoutubeClient, YoutubeConfig,
};
use reel_stock::{ClipSourcer, PexelsClient, PexelsConfig, SourcingConfig};
use tokio::task::JoinHandle;
use tracing::{debug, Instrument};

use crate::caption::{build_caption, caption_tags};
use crate::config::PipelineConfig;
use crate::context::PipelineContext;
use crate::error::{PreconditionError, WorkerError, WorkerResult};
use crate::logging::RunLogger;
use crate::progress::RunProgress;

// Fixed checkpoints outside the sourcing and encoding bands
const STARTING_PERCENT: u8 = 2;
const CAPTION_PERCENT: u8 = 32;
const UPLOADING_PERCENT: u8 = 88;
const COMPLETE_PERCENT: u8 = 100;

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTrigger {
    Manual,
    Scheduled,
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunTrigger::Manual => "manual",
            RunTrigger::Scheduled => "scheduled",
        }
    }
}

/// Request to start a run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Blank or missing picks a random topic
    pub topic: Option<String>,
    /// Missing uses the configured default
    pub visibility: Option<Visibility>,
    pub trigger: RunTrigger,
}

impl RunRequest {
    pub fn manual(topic: Option<String>, visibility: Option<Visibility>) -> Self {
        Self {
            topic,
            visibility,
            trigger: RunTrigger::Manual,
        }
    }

    pub fn scheduled() -> Self {
        Self {
            topic: None,
            visibility: None,
            trigger: RunTrigger::Scheduled,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Published { url: String, video_id: String },
    Failed { message: String },
}

impl RunOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RunOutcome::Published { .. })
    }
}

/// Handle to a spawned run. Dropping it does not cancel the run.
#[derive(Debug)]
pub struct RunHandle {
    pub run_id: RunId,
    pub topic: String,
    pub join: JoinHandle<RunOutcome>,
}

/// Tracks the run's state and rejects illegal transitions.
#[derive(Debug)]
struct RunTracker {
    state: RunState,
}

impl RunTracker {
    fn new() -> Self {
        Self {
            state: RunState::Idle,
        }
    }

    fn advance(&mut self, next: RunState) -> WorkerResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(WorkerError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = %self.state, to = %next, "Run state transition");
        self.state = next;
        Ok(())
    }
}

/// Files a run owns and must delete before its terminal event.
#[derive(Debug, Default)]
struct RunArtifacts {
    clips: Vec<SourcedClip>,
    output: Option<PathBuf>,
}

impl RunArtifacts {
    async fn cleanup(&mut self) -> usize {
        let mut removed = 0;
        if let Some(output) = self.output.take() {
            if remove_quietly(&output).await {
                removed += 1;
            }
        }
        let paths: Vec<PathBuf> = self.clips.drain(..).map(|c| c.local_path).collect();
        removed + remove_all_quietly(&paths).await
    }
}

/// The orchestrator. Cheap to clone; every run task owns a clone.
#[derive(Clone)]
pub struct Pipeline {
    ctx: Arc<PipelineContext>,
    sourcer: Arc<ClipSourcer>,
    compositor: Arc<Compositor>,
    publisher: Arc<dyn VideoPublisher>,
    config: Arc<PipelineConfig>,
}

impl Pipeline {
    pub fn new(
        ctx: Arc<PipelineContext>,
        sourcer: Arc<ClipSourcer>,
        compositor: Arc<Compositor>,
        publisher: Arc<dyn VideoPublisher>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            ctx,
            sourcer,
            compositor,
            publisher,
            config: Arc::new(config),
        }
    }

    /// Wire the production collaborators: Pexels, FFmpeg and YouTube.
    pub fn from_config(config: PipelineConfig, ctx: Arc<PipelineContext>) -> WorkerResult<Self> {
        let api_key = config
            .pexels_api_key
            .clone()
            .ok_or_else(|| WorkerError::config_error("PEXELS_API_KEY must be set"))?;

        let mut pexels = PexelsConfig::new(api_key).with_timeout(config.http_timeout);
        if let Some(base_url) = &config.pexels_base_url {
            pexels = pexels.with_base_url(base_url.clone());
        }
        let provider = PexelsClient::new(pexels)?;
        let http = provider.http().clone();

        let sourcer = ClipSourcer::new(
            Arc::new(provider),
            http,
            SourcingConfig::new(&config.work_dir),
        );

        let mut compose_config = ComposeConfig::new(&config.work_dir);
        compose_config.graph = config.graph_options();
        let compositor = Compositor::new(
            Arc::new(FfmpegEncoder::new(config.encode_timeout_secs)),
            compose_config,
        )
        .with_audio(Arc::clone(ctx.audio()));

        let publisher = YoutubeClient::new(YoutubeConfig {
            timeout: config.http_timeout,
            ..YoutubeConfig::from_env()
        })?;

        Ok(Self::new(
            ctx,
            Arc::new(sourcer),
            Arc::new(compositor),
            Arc::new(publisher),
            config,
        ))
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.ctx
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Check preconditions and spawn a run.
    ///
    /// Refusals happen here, before any work or event.
    pub async fn start(&self, request: RunRequest) -> Result<RunHandle, PreconditionError> {
        if self.ctx.credentials().current().await.is_none() {
            return Err(PreconditionError::NoCredential {
                auth_url: self.config.auth_url.clone(),
            });
        }

        let active = self
            .ctx
            .try_begin_run(self.config.overlap_policy)
            .ok_or(PreconditionError::RunInProgress)?;

        let topic = resolve_topic(request.topic.as_deref());
        let visibility = request
            .visibility
            .unwrap_or(self.config.default_visibility);
        let run_id = RunId::new();

        counter!("reel_runs_started_total", "trigger" => request.trigger.as_str()).increment(1);

        let logger = RunLogger::new(&run_id, &topic);
        let span = logger.create_span();
        let pipeline = self.clone();
        let task_run_id = run_id.clone();
        let task_topic = topic.clone();

        let join = tokio::spawn(
            async move {
                let outcome = pipeline
                    .run(task_run_id, task_topic, visibility, &logger)
                    .await;
                drop(active);
                outcome
            }
            .instrument(span),
        );

        Ok(RunHandle {
            run_id,
            topic,
            join,
        })
    }

    async fn run(
        &self,
        run_id: RunId,
        topic: String,
        visibility: Visibility,
        logger: &RunLogger,
    ) -> RunOutcome {
        let title = title_from_topic(&topic);
        let sink = self.ctx.broadcaster().sink_for(&run_id);
        let mut tracker = RunTracker::new();
        let mut artifacts = RunArtifacts::default();

        logger.log_start(&title);
        self.ctx.set_status(format!("Running: {}", title)).await;

        let result = self
            .execute(&title, visibility, &sink, &mut tracker, &mut artifacts, logger)
            .await;

        let removed = artifacts.cleanup().await;
        debug!(removed, "Cleaned up run artifacts");

        let broadcaster = self.ctx.broadcaster();
        match result {
            Ok((url, video_id)) => {
                sink.report(Stage::Complete, "Done", COMPLETE_PERCENT);
                broadcaster.done(&run_id, &url, &video_id);
                self.ctx.set_status(format!("Published: {}", url)).await;
                counter!("reel_runs_completed_total").increment(1);
                logger.log_completion(&url);
                RunOutcome::Published { url, video_id }
            }
            Err(e) => {
                if let Err(transition) = tracker.advance(RunState::Failed) {
                    logger.log_warning(&transition.to_string());
                }
                let message = e.to_string();
                broadcaster.error(&run_id, &message);
                self.ctx.set_status(format!("Failed: {}", message)).await;
                counter!("reel_runs_failed_total", "stage" => tracker.state.as_str()).increment(1);
                logger.log_error(&message);
                RunOutcome::Failed { message }
            }
        }
    }

    /// The stages proper. Every file produced is recorded in `artifacts`.
    async fn execute(
        &self,
        title: &str,
        visibility: Visibility,
        sink: &RunProgress,
        tracker: &mut RunTracker,
        artifacts: &mut RunArtifacts,
        logger: &RunLogger,
    ) -> WorkerResult<(String, String)> {
        sink.report(Stage::Starting, "Starting", STARTING_PERCENT);

        tracker.advance(RunState::Sourcing)?;
        artifacts.clips = self.sourcer.fetch_clips(logger.topic(), sink).await?;
        logger.log_progress(&format!("sourced {} clips", artifacts.clips.len()));

        sink.report(Stage::Caption, "Writing caption", CAPTION_PERCENT);
        let caption = build_caption(title);

        tracker.advance(RunState::Composing)?;
        let output = self.compositor.compose(&artifacts.clips, title, sink).await?;
        artifacts.output = Some(output.clone());
        logger.log_progress(&format!("composed {}", output.display()));

        tracker.advance(RunState::Publishing)?;
        sink.report(Stage::Uploading, "Uploading", UPLOADING_PERCENT);

        let token = self
            .ctx
            .credentials()
            .current()
            .await
            .ok_or(PublishError::NoCredential)?;

        let upload = VideoUpload {
            path: output,
            title: title.to_string(),
            description: caption,
            tags: caption_tags(),
            visibility,
        };
        let published = match self.publisher.publish(&upload, &token).await {
            Ok(published) => published,
            Err(e) => {
                if e.is_unauthorized() {
                    logger.log_warning("publishing credential rejected, clearing it");
                    self.ctx.credentials().invalidate().await;
                }
                return Err(e.into());
            }
        };

        tracker.advance(RunState::Completed)?;
        let url = share_url(&self.config.share_host, &published.video_id);
        Ok((url, published.video_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_follows_state_machine() {
        let mut tracker = RunTracker::new();
        tracker.advance(RunState::Sourcing).unwrap();
        tracker.advance(RunState::Composing).unwrap();

        let err = tracker.advance(RunState::Completed).unwrap_err();
        assert!(matches!(
            err,
            WorkerError::InvalidTransition {
                from: RunState::Composing,
                to: RunState::Completed
            }
        ));

        tracker.advance(RunState::Failed).unwrap();
        assert!(tracker.advance(RunState::Failed).is_err());
    }

    #[test]
    fn test_run_request_constructors() {
        let scheduled = RunRequest::scheduled();
        assert!(scheduled.topic.is_none());
        assert_eq!(scheduled.trigger, RunTrigger::Scheduled);

        let manual = RunRequest::manual(Some("gold rush tale".into()), Some(Visibility::Private));
        assert_eq!(manual.trigger.as_str(), "manual");
        assert_eq!(manual.visibility, Some(Visibility::Private));
    }

    #[tokio::test]
    async fn test_artifacts_cleanup_removes_everything() {
        let dir = tempfile::TempDir::new().unwrap();
        let clip = dir.path().join("clip.mp4");
        let output = dir.path().join("short.mp4");
        tokio::fs::write(&clip, b"c").await.unwrap();
        tokio::fs::write(&output, b"o").await.unwrap();

        let mut artifacts = RunArtifacts {
            clips: vec![SourcedClip::new(&clip, 5.0)],
            output: Some(output.clone()),
        };
        assert_eq!(artifacts.cleanup().await, 2);
        assert!(!clip.exists());
        assert!(!output.exists());
        assert_eq!(artifacts.cleanup().await, 0);
    }
}
