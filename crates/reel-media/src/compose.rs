//! Composition engine: sourced clips in, one finished MP4 out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::histogram;
use reel_models::{ProgressBand, ProgressSink, SourcedClip, Stage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::audio::BackgroundAudioCache;
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{remove_quietly, unique_path};
use crate::graph::{build_graph, GraphOptions, OUTPUT_FPS};
use crate::progress::{BandMapper, FfmpegProgress};

/// Callback receiving raw encoder progress.
pub type ProgressCallback = Box<dyn Fn(FfmpegProgress) + Send + 'static>;

const ENCODING_LABEL: &str = "Encoding video";
const FINALIZING_LABEL: &str = "Finalizing video";
const FINALIZING_PERCENT: u8 = 82;

pub const DEFAULT_BACKGROUND_VOLUME: f64 = 0.18;

/// Executes a prepared FFmpeg command.
///
/// The production implementation spawns FFmpeg; tests substitute a fake.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    async fn encode(&self, cmd: &FfmpegCommand, on_progress: ProgressCallback) -> MediaResult<()>;
}

/// Encoder backed by the `ffmpeg` binary.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    timeout_secs: Option<u64>,
}

impl FfmpegEncoder {
    pub fn new(timeout_secs: Option<u64>) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    async fn encode(&self, cmd: &FfmpegCommand, on_progress: ProgressCallback) -> MediaResult<()> {
        let runner = match self.timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        };
        runner.run_with_progress(cmd, on_progress).await
    }
}

/// Settings for [`Compositor`].
#[derive(Debug, Clone)]
pub struct ComposeConfig {
    /// Where finished videos are written
    pub work_dir: PathBuf,
    pub graph: GraphOptions,
    /// Gain applied to the background track
    pub background_volume: f64,
}

impl ComposeConfig {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            graph: GraphOptions::default(),
            background_volume: DEFAULT_BACKGROUND_VOLUME,
        }
    }
}

/// Turns sourced clips and a title into a vertical short.
pub struct Compositor {
    encoder: Arc<dyn MediaEncoder>,
    audio: Option<Arc<BackgroundAudioCache>>,
    config: ComposeConfig,
}

impl Compositor {
    pub fn new(encoder: Arc<dyn MediaEncoder>, config: ComposeConfig) -> Self {
        Self {
            encoder,
            audio: None,
            config,
        }
    }

    /// Mix in the shared background track when it is available.
    pub fn with_audio(mut self, cache: Arc<BackgroundAudioCache>) -> Self {
        self.audio = Some(cache);
        self
    }

    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Compose `clips` into a single MP4 and return its path.
    ///
    /// Encoder progress is reported in the 35-75 band, followed by one
    /// `finalizing` report at 82. On failure no output file is left behind.
    pub async fn compose(
        &self,
        clips: &[SourcedClip],
        title: &str,
        sink: &dyn ProgressSink,
    ) -> MediaResult<PathBuf> {
        if clips.is_empty() {
            return Err(MediaError::invalid_input("no clips to compose"));
        }

        let audio = match &self.audio {
            Some(cache) => cache.get().await,
            None => None,
        };

        let stamp = chrono::Utc::now().timestamp_millis();
        let output = unique_path(&self.config.work_dir, "short", stamp, "mp4");
        let cmd = self.build_command(clips, title, audio.as_deref(), &output);

        info!(
            clips = clips.len().min(crate::graph::MAX_CLIPS),
            with_audio = audio.is_some(),
            "Composing {}",
            output.display()
        );

        let started = Instant::now();
        let result = self.encode_with_progress(&cmd, sink).await;
        let elapsed = started.elapsed().as_secs_f64();

        histogram!(
            "reel_ffmpeg_duration_seconds",
            "outcome" => if result.is_ok() { "success" } else { "failure" }
        )
        .record(elapsed);

        if let Err(e) = result {
            warn!("Composition failed after {:.1}s: {}", elapsed, e);
            remove_quietly(&output).await;
            return Err(e);
        }

        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(output));
        }

        sink.report(Stage::Finalizing, FINALIZING_LABEL, FINALIZING_PERCENT);
        debug!("Composition finished in {:.1}s", elapsed);
        Ok(output)
    }

    async fn encode_with_progress(
        &self,
        cmd: &FfmpegCommand,
        sink: &dyn ProgressSink,
    ) -> MediaResult<()> {
        let total_ms = (self.config.graph.total_secs * 1000.0).round() as i64;
        let mut mapper = BandMapper::new(ProgressBand::ENCODING);
        if let Some(percent) = mapper.observe(0.0) {
            sink.report(Stage::Encoding, ENCODING_LABEL, percent);
        }

        // The runner reports from its own task, so progress crosses over a channel
        let (tx, mut rx) = mpsc::unbounded_channel::<FfmpegProgress>();
        let callback: ProgressCallback = Box::new(move |progress| {
            let _ = tx.send(progress);
        });

        let mut forward = |progress: FfmpegProgress| {
            if let Some(percent) = mapper.observe(progress.percentage(total_ms)) {
                debug!(
                    percent,
                    speed = progress.speed,
                    remaining_secs = ?progress.remaining_secs(total_ms),
                    "Encoder progress"
                );
                sink.report(Stage::Encoding, ENCODING_LABEL, percent);
            }
        };

        let encode = self.encoder.encode(cmd, callback);
        tokio::pin!(encode);

        let result = loop {
            tokio::select! {
                result = &mut encode => break result,
                Some(progress) = rx.recv() => forward(progress),
            }
        };

        while let Ok(progress) = rx.try_recv() {
            forward(progress);
        }

        result
    }

    /// Assemble the encoder invocation for `clips`.
    ///
    /// Clip audio is dropped; when a background track is given it is looped
    /// under the video and the output ends with the video.
    pub fn build_command(
        &self,
        clips: &[SourcedClip],
        title: &str,
        audio: Option<&Path>,
        output: &Path,
    ) -> FfmpegCommand {
        let mut graph = build_graph(clips.len(), title, &self.config.graph);
        let used = graph.clip_inputs();

        let mut cmd = FfmpegCommand::new(output);
        for clip in clips.iter().take(used) {
            cmd = cmd.silent_input(&clip.local_path);
        }

        if let Some(track) = audio {
            cmd = cmd.looped_input(track);
            graph = graph.with_background_audio(used, self.config.background_volume);
        }

        cmd = cmd
            .filter_complex(graph.to_filter_complex())
            .map_label(graph.terminal());

        cmd = match graph.audio_output() {
            Some(label) => cmd
                .map_label(label)
                .audio_codec("aac")
                .audio_bitrate("128k")
                .shortest(),
            None => cmd.no_audio(),
        };

        cmd.video_codec("libx264")
            .video_profile("high")
            .crf(23)
            .preset("veryfast")
            .pixel_format("yuv420p")
            .frame_rate(OUTPUT_FPS)
            .max_duration(self.config.graph.total_secs)
            .faststart()
    }
}
