//! Shared state of the pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reel_media::BackgroundAudioCache;
use reel_publish::CredentialStore;
use tokio::sync::RwLock;

use crate::config::OverlapPolicy;
use crate::progress::ProgressBroadcaster;
use crate::settings::SettingsStore;

pub const INITIAL_STATUS: &str = "Idle";

/// Everything runs share: status line, settings, credentials, progress
/// fan-out, the background audio cache and the active-run count.
pub struct PipelineContext {
    status: RwLock<String>,
    settings: SettingsStore,
    credentials: Arc<dyn CredentialStore>,
    broadcaster: ProgressBroadcaster,
    audio: Arc<BackgroundAudioCache>,
    active_runs: AtomicUsize,
}

impl PipelineContext {
    pub fn new(
        settings: SettingsStore,
        credentials: Arc<dyn CredentialStore>,
        audio: Arc<BackgroundAudioCache>,
    ) -> Self {
        Self {
            status: RwLock::new(INITIAL_STATUS.to_string()),
            settings,
            credentials,
            broadcaster: ProgressBroadcaster::default(),
            audio,
            active_runs: AtomicUsize::new(0),
        }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn broadcaster(&self) -> &ProgressBroadcaster {
        &self.broadcaster
    }

    pub fn audio(&self) -> &Arc<BackgroundAudioCache> {
        &self.audio
    }

    /// Human-readable outcome of the most recent run or skip.
    pub async fn status_line(&self) -> String {
        self.status.read().await.clone()
    }

    pub async fn set_status(&self, status: impl Into<String>) {
        *self.status.write().await = status.into();
    }

    pub fn active_runs(&self) -> usize {
        self.active_runs.load(Ordering::SeqCst)
    }

    /// Register a run under `policy`; `None` when the policy refuses it.
    ///
    /// The run stays registered until the returned guard is dropped.
    pub fn try_begin_run(self: &Arc<Self>, policy: OverlapPolicy) -> Option<ActiveRun> {
        match policy {
            OverlapPolicy::Allow => {
                self.active_runs.fetch_add(1, Ordering::SeqCst);
            }
            OverlapPolicy::Reject => {
                self.active_runs
                    .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                    .ok()?;
            }
        }
        Some(ActiveRun {
            ctx: Arc::clone(self),
        })
    }
}

/// Registration of one active run.
pub struct ActiveRun {
    ctx: Arc<PipelineContext>,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.ctx.active_runs.fetch_sub(1, Ordering::SeqCst);
    }
}
