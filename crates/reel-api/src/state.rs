//! Application state.

use std::sync::Arc;

use reel_media::BackgroundAudioCache;
use reel_publish::InMemoryCredentials;
use reel_worker::{Pipeline, PipelineConfig, PipelineContext, SettingsStore, WorkerResult};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Pipeline,
}

impl AppState {
    pub fn new(config: ApiConfig, pipeline: Pipeline) -> Self {
        Self { config, pipeline }
    }

    /// Build the production pipeline from environment variables.
    pub fn from_env(config: ApiConfig) -> WorkerResult<Self> {
        let pipeline_config = PipelineConfig::from_env();

        let mut http = reqwest::Client::builder()
            .user_agent(concat!("reel-api/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = pipeline_config.http_timeout {
            http = http.timeout(timeout);
        }
        let http = http
            .build()
            .map_err(|e| reel_worker::WorkerError::config_error(e.to_string()))?;

        let audio = BackgroundAudioCache::new(
            http,
            pipeline_config.background_audio_url.clone(),
            &pipeline_config.work_dir,
        );

        let ctx = Arc::new(PipelineContext::new(
            SettingsStore::from_env(),
            Arc::new(InMemoryCredentials::from_env()),
            Arc::new(audio),
        ));

        let pipeline = Pipeline::from_config(pipeline_config, ctx)?;
        Ok(Self::new(config, pipeline))
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        self.pipeline.context()
    }
}
