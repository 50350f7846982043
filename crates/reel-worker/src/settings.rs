//! In-memory automation settings.

use std::sync::Arc;

use reel_models::{RunSettings, DEFAULT_AUTO_SCHEDULE};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::WorkerResult;
use crate::scheduler::parse_schedule;

/// Shared, validated [`RunSettings`].
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<RunSettings>>,
}

impl SettingsStore {
    pub fn new(settings: RunSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Seed from `REEL_AUTO_ENABLED` and `REEL_AUTO_SCHEDULE`.
    pub fn from_env() -> Self {
        let auto_enabled = std::env::var("REEL_AUTO_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let auto_schedule = std::env::var("REEL_AUTO_SCHEDULE")
            .ok()
            .filter(|s| parse_schedule(s).is_ok())
            .unwrap_or_else(|| DEFAULT_AUTO_SCHEDULE.to_string());

        Self::new(RunSettings {
            auto_enabled,
            auto_schedule,
        })
    }

    /// Snapshot of the current settings.
    pub async fn get(&self) -> RunSettings {
        self.inner.read().await.clone()
    }

    /// Replace the settings; an unparseable schedule is rejected unchanged.
    pub async fn update(&self, settings: RunSettings) -> WorkerResult<RunSettings> {
        parse_schedule(&settings.auto_schedule)?;

        let mut guard = self.inner.write().await;
        *guard = settings.clone();
        info!(
            auto_enabled = settings.auto_enabled,
            schedule = %settings.auto_schedule,
            "Automation settings updated"
        );
        Ok(settings)
    }
}
