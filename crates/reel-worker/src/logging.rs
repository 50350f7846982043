//! Structured run logging.

use reel_models::RunId;
use tracing::{error, info, warn, Span};

/// Logger that stamps every line with the run id and topic.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    topic: String,
}

impl RunLogger {
    pub fn new(run_id: &RunId, topic: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            topic: topic.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(run_id = %self.run_id, topic = %self.topic, "Run started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(run_id = %self.run_id, topic = %self.topic, "Run progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, topic = %self.topic, "Run warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(run_id = %self.run_id, topic = %self.topic, "Run failed: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(run_id = %self.run_id, topic = %self.topic, "Run completed: {}", message);
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Span covering the whole run; stage logs inside it inherit the fields.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id, topic = %self.topic)
    }
}
