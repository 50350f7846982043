//! Cron-driven automatic runs.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use reel_models::{ProgressEvent, RunId};
use tracing::{debug, info, warn};

use crate::error::{PreconditionError, WorkerError, WorkerResult};
use crate::pipeline::{Pipeline, RunRequest};

/// Longest sleep between settings re-reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Accept classic 5-field expressions by adding a zero seconds field.
pub fn normalize_cron(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

pub fn parse_schedule(expression: &str) -> WorkerResult<Schedule> {
    Schedule::from_str(&normalize_cron(expression))
        .map_err(|e| WorkerError::invalid_schedule(expression, e.to_string()))
}

/// First fire time strictly after `after`.
pub fn next_fire(expression: &str, after: DateTime<Utc>) -> WorkerResult<Option<DateTime<Utc>>> {
    Ok(parse_schedule(expression)?.after(&after).next())
}

/// Result of one scheduler fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Started(RunId),
    /// Automation is switched off
    Disabled,
    /// Preconditions refused the run
    Skipped(PreconditionError),
}

/// Starts runs on the schedule held in the settings store.
pub struct Scheduler {
    pipeline: Pipeline,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Run forever. Spawn as a background task.
    ///
    /// Settings are re-read at least every poll interval, so a changed
    /// schedule or toggle takes effect without a restart.
    pub async fn run(&self) {
        info!("Starting scheduler (poll interval: {:?})", self.poll_interval);

        loop {
            let settings = self.pipeline.context().settings().get().await;
            let now = Utc::now();

            let next = match next_fire(&settings.auto_schedule, now) {
                Ok(Some(next)) => next,
                Ok(None) => {
                    debug!(schedule = %settings.auto_schedule, "Schedule has no future fire time");
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
                Err(e) => {
                    warn!("Scheduler idle: {}", e);
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
            };

            let until_next = (next - now).to_std().unwrap_or(Duration::ZERO);
            if until_next > self.poll_interval {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            tokio::time::sleep(until_next).await;
            let outcome = self.tick().await;
            debug!(?outcome, "Scheduler fired");
        }
    }

    /// Handle one fire: start a run or record why it was skipped.
    pub async fn tick(&self) -> TickOutcome {
        let ctx = self.pipeline.context();
        let settings = ctx.settings().get().await;

        if !settings.auto_enabled {
            debug!("Automatic runs disabled, skipping scheduled fire");
            ctx.set_status("Skipped scheduled run: automation disabled").await;
            return TickOutcome::Disabled;
        }

        match self.pipeline.start(RunRequest::scheduled()).await {
            Ok(handle) => {
                info!(run_id = %handle.run_id, topic = %handle.topic, "Scheduled run started");
                TickOutcome::Started(handle.run_id)
            }
            Err(reason) => {
                let message = format!("Skipped scheduled run: {}", reason);
                warn!("{}", message);
                ctx.set_status(message.clone()).await;
                ctx.broadcaster().publish(ProgressEvent::detached_error(message));
                TickOutcome::Skipped(reason)
            }
        }
    }
}
