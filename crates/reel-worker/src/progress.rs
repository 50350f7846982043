//! Process-wide progress fan-out.
//!
//! Observers subscribe and unsubscribe at any time by creating and dropping
//! receivers. A slow observer lags and skips events; it never blocks a run.

use std::sync::atomic::{AtomicU8, Ordering};

use reel_models::{ProgressEvent, ProgressSink, RunId, Stage};
use tokio::sync::broadcast;
use tracing::debug;

/// Events buffered per observer before it starts lagging.
pub const DEFAULT_CAPACITY: usize = 256;

/// Broadcasts [`ProgressEvent`]s to every connected observer.
#[derive(Debug, Clone)]
pub struct ProgressBroadcaster {
    sender: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Send to every current observer; returns how many received it.
    ///
    /// Having no observers is not an error.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn progress(&self, run_id: &RunId, stage: Stage, label: &str, percent: u8) -> usize {
        self.publish(ProgressEvent::progress(run_id, stage, label, percent))
    }

    pub fn done(&self, run_id: &RunId, url: &str, video_id: &str) -> usize {
        self.publish(ProgressEvent::done(run_id, url, video_id))
    }

    pub fn error(&self, run_id: &RunId, message: &str) -> usize {
        self.publish(ProgressEvent::error(run_id, message))
    }

    /// Sink that stamps stage reports with `run_id`.
    pub fn sink_for(&self, run_id: &RunId) -> RunProgress {
        RunProgress {
            broadcaster: self.clone(),
            run_id: run_id.clone(),
            last: AtomicU8::new(0),
        }
    }
}

/// Per-run [`ProgressSink`] that never lets the percent go backwards.
#[derive(Debug)]
pub struct RunProgress {
    broadcaster: ProgressBroadcaster,
    run_id: RunId,
    last: AtomicU8,
}

impl ProgressSink for RunProgress {
    fn report(&self, stage: Stage, label: &str, percent: u8) {
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        let percent = percent.max(previous);
        debug!(run_id = %self.run_id, stage = stage.as_str(), percent, "{}", label);
        self.broadcaster.progress(&self.run_id, stage, label, percent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_observer() {
        let broadcaster = ProgressBroadcaster::default();
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();
        let run_id = RunId::from_string("r1");

        assert_eq!(broadcaster.progress(&run_id, Stage::Starting, "Starting", 2), 2);

        assert_eq!(a.recv().await.unwrap().percent(), Some(2));
        assert_eq!(b.recv().await.unwrap().percent(), Some(2));
    }

    #[tokio::test]
    async fn test_publish_without_observers_is_fine() {
        let broadcaster = ProgressBroadcaster::default();
        let run_id = RunId::from_string("r1");
        assert_eq!(broadcaster.done(&run_id, "https://youtu.be/x", "x"), 0);

        // Dropped observers deregister
        let rx = broadcaster.subscribe();
        assert_eq!(broadcaster.observer_count(), 1);
        drop(rx);
        assert_eq!(broadcaster.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_observer_skips_instead_of_blocking() {
        let broadcaster = ProgressBroadcaster::new(2);
        let mut rx = broadcaster.subscribe();
        let run_id = RunId::from_string("r1");

        for p in 0..5 {
            broadcaster.progress(&run_id, Stage::Encoding, "Encoding", 40 + p);
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(rx.recv().await.unwrap().percent(), Some(43));
    }

    #[tokio::test]
    async fn test_run_sink_is_monotonic() {
        let broadcaster = ProgressBroadcaster::default();
        let mut rx = broadcaster.subscribe();
        let sink = broadcaster.sink_for(&RunId::from_string("r9"));

        sink.report(Stage::Sourcing, "a", 10);
        sink.report(Stage::Sourcing, "b", 7);
        sink.report(Stage::Caption, "c", 32);

        let percents: Vec<u8> = (0..3)
            .map(|_| rx.try_recv().unwrap().percent().unwrap())
            .collect();
        assert_eq!(percents, vec![10, 10, 32]);
    }
}
