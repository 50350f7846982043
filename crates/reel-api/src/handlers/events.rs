//! Server-sent progress events.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use reel_models::ProgressEvent;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::metrics;
use crate::state::AppState;

/// Stream every progress event as JSON until the client disconnects.
///
/// Disconnecting drops the receiver, which deregisters the observer.
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.context().broadcaster().subscribe();
    metrics::record_event_stream_opened();
    debug!(
        observers = state.context().broadcaster().observer_count(),
        "Event stream opened"
    );

    let events = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => match to_sse(&event) {
                    Some(sse) => return Some((Ok(sse), rx)),
                    None => continue,
                },
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event stream lagging");
                    metrics::record_events_skipped(skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn to_sse(event: &ProgressEvent) -> Option<Event> {
    match Event::default().event(event.kind()).json_data(event) {
        Ok(sse) => Some(sse),
        Err(e) => {
            warn!("Failed to encode progress event: {}", e);
            None
        }
    }
}
