//! `GET /api/events`: Server-Sent Events stream of project updates.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures_util::{Stream, StreamExt};
use tracing::debug;

use super::AppState;
use crate::live::Outbound;

const KEEP_ALIVE_COMMENT: &str = "heartbeat";

/// Tells nginx-style proxies not to buffer the stream.
const X_ACCEL_BUFFERING: &str = "x-accel-buffering";

/// One SSE frame per hub message. The stream ends, and the subscriber is
/// released, when the client disconnects or the hub drops it.
pub async fn events(
    State(state): State<AppState>,
) -> (
    [(&'static str, &'static str); 1],
    Sse<impl Stream<Item = Result<Event, Infallible>>>,
) {
    let subscription = state.hub.subscribe();
    debug!(subscriber = %subscription.id(), "Event stream opened");
    (
        [(X_ACCEL_BUFFERING, "no")],
        Sse::new(subscription.into_stream().map(|msg| Ok(to_event(&msg)))),
    )
}

fn to_event(msg: &Outbound) -> Event {
    match msg {
        Outbound::Data(payload) => Event::default().data(&**payload),
        Outbound::KeepAlive => Event::default().comment(KEEP_ALIVE_COMMENT),
    }
}
