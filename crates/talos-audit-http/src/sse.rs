//! `GET /events` — the Server-Sent Events stream of newly accepted events.
//!
//! The first frame on every connection is `event: meta`; subsequent frames
//! are `event: audit_event`, one per accepted event, until the client
//! disconnects. A periodic heartbeat comment keeps idle connections alive
//! through intermediate proxies. A fatal error (currently: event
//! serialization failure) emits one `event: error` frame with a
//! `{code,message}` body and then terminates the connection.

use crate::state::AppState;
use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::time::Duration;
use talos_audit_core::broadcaster::Subscription;

/// Drives one subscriber connection: `Live` yields `audit_event` frames;
/// once a fatal error frame has been emitted the stream moves to `Done` so
/// the next poll ends it, closing the connection.
enum SubState {
    Live(Subscription),
    Done,
}

pub async fn events_stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let meta = serde_json::json!({
        "version": "1",
        "connected_at": chrono::Utc::now().to_rfc3339(),
    });
    let meta_event: Result<SseEvent, Infallible> = Ok(SseEvent::default().event("meta").data(meta.to_string()));

    let initial = match state.service.subscribe().await {
        Some(sub) => SubState::Live(sub),
        None => SubState::Done,
    };

    let audit_events = stream::unfold(Some(initial), |state| async move {
        match state? {
            SubState::Live(mut sub) => {
                let event = sub.recv().await?;
                match serde_json::to_string(&event) {
                    Ok(data) => {
                        let sse = SseEvent::default().event("audit_event").data(data);
                        Some((Ok(sse), Some(SubState::Live(sub))))
                    }
                    Err(err) => {
                        let body = serde_json::json!({
                            "code": "TALOS_SERIALIZATION_ERROR",
                            "message": err.to_string(),
                        });
                        let sse = SseEvent::default().event("error").data(body.to_string());
                        Some((Ok(sse), Some(SubState::Done)))
                    }
                }
            }
            SubState::Done => None,
        }
    });

    let full_stream = stream::once(async move { meta_event }).chain(audit_events);

    Sse::new(full_stream).keep_alive(
        KeepAlive::new().interval(Duration::from_secs(30)).text("heartbeat"),
    )
}
