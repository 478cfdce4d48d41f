//! # HTTP Surface
//!
//! Thin Axum routing and response-shaping layer over
//! [`talos_audit_core::AuditService`]. Holds no business logic: every
//! handler is a direct translation of an HTTP request into a core call and
//! the core's response into a status code and JSON body.
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | GET | `/health` | [`handlers::health`] |
//! | GET | `/version` | [`handlers::version`] |
//! | POST | `/events` | [`handlers::ingest`] |
//! | GET | `/api/events` | [`handlers::list_events`] |
//! | GET | `/events` | [`sse::events_stream`] |
//! | GET | `/root` | [`handlers::root`] |
//! | GET | `/proof/:event_id` | [`handlers::proof`] |

pub mod error;
pub mod handlers;
pub mod sse;
pub mod state;

pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Builds the full router for a given [`AppState`]. The composition root
/// is responsible for constructing `state` and binding the returned router
/// to a listener.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        .route("/events", post(handlers::ingest).get(sse::events_stream))
        .route("/api/events", get(handlers::list_events))
        .route("/root", get(handlers::root))
        .route("/proof/:event_id", get(handlers::proof))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
