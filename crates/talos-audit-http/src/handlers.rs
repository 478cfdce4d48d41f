use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use talos_audit_core::models::{Event, EventPage, ProofView, RootView};

#[derive(Serialize)]
pub struct HealthView {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

pub async fn health() -> Json<HealthView> {
    Json(HealthView {
        status: "ok".into(),
        service: "talos-audit-service".into(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct VersionView {
    pub version: String,
    pub git_sha: String,
    pub service: String,
}

pub async fn version(State(state): State<AppState>) -> Json<VersionView> {
    Json(VersionView {
        version: state.version.to_string(),
        git_sha: state.git_sha.to_string(),
        service: "talos-audit-service".into(),
    })
}

pub async fn ingest(
    State(state): State<AppState>,
    Json(event): Json<Event>,
) -> Result<Json<Event>, ApiError> {
    let accepted = state.service.ingest_event(event).await?;
    Ok(Json(accepted))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub before: Option<String>,
}

/// Wire shape of `GET /api/events`. `EventPage.events` is the port-level
/// field name; the response body key is `items`.
#[derive(Serialize)]
pub struct EventPageView {
    pub items: Vec<Event>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl From<EventPage> for EventPageView {
    fn from(page: EventPage) -> Self {
        EventPageView { items: page.events, next_cursor: page.next_cursor, has_more: page.has_more }
    }
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<EventPageView>, ApiError> {
    let limit = query.limit.unwrap_or(state.default_list_limit);
    let page = state.service.list_events(query.before.as_deref(), limit).await?;
    Ok(Json(page.into()))
}

pub async fn root(State(state): State<AppState>) -> Json<RootView> {
    Json(state.service.get_root().await)
}

pub async fn proof(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<ProofView>, ApiError> {
    let view = state.service.get_proof(&event_id).await?;
    Ok(Json(view))
}
