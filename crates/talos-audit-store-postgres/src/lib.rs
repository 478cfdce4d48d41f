//! # Postgres Store Adapter
//!
//! Selected via `TALOS_STORAGE_TYPE=postgres`. Rows map to
//! [`talos_audit_core::models::Event`] through an explicit, statically
//! typed [`EventRow`] and a plain constructor function — not through
//! dynamic attribute reflection, which is what makes a schema change a
//! compile error here instead of a silent runtime surprise.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE events (
//!     event_id        TEXT PRIMARY KEY,
//!     cursor          BIGSERIAL,
//!     schema_id       TEXT NOT NULL,
//!     schema_version  TEXT NOT NULL,
//!     ts              TEXT NOT NULL,
//!     request_id      TEXT NOT NULL,
//!     surface_id      TEXT NOT NULL,
//!     outcome         TEXT NOT NULL,
//!     principal       JSONB NOT NULL,
//!     http            JSONB NOT NULL,
//!     meta            JSONB NOT NULL,
//!     resource        JSONB,
//!     event_hash      TEXT NOT NULL
//! );
//! ```
//!
//! `append` uses `ON CONFLICT (event_id) DO NOTHING` so the adapter itself
//! is idempotent, matching the port contract even if two callers race.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use talos_audit_core::error::DomainError;
use talos_audit_core::models::{Event, EventPage};
use talos_audit_core::store::AuditStore;
use tracing::info;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    event_id        TEXT PRIMARY KEY,
    cursor          BIGSERIAL,
    schema_id       TEXT NOT NULL,
    schema_version  TEXT NOT NULL,
    ts              TEXT NOT NULL,
    request_id      TEXT NOT NULL,
    surface_id      TEXT NOT NULL,
    outcome         TEXT NOT NULL,
    principal       JSONB NOT NULL,
    http            JSONB NOT NULL,
    meta            JSONB NOT NULL,
    resource        JSONB,
    event_hash      TEXT NOT NULL
)
"#;

/// Relational store adapter backed by a `sqlx::PgPool`.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and ensures the `events` table exists.
    pub async fn connect(database_url: &str) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| DomainError::internal(format!("failed to connect to postgres: {e}")))?;
        sqlx::query(CREATE_TABLE_SQL)
            .execute(&pool)
            .await
            .map_err(|e| DomainError::internal(format!("failed to create events table: {e}")))?;
        info!("connected to postgres events store");
        Ok(PgStore { pool })
    }

    /// Wraps an already-constructed pool, for callers that manage their own
    /// connection lifecycle (e.g. tests against a shared pool).
    pub fn from_pool(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

#[derive(FromRow)]
struct EventRow {
    cursor: i64,
    schema_id: String,
    schema_version: String,
    event_id: String,
    ts: String,
    request_id: String,
    surface_id: String,
    outcome: String,
    principal: serde_json::Value,
    http: serde_json::Value,
    meta: serde_json::Value,
    resource: Option<serde_json::Value>,
    event_hash: String,
}

/// Explicit row-to-domain mapping; the replacement for a reflective
/// attribute-access facade over a raw database row.
fn row_to_event(row: EventRow) -> Event {
    Event {
        schema_id: row.schema_id,
        schema_version: row.schema_version,
        event_id: row.event_id,
        ts: row.ts,
        request_id: row.request_id,
        surface_id: row.surface_id,
        outcome: row.outcome,
        principal: value_to_map(row.principal),
        http: value_to_map(row.http),
        meta: value_to_map(row.meta),
        resource: row.resource.map(value_to_map),
        event_hash: row.event_hash,
    }
}

fn value_to_map(value: serde_json::Value) -> BTreeMap<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    }
}

fn map_to_value(map: &BTreeMap<String, serde_json::Value>) -> serde_json::Value {
    serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

fn decode_cursor(cursor: &str) -> Result<i64, DomainError> {
    cursor.parse::<i64>().map_err(|_| DomainError::validation(format!("malformed cursor: {cursor}")))
}

#[async_trait]
impl AuditStore for PgStore {
    async fn append(&self, event: Event) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO events
                (event_id, schema_id, schema_version, ts, request_id, surface_id, outcome,
                 principal, http, meta, resource, event_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&event.event_id)
        .bind(&event.schema_id)
        .bind(&event.schema_version)
        .bind(&event.ts)
        .bind(&event.request_id)
        .bind(&event.surface_id)
        .bind(&event.outcome)
        .bind(map_to_value(&event.principal))
        .bind(map_to_value(&event.http))
        .bind(map_to_value(&event.meta))
        .bind(event.resource.as_ref().map(map_to_value))
        .bind(&event.event_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::internal(format!("failed to append event: {e}")))?;
        Ok(())
    }

    async fn list(&self, before: Option<&str>, limit: usize) -> Result<EventPage, DomainError> {
        let limit_i64 = limit as i64;
        let rows: Vec<EventRow> = match before {
            Some(cursor) => {
                let before_cursor = decode_cursor(cursor)?;
                sqlx::query_as(
                    r#"SELECT cursor, schema_id, schema_version, event_id, ts, request_id,
                              surface_id, outcome, principal, http, meta, resource, event_hash
                       FROM events WHERE cursor < $1 ORDER BY cursor DESC LIMIT $2"#,
                )
                .bind(before_cursor)
                .bind(limit_i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    r#"SELECT cursor, schema_id, schema_version, event_id, ts, request_id,
                              surface_id, outcome, principal, http, meta, resource, event_hash
                       FROM events ORDER BY cursor DESC LIMIT $1"#,
                )
                .bind(limit_i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| DomainError::internal(format!("failed to list events: {e}")))?;

        let has_more = rows.len() == limit;
        let next_cursor = rows.last().map(|r| r.cursor.to_string());
        let events = rows.into_iter().map(row_to_event).collect();

        Ok(EventPage { events, next_cursor, has_more })
    }

    async fn list_all_ascending(&self) -> Result<Vec<Event>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"SELECT cursor, schema_id, schema_version, event_id, ts, request_id,
                      surface_id, outcome, principal, http, meta, resource, event_hash
               FROM events ORDER BY cursor ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::internal(format!("failed to list all events: {e}")))?;
        Ok(rows.into_iter().map(row_to_event).collect())
    }
}
