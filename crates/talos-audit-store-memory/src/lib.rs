//! # In-Process Store Adapter
//!
//! The default [`talos_audit_core::store::AuditStore`] implementation:
//! events live in a `Vec` guarded by a `tokio::sync::RwLock`, selected when
//! `TALOS_STORAGE_TYPE=memory` (the default). Durable only for the lifetime
//! of the process; intended for development, tests, and single-node
//! deployments where durability is delegated elsewhere.
//!
//! Cursors are the event's append sequence number, zero-padded to a fixed
//! width so that lexicographic string ordering agrees with numeric
//! ordering — the same contract the relational adapter gets for free from
//! a `BIGINT` column rendered as decimal text.

use async_trait::async_trait;
use talos_audit_core::error::DomainError;
use talos_audit_core::models::{Event, EventPage};
use talos_audit_core::store::AuditStore;
use tokio::sync::RwLock;

const CURSOR_WIDTH: usize = 20;

fn encode_cursor(seq: u64) -> String {
    format!("{seq:0width$}", width = CURSOR_WIDTH)
}

fn decode_cursor(cursor: &str) -> Result<u64, DomainError> {
    cursor
        .parse::<u64>()
        .map_err(|_| DomainError::validation(format!("malformed cursor: {cursor}")))
}

struct Record {
    seq: u64,
    event: Event,
}

/// `tokio::sync::RwLock`-guarded, insertion-ordered event store.
pub struct InMemoryStore {
    records: RwLock<Vec<Record>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore { records: RwLock::new(Vec::new()) }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStore for InMemoryStore {
    async fn append(&self, event: Event) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.event.event_id == event.event_id) {
            return Ok(());
        }
        let seq = records.len() as u64;
        records.push(Record { seq, event });
        Ok(())
    }

    async fn list(&self, before: Option<&str>, limit: usize) -> Result<EventPage, DomainError> {
        let before_seq = before.map(decode_cursor).transpose()?;
        let records = self.records.read().await;

        let mut matching: Vec<&Record> = records
            .iter()
            .rev()
            .filter(|r| before_seq.map_or(true, |b| r.seq < b))
            .collect();
        matching.truncate(limit);

        let has_more = matching.len() == limit;

        let next_cursor = matching.last().map(|r| encode_cursor(r.seq));
        let events = matching.into_iter().map(|r| r.event.clone()).collect();

        Ok(EventPage { events, next_cursor, has_more })
    }

    async fn list_all_ascending(&self) -> Result<Vec<Event>, DomainError> {
        let records = self.records.read().await;
        Ok(records.iter().map(|r| r.event.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn event(id: &str) -> Event {
        Event {
            schema_id: "talos.audit_event".into(),
            schema_version: "v1".into(),
            event_id: id.into(),
            ts: "2026-01-01T00:00:00Z".into(),
            request_id: "r".into(),
            surface_id: "s".into(),
            outcome: "success".into(),
            principal: BTreeMap::new(),
            http: BTreeMap::new(),
            meta: BTreeMap::new(),
            resource: None,
            event_hash: "a".repeat(64),
        }
    }

    #[tokio::test]
    async fn append_then_list_returns_descending_order() {
        let store = InMemoryStore::new();
        for i in 0..3 {
            store.append(event(&format!("e{i}"))).await.unwrap();
        }
        let page = store.list(None, 10).await.unwrap();
        let ids: Vec<&str> = page.events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1", "e0"]);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn pagination_respects_limit_and_cursor() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store.append(event(&format!("e{i}"))).await.unwrap();
        }
        let first_page = store.list(None, 2).await.unwrap();
        assert_eq!(first_page.events.len(), 2);
        assert!(first_page.has_more);

        let cursor = first_page.next_cursor.unwrap();
        let second_page = store.list(Some(&cursor), 2).await.unwrap();
        let ids: Vec<&str> = second_page.events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1"]);
    }

    #[tokio::test]
    async fn append_is_idempotent_on_event_id() {
        let store = InMemoryStore::new();
        store.append(event("e1")).await.unwrap();
        store.append(event("e1")).await.unwrap();
        let all = store.list_all_ascending().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn malformed_cursor_is_validation_error() {
        let store = InMemoryStore::new();
        let err = store.list(Some("not-a-number"), 10).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
