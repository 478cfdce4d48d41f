//! # Ingest Orchestrator
//!
//! Coordinates the canonicalizer, the Merkle accumulator, the store port,
//! and the broadcaster into the single operation external callers actually
//! want: "accept this event, or tell me why not." Binds the store/tree
//! invariant (`event accepted` implies both `in the store` and `in the
//! tree`) behind one lock.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌────────────────────┐
//!                    │    AuditService    │
//!                    │      (Facade)      │
//!                    └─────────┬──────────┘
//!                              │
//!          ┌───────────┬───────┴───────┬───────────┐
//!          │           │               │           │
//!          ▼           ▼               ▼           ▼
//!    ┌──────────┐ ┌──────────┐  ┌──────────┐ ┌──────────┐
//!    │Canonical-│ │  Merkle  │  │  Store   │ │Broadcast-│
//!    │  izer    │ │   Tree   │  │  (port)  │ │    er    │
//!    └──────────┘ └──────────┘  └──────────┘ └──────────┘
//! ```

use crate::broadcaster::Broadcaster;
use crate::canonicalize::hash_canonical;
use crate::error::DomainError;
use crate::merkle::MerkleTree;
use crate::models::{hash_from_hex, hash_to_hex, Event, EventPage, ProofView, RootView};
use crate::store::AuditStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

const MAX_LIST_LIMIT: usize = 200;

/// Coordinates verification, persistence, anchoring, and broadcast for
/// incoming audit events.
///
/// # Concurrency
///
/// `ingest_event` holds `ingest_lock` across `store.append`,
/// `merkle.add_leaf`, and `broadcaster.publish`, guaranteeing that any event
/// visible in the store is also visible in the tree and vice versa, and that
/// the order subscribers observe published events matches the order ingest
/// locks were acquired. `publish` is a non-blocking `try_send` per
/// subscriber, so holding the lock across it costs nothing. Read operations
/// (`get_root`, `get_proof`, `list_events`) do not take the ingest lock for
/// the store path, but `get_root`/`get_proof` read through the same
/// mutex-guarded tree to avoid observing a half-updated spine.
pub struct AuditService {
    store: Arc<dyn AuditStore>,
    broadcaster: Option<Broadcaster>,
    ingest_lock: Mutex<MerkleTree>,
}

impl AuditService {
    /// Constructs the orchestrator and performs startup recovery: every
    /// previously accepted event is replayed into a fresh Merkle tree in
    /// original append order.
    pub async fn new(store: Arc<dyn AuditStore>, broadcaster: Option<Broadcaster>) -> Result<Self, DomainError> {
        let events = store.list_all_ascending().await?;
        let mut tree = MerkleTree::new();
        let leaves = events
            .iter()
            .filter_map(|event| {
                let recomputed = hash_to_hex(&hash_canonical(&event.hashable_value()));
                if recomputed != event.event_hash {
                    warn!(event_id = %event.event_id, "stored event failed hash re-verification on recovery");
                }
                hash_from_hex(&event.event_hash).map(|h| (event.event_id.clone(), h))
            })
            .collect::<Vec<_>>();
        let count = leaves.len();
        tree.initialize_from(leaves);
        info!(recovered_events = count, "merkle tree rehydrated from store");

        Ok(AuditService {
            store,
            broadcaster,
            ingest_lock: Mutex::new(tree),
        })
    }

    /// Verifies, persists, anchors, and broadcasts `event`.
    ///
    /// 1. Recompute `event_hash` from the canonical bytes of every other
    ///    field; mismatch is a [`DomainError::Validation`].
    /// 2. Reject a known `event_id` as [`DomainError::Conflict`].
    /// 3. Persist via the store port.
    /// 4. Anchor as a new Merkle leaf.
    /// 5. Best-effort broadcast to live subscribers, still inside the ingest
    ///    lock so subscriber-observed order matches lock-acquisition order.
    pub async fn ingest_event(&self, event: Event) -> Result<Event, DomainError> {
        let expected_hash = hash_to_hex(&hash_canonical(&event.hashable_value()));
        if expected_hash != event.event_hash {
            return Err(DomainError::validation(format!(
                "event_hash mismatch for {}: expected {}",
                event.event_id, expected_hash
            )));
        }
        let leaf_hash = hash_from_hex(&event.event_hash)
            .ok_or_else(|| DomainError::validation("event_hash is not valid hex"))?;

        let mut tree = self.ingest_lock.lock().await;
        if tree.has_event(&event.event_id) {
            return Err(DomainError::conflict(format!("event {} already exists", event.event_id)));
        }

        self.store.append(event.clone()).await?;
        tree.add_leaf(&event.event_id, leaf_hash)
            .expect("merkle tree rejected a leaf the orchestrator already checked for duplication");

        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.publish(event.clone()).await;
        }
        drop(tree);

        Ok(event)
    }

    /// Current Merkle root, hex-encoded; empty string if no events yet.
    pub async fn get_root(&self) -> RootView {
        let tree = self.ingest_lock.lock().await;
        let root = tree.get_root();
        let is_empty = tree.is_empty();
        RootView { root: if is_empty { String::new() } else { hash_to_hex(&root) } }
    }

    /// Inclusion proof for `event_id`, or [`DomainError::NotFound`].
    pub async fn get_proof(&self, event_id: &str) -> Result<ProofView, DomainError> {
        let tree = self.ingest_lock.lock().await;
        tree.get_proof(event_id)
            .ok_or_else(|| DomainError::not_found(format!("event {event_id} not found")))
    }

    /// Paginated, descending-cursor listing. `limit` is clamped to
    /// `[1, 200]`.
    pub async fn list_events(&self, before: Option<&str>, limit: usize) -> Result<EventPage, DomainError> {
        let clamped = limit.clamp(1, MAX_LIST_LIMIT);
        self.store.list(before, clamped).await
    }

    /// Subscribes to the live broadcast stream. `None` if this service was
    /// constructed without a broadcaster.
    pub async fn subscribe(&self) -> Option<crate::broadcaster::Subscription> {
        match &self.broadcaster {
            Some(b) => Some(b.subscribe().await),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcaster::Broadcaster;
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;

    struct InMemoryStore {
        events: StdMutex<Vec<Event>>,
    }

    impl InMemoryStore {
        fn new() -> Self {
            InMemoryStore { events: StdMutex::new(Vec::new()) }
        }
    }

    #[async_trait::async_trait]
    impl AuditStore for InMemoryStore {
        async fn append(&self, event: Event) -> Result<(), DomainError> {
            let mut events = self.events.lock().unwrap();
            if !events.iter().any(|e| e.event_id == event.event_id) {
                events.push(event);
            }
            Ok(())
        }

        async fn list(&self, before: Option<&str>, limit: usize) -> Result<EventPage, DomainError> {
            let events = self.events.lock().unwrap();
            let mut slice: Vec<Event> = events
                .iter()
                .rev()
                .filter(|e| before.map_or(true, |b| e.event_id.as_str() < b))
                .take(limit)
                .cloned()
                .collect();
            let has_more = slice.len() == limit;
            let next_cursor = slice.last().map(|e| e.event_id.clone());
            slice.truncate(limit);
            Ok(EventPage { events: slice, next_cursor, has_more })
        }

        async fn list_all_ascending(&self) -> Result<Vec<Event>, DomainError> {
            Ok(self.events.lock().unwrap().clone())
        }
    }

    fn build_event(id: &str) -> Event {
        let mut event = Event {
            schema_id: "talos.audit_event".into(),
            schema_version: "v1".into(),
            event_id: id.into(),
            ts: "2026-01-01T00:00:00Z".into(),
            request_id: "r1".into(),
            surface_id: "s1".into(),
            outcome: "success".into(),
            principal: BTreeMap::new(),
            http: BTreeMap::new(),
            meta: BTreeMap::new(),
            resource: None,
            event_hash: String::new(),
        };
        let hash = hash_canonical(&event.hashable_value());
        event.event_hash = hash_to_hex(&hash);
        event
    }

    async fn service() -> AuditService {
        let store = Arc::new(InMemoryStore::new());
        AuditService::new(store, Some(Broadcaster::new(8))).await.unwrap()
    }

    #[tokio::test]
    async fn ingest_then_root_and_proof() {
        let svc = service().await;
        let event = build_event("e1");
        svc.ingest_event(event.clone()).await.unwrap();

        let root = svc.get_root().await;
        assert_eq!(root.root, event.event_hash);

        let proof = svc.get_proof("e1").await.unwrap();
        assert!(proof.path.is_empty());
    }

    #[tokio::test]
    async fn bad_hash_is_rejected() {
        let svc = service().await;
        let mut event = build_event("e1");
        event.event_hash = "0".repeat(64);
        let err = svc.ingest_event(event).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(svc.get_root().await.root, "");
    }

    #[tokio::test]
    async fn duplicate_event_id_is_conflict() {
        let svc = service().await;
        let event = build_event("e1");
        svc.ingest_event(event.clone()).await.unwrap();
        let root_after_first = svc.get_root().await;

        let err = svc.ingest_event(event).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(svc.get_root().await, root_after_first);
    }

    #[tokio::test]
    async fn unknown_event_proof_is_not_found() {
        let svc = service().await;
        let err = svc.get_proof("missing").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn recovery_rebuilds_identical_root() {
        let store = Arc::new(InMemoryStore::new());
        let svc = AuditService::new(store.clone(), None).await.unwrap();
        for i in 0..4 {
            svc.ingest_event(build_event(&format!("e{i}"))).await.unwrap();
        }
        let root_before = svc.get_root().await;

        let recovered = AuditService::new(store, None).await.unwrap();
        assert_eq!(recovered.get_root().await, root_before);
    }

    #[tokio::test]
    async fn accepted_event_broadcasts_to_subscriber() {
        let svc = service().await;
        let mut sub = svc.subscribe().await.unwrap();
        let event = build_event("e1");
        svc.ingest_event(event.clone()).await.unwrap();
        let received = sub.recv().await.unwrap();
        assert_eq!(received.event_id, "e1");
    }
}
