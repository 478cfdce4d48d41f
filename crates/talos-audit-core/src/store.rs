//! # Store Port
//!
//! The ingest orchestrator depends only on this trait. Concrete adapters
//! (`talos-audit-store-memory`, `talos-audit-store-postgres`) live in their
//! own crates and are wired in by the composition root, never referenced
//! here.

use crate::error::DomainError;
use crate::models::{Event, EventPage};
use async_trait::async_trait;

/// Append-only, cursor-paginated event storage.
///
/// Implementations must be idempotent on `event_id`: a second `append` call
/// with an id that already exists is a silent no-op, since the orchestrator
/// has already rejected the duplicate upstream via the Merkle tree's
/// membership check. `list` returns events in descending cursor order.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persists `event` durably. Must not return until the event is
    /// guaranteed visible to subsequent `list` calls.
    async fn append(&self, event: Event) -> Result<(), DomainError>;

    /// Returns up to `limit` events strictly older than `before` (by
    /// cursor), newest first. `before = None` starts from the newest event.
    async fn list(&self, before: Option<&str>, limit: usize) -> Result<EventPage, DomainError>;

    /// All events in ascending (original append) order, for startup
    /// recovery. Adapters may implement this by paging through `list` and
    /// reversing, or with a dedicated query.
    async fn list_all_ascending(&self) -> Result<Vec<Event>, DomainError>;
}
