//! # Tamper-Evident Audit Log — Core
//!
//! This crate implements the integrity pipeline of an append-only audit
//! log: canonical serialization, SHA-256 hash verification, an incremental
//! Merkle accumulator, ingest orchestration, and live broadcast. It has no
//! knowledge of HTTP or of any concrete storage engine; those live in
//! sibling crates that depend on the [`store::AuditStore`] port.
//!
//! ## Threat Model
//!
//! | Threat | Component | Defense |
//! |--------|-----------|---------|
//! | Key-reordering hash bypass | [`canonicalize`] | RFC 8785 canonical bytes before hashing |
//! | Post-hoc event tampering | [`merkle`] | Root changes if any leaf changes |
//! | Replayed/duplicate ingestion | [`ingest`] | Reject known `event_id` before persisting |
//! | Store/tree divergence | [`ingest`] | Single ingest lock over append + anchor |
//! | Slow-consumer denial of service | [`broadcaster`] | Bounded per-subscriber queues, drop-newest |
//!
//! ## Architecture
//!
//! ```text
//! producer -> AuditService::ingest_event -> (canonicalize + sha256 check)
//!                                         -> (merkle membership check)
//!                                         -> store.append
//!                                         -> merkle.add_leaf
//!                                         -> broadcaster.publish
//! ```
//!
//! ## A Note on RFC 6962 Domain Separation
//!
//! Certificate Transparency prefixes leaf hashes with `0x00` and inner node
//! hashes with `0x01` to prevent an attacker from presenting an inner node
//! as if it were a leaf (a second-preimage substitution). This crate does
//! not apply that prefix: leaves are `sha256(canonical_event_bytes)` and
//! inner nodes are `sha256(left || right)` with no domain tag, matching the
//! worked root/proof values this service is expected to reproduce exactly.
//! A deployment that does not need byte-for-byte compatibility with those
//! values should add RFC 6962-style domain separation; this is recorded as
//! an explicit, deliberate decision rather than an oversight.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use talos_audit_core::{ingest::AuditService, store::AuditStore};
//! # use std::sync::Arc;
//! # async fn run(store: Arc<dyn AuditStore>) -> Result<(), talos_audit_core::error::DomainError> {
//! let service = AuditService::new(store, None).await?;
//! let root = service.get_root().await;
//! println!("current root: {}", root.root);
//! # Ok(())
//! # }
//! ```

pub mod broadcaster;
pub mod canonicalize;
pub mod error;
pub mod ingest;
pub mod merkle;
pub mod models;
pub mod store;

pub use error::DomainError;
pub use ingest::AuditService;
pub use models::{Event, EventPage, Hash, ProofStep, ProofView, RootView};
pub use store::AuditStore;
