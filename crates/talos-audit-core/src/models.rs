//! # Core Data Models for the Audit Log
//!
//! This module defines the fundamental types exchanged between the ingest
//! orchestrator, the Merkle accumulator, and the store port. Each type is
//! designed so that tamper-evidence is a property of the type system, not
//! of caller discipline.
//!
//! ## Threat Model
//!
//! - **Key Reordering / Whitespace Attacks**: `Event::canonical_bytes` relies
//!   on [`crate::canonicalize`] so that two JSON renderings of the same event
//!   always hash identically.
//! - **Hash Substitution**: `event_hash` is recomputed and compared on every
//!   ingest; the stored value is never trusted blindly.
//! - **Ambiguous Proof Orientation**: [`ProofStep`] records the sibling's
//!   position explicitly rather than leaving it to be inferred from index
//!   parity at verification time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SHA-256 hash output size in bytes.
pub const HASH_SIZE: usize = 32;

/// A 32-byte SHA-256 hash value.
pub type Hash = [u8; HASH_SIZE];

/// Renders a [`Hash`] as lowercase hex.
pub fn hash_to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Parses lowercase hex into a [`Hash`]; fails if the length or alphabet is wrong.
pub fn hash_from_hex(s: &str) -> Option<Hash> {
    let bytes = hex::decode(s).ok()?;
    bytes.try_into().ok()
}

/// An immutable audit event as submitted by a producer.
///
/// `event_hash` is the hex SHA-256 digest of the canonical serialization of
/// every other field. The orchestrator recomputes it on ingest; callers must
/// not assume the stored value is trustworthy until it has passed through
/// [`crate::ingest::AuditService::ingest_event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default = "default_schema_id")]
    pub schema_id: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub event_id: String,
    pub ts: String,
    pub request_id: String,
    pub surface_id: String,
    pub outcome: String,
    pub principal: BTreeMap<String, serde_json::Value>,
    pub http: BTreeMap<String, serde_json::Value>,
    pub meta: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<BTreeMap<String, serde_json::Value>>,
    pub event_hash: String,
}

fn default_schema_id() -> String {
    "talos.audit_event".to_string()
}

fn default_schema_version() -> String {
    "v1".to_string()
}

impl Event {
    /// Serializes every field except `event_hash` to a [`serde_json::Value`],
    /// the input to [`crate::canonicalize::canonicalize`].
    ///
    /// Field order in the returned object is irrelevant: canonicalization
    /// sorts keys independently of how `serde_json` emits them.
    pub fn hashable_value(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("schema_id".into(), self.schema_id.clone().into());
        obj.insert("schema_version".into(), self.schema_version.clone().into());
        obj.insert("event_id".into(), self.event_id.clone().into());
        obj.insert("ts".into(), self.ts.clone().into());
        obj.insert("request_id".into(), self.request_id.clone().into());
        obj.insert("surface_id".into(), self.surface_id.clone().into());
        obj.insert("outcome".into(), self.outcome.clone().into());
        obj.insert("principal".into(), map_to_value(&self.principal));
        obj.insert("http".into(), map_to_value(&self.http));
        obj.insert("meta".into(), map_to_value(&self.meta));
        if let Some(resource) = &self.resource {
            obj.insert("resource".into(), map_to_value(resource));
        }
        serde_json::Value::Object(obj)
    }
}

fn map_to_value(map: &BTreeMap<String, serde_json::Value>) -> serde_json::Value {
    serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

/// The sibling's position relative to the node being proved at a given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Right,
}

/// One step of an inclusion proof: a sibling digest and its orientation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub position: Position,
    #[serde(with = "hex_hash")]
    pub hash: Hash,
}

/// Full inclusion proof for one event, sufficient to recompute the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofView {
    pub event_id: String,
    #[serde(with = "hex_hash")]
    pub entry_hash: Hash,
    pub root: String,
    pub height: usize,
    pub path: Vec<ProofStep>,
    pub index: usize,
}

/// JSON body of `GET /root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootView {
    pub root: String,
}

/// One page of a descending, cursor-paginated event listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

mod hex_hash {
    use super::Hash;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::hash_from_hex(&s).ok_or_else(|| serde::de::Error::custom("invalid hash hex"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let hash: Hash = [7u8; 32];
        let hex = hash_to_hex(&hash);
        assert_eq!(hash_from_hex(&hex), Some(hash));
    }

    #[test]
    fn hash_from_hex_rejects_bad_length() {
        assert_eq!(hash_from_hex("ab"), None);
    }

    #[test]
    fn hashable_value_excludes_event_hash() {
        let event = Event {
            schema_id: default_schema_id(),
            schema_version: default_schema_version(),
            event_id: "e1".into(),
            ts: "2026-01-01T00:00:00Z".into(),
            request_id: "r1".into(),
            surface_id: "s1".into(),
            outcome: "success".into(),
            principal: BTreeMap::new(),
            http: BTreeMap::new(),
            meta: BTreeMap::new(),
            resource: None,
            event_hash: "deadbeef".into(),
        };
        let value = event.hashable_value();
        assert!(value.get("event_hash").is_none());
        assert!(value.get("resource").is_none());
    }
}
