//! # Append-Only Merkle Accumulator
//!
//! Maintains a Merkle tree over audit events in strict insertion order and
//! exposes the current root plus O(log n) inclusion proofs. Unlike a
//! key-sorted tree, leaf position here is the event's arrival order, which
//! is what makes a proof meaningful as evidence of "this was accepted, and
//! nothing before or after it was silently altered."
//!
//! ## Threat Model
//!
//! - **Tamper Evidence**: any change to an accepted leaf changes the root.
//! - **Efficient Proofs**: O(log n) proof size and, with the incremental
//!   update below, O(log n) amortized cost per insert rather than O(n log n).
//! - **Collision Resistance**: SHA-256 prevents crafted second-preimages at
//!   the cost budget assumed by this design (see module docs on domain
//!   separation in the crate root).
//!
//! ## How It Works
//!
//! ```text
//!                    Root Hash
//!                   /         \
//!           H(H1+H2)           H(H3+H3)
//!            /    \             /
//!           /      \           /
//!         H1       H2        H3
//!         |        |         |
//!       Leaf1    Leaf2     Leaf3
//! ```
//!
//! A three-leaf tree duplicates the last node at each odd-length level
//! rather than leaving it unpaired. Appending a fourth leaf only touches the
//! rightmost node of every level: `add_leaf` walks that spine instead of
//! rebuilding the tree from scratch.
//!
//! ## References
//!
//! - Merkle, R. C. (1979) - "Secrecy, Authentication, and Public Key Systems"
//! - RFC 6962 - Certificate Transparency (considered and not adopted here;
//!   see crate root docs for the domain-separation decision)

use crate::models::{Hash, Position, ProofStep, ProofView, HASH_SIZE};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// An empty hash (all zeros), the root of a tree with no leaves.
pub const EMPTY_HASH: Hash = [0u8; HASH_SIZE];

/// Errors raised by accumulator mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleError {
    #[error("leaf already present for event id {0}")]
    DuplicateLeaf(String),
}

/// An append-only Merkle tree over leaves in insertion order.
///
/// # Thread Safety
///
/// Not internally synchronized. The ingest orchestrator serializes all
/// mutation behind its ingest lock; reads (`get_root`, `get_proof`) are safe
/// to call concurrently with each other but not with `add_leaf`.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// `levels[0]` are leaf hashes in insertion order; `levels[top]` holds
    /// exactly one element, the root, once any leaf has been added.
    levels: Vec<Vec<Hash>>,
    index_by_event_id: HashMap<String, usize>,
}

impl MerkleTree {
    /// Creates an empty tree. `get_root()` on an empty tree is all zeros.
    pub fn new() -> Self {
        MerkleTree {
            levels: Vec::new(),
            index_by_event_id: HashMap::new(),
        }
    }

    /// Number of leaves currently in the tree.
    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, |l| l.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if an event with this id has already been anchored.
    pub fn has_event(&self, event_id: &str) -> bool {
        self.index_by_event_id.contains_key(event_id)
    }

    /// Appends a new leaf for `event_id` and incrementally updates the
    /// rightmost spine of the tree. Returns the leaf's zero-based index.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::DuplicateLeaf`] if `event_id` is already
    /// present. The ingest orchestrator checks this ahead of time, so in
    /// normal operation this branch is unreachable.
    pub fn add_leaf(&mut self, event_id: &str, leaf_hash: Hash) -> Result<usize, MerkleError> {
        if self.index_by_event_id.contains_key(event_id) {
            return Err(MerkleError::DuplicateLeaf(event_id.to_string()));
        }

        if self.levels.is_empty() {
            self.levels.push(Vec::new());
        }
        self.levels[0].push(leaf_hash);
        let index = self.levels[0].len() - 1;
        self.index_by_event_id.insert(event_id.to_string(), index);

        self.restructure_rightmost_spine();
        Ok(index)
    }

    /// Rebuilds one batch of leaves from scratch, used only at startup
    /// recovery where the full sequence is already known.
    pub fn initialize_from<I>(&mut self, leaves: I)
    where
        I: IntoIterator<Item = (String, Hash)>,
    {
        self.levels.clear();
        self.index_by_event_id.clear();
        let mut base = Vec::new();
        for (event_id, hash) in leaves {
            let index = base.len();
            base.push(hash);
            self.index_by_event_id.insert(event_id, index);
        }
        if base.is_empty() {
            return;
        }
        self.levels.push(base);
        loop {
            let current = self.levels.last().unwrap();
            if current.len() <= 1 {
                break;
            }
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            for chunk in current.chunks(2) {
                if chunk.len() == 2 {
                    next.push(hash_pair(&chunk[0], &chunk[1]));
                } else {
                    next.push(hash_pair(&chunk[0], &chunk[0]));
                }
            }
            self.levels.push(next);
        }
    }

    /// Only the rightmost node of every level can have changed after a
    /// single append; walk that spine instead of rebuilding every level.
    fn restructure_rightmost_spine(&mut self) {
        let mut lvl = 0;
        while self.levels[lvl].len() > 1 {
            let level_len = self.levels[lvl].len();
            let idx = level_len - 1;
            let parent_hash = if idx % 2 == 1 {
                hash_pair(&self.levels[lvl][idx - 1], &self.levels[lvl][idx])
            } else {
                hash_pair(&self.levels[lvl][idx], &self.levels[lvl][idx])
            };
            let parent_idx = idx / 2;

            if self.levels.len() == lvl + 1 {
                self.levels.push(Vec::new());
            }
            let next_len = self.levels[lvl + 1].len();
            if parent_idx < next_len {
                self.levels[lvl + 1][parent_idx] = parent_hash;
            } else {
                self.levels[lvl + 1].push(parent_hash);
            }
            lvl += 1;
        }
    }

    /// Current root, or `EMPTY_HASH` when no leaves have been added.
    pub fn get_root(&self) -> Hash {
        self.levels.last().and_then(|top| top.first().copied()).unwrap_or(EMPTY_HASH)
    }

    /// Builds the inclusion proof for `event_id`, or `None` if unknown.
    pub fn get_proof(&self, event_id: &str) -> Option<ProofView> {
        let index = *self.index_by_event_id.get(event_id)?;
        let entry_hash = self.levels[0][index];
        let mut cur = index;
        let mut path = Vec::new();

        for level in self.levels.iter().take(self.levels.len().saturating_sub(1)) {
            let sibling_index = if cur % 2 == 0 {
                if cur + 1 < level.len() {
                    cur + 1
                } else {
                    cur
                }
            } else {
                cur - 1
            };
            let position = if sibling_index > cur { Position::Right } else { Position::Left };
            path.push(ProofStep { position, hash: level[sibling_index] });
            cur /= 2;
        }

        Some(ProofView {
            event_id: event_id.to_string(),
            entry_hash,
            root: crate::models::hash_to_hex(&self.get_root()),
            height: self.levels.len(),
            path,
            index,
        })
    }
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifies a proof by replaying it against `entry_hash` and comparing to
/// `expected_root`. Exposed for callers (tests, external verifiers) that
/// want to check a [`ProofView`] without holding a live tree.
pub fn verify_proof(entry_hash: &Hash, path: &[ProofStep], expected_root: &Hash) -> bool {
    let mut current = *entry_hash;
    for step in path {
        current = match step.position {
            Position::Right => hash_pair(&current, &step.hash),
            Position::Left => hash_pair(&step.hash, &current),
        };
    }
    current == *expected_root
}

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}
