//! Deterministic fingerprints of the ledger.
//!
//! Two nodes that parsed the same chain produce the same state hash. The
//! per-height [`StateHashChain`] lets peers find the first height at which
//! they diverge.

use serde::{Deserialize, Serialize};

use tessera_crypto::{blake2b_256, chain_hash};
use tessera_types::Block;

use crate::LedgerState;

impl LedgerState {
    /// Blake2b-256 over the canonical encoding of the consensus-relevant
    /// state. Undo entries and caches are excluded.
    pub fn state_hash(&self) -> [u8; 32] {
        let canonical = (
            self.chain_height(),
            self.unspent_outputs(),
            self.spent_outputs(),
            self.cycles(),
            self.issuances(),
            self.param_changes(),
        );
        let bytes = bincode::serialize(&canonical).expect("state serialization should not fail");
        blake2b_256(&bytes)
    }

    /// Hash of the last `n` blocks only, for a cheap comparison of recent
    /// history.
    pub fn hash_of_last_blocks(&self, n: usize) -> [u8; 32] {
        let blocks = self.blocks();
        hash_of_block_window(&blocks[blocks.len().saturating_sub(n)..])
    }
}

/// Blake2b-256 over the canonical encoding of a block window.
pub fn hash_of_block_window(blocks: &[Block]) -> [u8; 32] {
    let bytes = bincode::serialize(blocks).expect("block serialization should not fail");
    blake2b_256(&bytes)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateHashEntry {
    pub height: u32,
    /// `H(prev_hash || state_hash)`.
    pub hash: [u8; 32],
    pub prev_hash: [u8; 32],
}

/// Chained state hashes, one per parsed height.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateHashChain {
    entries: Vec<StateHashEntry>,
}

impl StateHashChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link the state hash at `height` onto the chain.
    pub fn push(&mut self, height: u32, state_hash: [u8; 32]) -> &StateHashEntry {
        let prev_hash = self.entries.last().map_or([0u8; 32], |e| e.hash);
        self.entries.push(StateHashEntry {
            height,
            hash: chain_hash(&prev_hash, &state_hash),
            prev_hash,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Drop entries above `height`, after a rollback.
    pub fn truncate_above(&mut self, height: u32) {
        let keep = self.entries.partition_point(|e| e.height <= height);
        self.entries.truncate(keep);
    }

    pub fn latest(&self) -> Option<&StateHashEntry> {
        self.entries.last()
    }

    pub fn at(&self, height: u32) -> Option<&StateHashEntry> {
        self.entries
            .binary_search_by_key(&height, |e| e.height)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lowest height present in both chains whose hashes differ.
    pub fn first_conflict(&self, other: &StateHashChain) -> Option<u32> {
        self.entries
            .iter()
            .filter_map(|e| other.at(e.height).map(|o| (e, o)))
            .find(|(e, o)| e.hash != o.hash)
            .map(|(e, _)| e.height)
    }
}
