//! Per-block undo entries.

use serde::{Deserialize, Serialize};

use tessera_types::{TxId, TxOutput, TxOutputKey};

/// Everything one block changed, so it can be reverted exactly.
///
/// Governance records appended after a block was parsed (parameter changes,
/// issuances) are charged to that block's entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockUndo {
    pub height: u32,
    /// Whether this block started a new cycle.
    pub cycle_added: bool,
    /// Keys inserted into the unspent map, in insertion order.
    pub added_unspent: Vec<TxOutputKey>,
    /// Outputs moved from unspent to spent, with their unspent form.
    pub spent: Vec<(TxOutputKey, TxOutput)>,
    pub txs: Vec<TxId>,
    pub marker_records: usize,
    pub param_changes: usize,
    /// Issuance candidates promoted into the unspent map.
    pub issuances: Vec<TxOutputKey>,
    /// Set when this block confirmed the genesis transaction.
    pub genesis: bool,
}

impl BlockUndo {
    pub fn new(height: u32) -> Self {
        Self {
            height,
            ..Default::default()
        }
    }
}
