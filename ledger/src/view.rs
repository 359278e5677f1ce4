//! Read-only view of the ledger used by transaction classification.

use tessera_governance::{ParamLookup, Phase};
use tessera_types::{TxOutput, TxOutputKey};

/// What a classifier may ask of the ledger.
///
/// Implemented by [`LedgerState`](crate::LedgerState). During a parse the
/// state is read through the open [`BlockWriter`](crate::BlockWriter), so each
/// transaction sees the effects of the ones before it in the same block.
pub trait LedgerView: ParamLookup {
    /// The output if it is currently an unspent token output.
    fn unspent_output(&self, key: &TxOutputKey) -> Option<&TxOutput>;

    fn phase_for_height(&self, height: u32) -> Phase;

    fn is_in_phase(&self, height: u32, phase: Phase) -> bool {
        phase != Phase::Undefined && self.phase_for_height(height) == phase
    }
}
