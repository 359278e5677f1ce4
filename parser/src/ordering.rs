//! Dependency ordering of a block's transactions.

use std::collections::BTreeSet;

use tracing::warn;

use tessera_types::{RawTx, TxId};

/// Upper bound on ordering passes. Each pass releases at least one
/// transaction unless the block contains a cycle, so this is only reached by
/// pathological blocks.
pub const MAX_ORDERING_PASSES: usize = 5300;

const WARN_AFTER_PASSES: usize = 1000;

/// Order `txs` so that every transaction spending an output of another
/// transaction in the same block comes after it.
///
/// Each pass takes, in list order, the transactions none of whose inputs
/// point at a transaction still waiting; the rest wait for the next pass.
/// A block without same-block spends keeps its list order.
pub fn dependency_order(txs: &[RawTx]) -> Vec<&RawTx> {
    let mut ordered = Vec::with_capacity(txs.len());
    let mut waiting: Vec<&RawTx> = txs.iter().collect();
    let mut passes = 0;

    while !waiting.is_empty() {
        passes += 1;
        if passes == WARN_AFTER_PASSES {
            warn!(
                remaining = waiting.len(),
                "block has unusually deep chain of same-block spends"
            );
        }
        if passes > MAX_ORDERING_PASSES {
            warn!(
                remaining = waiting.len(),
                "ordering pass limit reached, keeping list order for the rest"
            );
            ordered.extend(waiting);
            break;
        }

        let pending: BTreeSet<TxId> = waiting.iter().map(|tx| tx.id).collect();
        let (ready, blocked): (Vec<&RawTx>, Vec<&RawTx>) = waiting.into_iter().partition(|tx| {
            tx.inputs
                .iter()
                .all(|i| i.connected_tx_id == tx.id || !pending.contains(&i.connected_tx_id))
        });

        if ready.is_empty() {
            warn!(
                remaining = blocked.len(),
                "cyclic same-block spends, keeping list order for the rest"
            );
            ordered.extend(blocked);
            break;
        }
        ordered.extend(ready);
        waiting = blocked;
    }
    ordered
}
