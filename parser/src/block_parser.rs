//! Folds a block into the ledger.

use tracing::{debug, info};

use tessera_governance::{Cycle, CycleService};
use tessera_ledger::{LedgerState, MarkerRecord};
use tessera_types::{GenesisTxInfo, NetworkId, RawBlock, TxId, TxOutput, TxType};

use crate::{dependency_order, ParseError, TxClassifier};

/// What one parsed block changed, for downstream notification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseResult {
    pub height: u32,
    /// Token transactions recorded, in parse order.
    pub txs: Vec<(TxId, TxType)>,
    /// Token outputs the block created.
    pub new_outputs: Vec<TxOutput>,
    pub marker_records: Vec<MarkerRecord>,
    /// Set when this block started a new governance cycle.
    pub new_cycle: Option<Cycle>,
}

/// Parses blocks into a [`LedgerState`].
#[derive(Clone, Debug)]
pub struct BlockParser {
    classifier: TxClassifier,
    cycle_service: CycleService,
}

impl BlockParser {
    pub fn new(genesis: GenesisTxInfo, network: NetworkId) -> Self {
        Self {
            classifier: TxClassifier::new(genesis),
            cycle_service: CycleService::new(genesis.block_height, network),
        }
    }

    pub fn classifier(&self) -> &TxClassifier {
        &self.classifier
    }

    pub fn cycle_service(&self) -> &CycleService {
        &self.cycle_service
    }

    /// Parse `block` on top of `state`.
    ///
    /// A block that does not extend the head is rejected before anything is
    /// touched. Otherwise the block is applied in full: per-transaction
    /// problems only degrade that transaction.
    pub fn parse_block(
        &self,
        block: &RawBlock,
        state: &mut LedgerState,
    ) -> Result<ParseResult, ParseError> {
        if !state.connects(block.height, &block.prev_hash) {
            return Err(ParseError::BlockNotConnecting {
                height: block.height,
                expected_height: state.next_block_height(),
                prev_hash: block.prev_hash,
                head_hash: state.head_hash(),
            });
        }

        let height = block.height;
        let mut result = ParseResult {
            height,
            ..Default::default()
        };
        let mut writer = state.open_block(block);

        // Cycles are extended before any tx is classified so that phase checks
        // see the cycle this block belongs to.
        let new_cycle = {
            let view = writer.state();
            self.cycle_service
                .on_new_block_height(height, view.cycles(), view)
        };
        if let Some(cycle) = new_cycle {
            info!(
                height,
                first_block = cycle.height_of_first_block,
                last_block = cycle.height_of_last_block(),
                "new governance cycle"
            );
            writer.add_cycle(cycle.clone());
            result.new_cycle = Some(cycle);
        }

        for raw in dependency_order(&block.txs) {
            let Some(classification) = self.classifier.classify(raw, height, writer.state()) else {
                continue;
            };
            let tx = classification.tx;
            result.txs.push((tx.id, tx.tx_type));
            result
                .new_outputs
                .extend(tx.outputs.iter().filter(|o| o.is_token_bearing()).cloned());
            if let Some(record) = classification.marker {
                writer.add_marker_record(record.clone());
                result.marker_records.push(record);
            }
            writer.apply_tx(tx);
        }

        debug!(
            height,
            txs = block.txs.len(),
            token_txs = result.txs.len(),
            new_outputs = result.new_outputs.len(),
            "block parsed"
        );
        Ok(result)
    }
}
