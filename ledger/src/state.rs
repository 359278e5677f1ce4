//! The ledger state and its block-at-a-time writer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info};

use tessera_governance::{
    latest_change, Cycle, GovernanceError, Param, ParamChange, ParamLookup, PeriodService, Phase,
};
use tessera_types::{
    Block, BlockHash, GenesisTxInfo, NetworkId, RawBlock, SpentInfo, Tx, TxId, TxOutput,
    TxOutputKey, TxOutputType, TxType,
};

use crate::{BlockUndo, Issuance, IssuanceType, LedgerError, LedgerView, MarkerRecord};

/// Default number of blocks that can be rolled back.
pub const DEFAULT_UNDO_DEPTH: usize = 100;

/// The canonical, replicated ledger state.
///
/// Owned by a single parse worker. Other readers take a clone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerState {
    network: NetworkId,
    genesis: GenesisTxInfo,
    blocks: Vec<Block>,
    unspent: BTreeMap<TxOutputKey, TxOutput>,
    spent: BTreeMap<TxOutputKey, SpentInfo>,
    /// Confirmation height of every recorded token tx.
    tx_heights: BTreeMap<TxId, u32>,
    cycles: Vec<Cycle>,
    param_changes: Vec<ParamChange>,
    issuances: BTreeMap<TxId, Issuance>,
    marker_records: Vec<MarkerRecord>,
    genesis_supply: u64,
    undo: VecDeque<BlockUndo>,
    undo_depth: usize,
}

/// Summary statistics for the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub chain_height: u32,
    pub blocks: usize,
    pub txs: usize,
    pub unspent_outputs: usize,
    pub spent_outputs: usize,
    pub cycles: usize,
    pub total_supply: u64,
    pub unspent_value: u64,
    pub burnt_fee: u64,
}

impl LedgerState {
    pub fn new(network: NetworkId, genesis: GenesisTxInfo, undo_depth: usize) -> Self {
        Self {
            network,
            genesis,
            blocks: Vec::new(),
            unspent: BTreeMap::new(),
            spent: BTreeMap::new(),
            tx_heights: BTreeMap::new(),
            cycles: Vec::new(),
            param_changes: Vec::new(),
            issuances: BTreeMap::new(),
            marker_records: Vec::new(),
            genesis_supply: 0,
            undo: VecDeque::new(),
            undo_depth: undo_depth.max(1),
        }
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn genesis(&self) -> &GenesisTxInfo {
        &self.genesis
    }

    // ── Blocks ──────────────────────────────────────────────────────────

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Height of the last parsed block. Before genesis is parsed this is the
    /// height just below genesis.
    pub fn chain_height(&self) -> u32 {
        self.blocks
            .last()
            .map_or(self.genesis.block_height.saturating_sub(1), |b| b.height)
    }

    /// Height the next block must have.
    pub fn next_block_height(&self) -> u32 {
        self.blocks
            .last()
            .map_or(self.genesis.block_height, |b| b.height + 1)
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn head_hash(&self) -> Option<BlockHash> {
        self.blocks.last().map(|b| b.hash)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block_at_height(&self, height: u32) -> Option<&Block> {
        let first = self.blocks.first()?.height;
        self.blocks.get(height.checked_sub(first)? as usize)
    }

    /// At most `max` blocks starting at `height`, for serving peers.
    pub fn blocks_from_height(&self, height: u32, max: usize) -> &[Block] {
        let Some(first) = self.blocks.first().map(|b| b.height) else {
            return &[];
        };
        let start = (height.saturating_sub(first) as usize).min(self.blocks.len());
        let end = start.saturating_add(max).min(self.blocks.len());
        &self.blocks[start..end]
    }

    /// Whether a block at `height` whose predecessor is `prev_hash` extends
    /// the current head. The first block must sit at the genesis height.
    pub fn connects(&self, height: u32, prev_hash: &BlockHash) -> bool {
        match self.blocks.last() {
            None => height == self.genesis.block_height,
            Some(head) => height == head.height + 1 && *prev_hash == head.hash,
        }
    }

    // ── Outputs and transactions ────────────────────────────────────────

    pub fn is_unspent(&self, key: &TxOutputKey) -> bool {
        self.unspent.contains_key(key)
    }

    /// Token value of an unspent output, zero when spent or unknown.
    pub fn unspent_value(&self, key: &TxOutputKey) -> u64 {
        self.unspent.get(key).map_or(0, |o| o.value)
    }

    pub fn spent_info(&self, key: &TxOutputKey) -> Option<&SpentInfo> {
        self.spent.get(key)
    }

    pub fn unspent_outputs(&self) -> &BTreeMap<TxOutputKey, TxOutput> {
        &self.unspent
    }

    pub fn spent_outputs(&self) -> &BTreeMap<TxOutputKey, SpentInfo> {
        &self.spent
    }

    pub fn tx(&self, tx_id: &TxId) -> Option<&Tx> {
        let height = *self.tx_heights.get(tx_id)?;
        self.block_at_height(height)?
            .txs
            .iter()
            .find(|tx| tx.id == *tx_id)
    }

    /// Any output of a recorded token tx, spent or not.
    pub fn tx_output(&self, key: &TxOutputKey) -> Option<&TxOutput> {
        self.tx(&key.tx_id)?.output(key.index)
    }

    pub fn tx_type(&self, tx_id: &TxId) -> Option<TxType> {
        self.tx(tx_id).map(|tx| tx.tx_type)
    }

    pub fn tx_count(&self) -> usize {
        self.tx_heights.len()
    }

    /// Bonds currently locked up.
    pub fn lockup_outputs(&self) -> impl Iterator<Item = &TxOutput> {
        self.unspent
            .values()
            .filter(|o| o.output_type == TxOutputType::Lockup)
    }

    pub fn total_unspent_value(&self) -> u64 {
        self.unspent.values().map(|o| o.value).sum()
    }

    pub fn total_burnt_fee(&self) -> u64 {
        self.blocks
            .iter()
            .flat_map(|b| &b.txs)
            .map(|tx| tx.burnt_fee)
            .sum()
    }

    // ── Governance ──────────────────────────────────────────────────────

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn periods(&self) -> PeriodService<'_> {
        PeriodService::new(&self.cycles)
    }

    pub fn param_changes(&self) -> &[ParamChange] {
        &self.param_changes
    }

    pub fn param_changes_for(&self, param: Param) -> impl Iterator<Item = &ParamChange> {
        self.param_changes.iter().filter(move |c| c.param == param)
    }

    pub fn issuances(&self) -> &BTreeMap<TxId, Issuance> {
        &self.issuances
    }

    pub fn issuance(&self, tx_id: &TxId) -> Option<&Issuance> {
        self.issuances.get(tx_id)
    }

    pub fn marker_records(&self) -> &[MarkerRecord] {
        &self.marker_records
    }

    pub fn genesis_supply(&self) -> u64 {
        self.genesis_supply
    }

    pub fn total_issued(&self) -> u64 {
        self.issuances.values().map(|i| i.amount).sum()
    }

    /// Genesis supply plus everything governance has issued since.
    pub fn total_supply(&self) -> u64 {
        self.genesis_supply + self.total_issued()
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            chain_height: self.chain_height(),
            blocks: self.blocks.len(),
            txs: self.tx_heights.len(),
            unspent_outputs: self.unspent.len(),
            spent_outputs: self.spent.len(),
            cycles: self.cycles.len(),
            total_supply: self.total_supply(),
            unspent_value: self.total_unspent_value(),
            burnt_fee: self.total_burnt_fee(),
        }
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Append the header of `raw` as the new head and start its undo entry.
    ///
    /// The caller checks [`connects`](Self::connects) first; nothing after
    /// this point can fail, so a block is never half applied.
    pub fn open_block(&mut self, raw: &RawBlock) -> BlockWriter<'_> {
        debug_assert!(self.connects(raw.height, &raw.prev_hash));
        self.blocks.push(Block::from_raw_header(raw));
        self.undo.push_back(BlockUndo::new(raw.height));
        while self.undo.len() > self.undo_depth {
            self.undo.pop_front();
        }
        BlockWriter { state: self }
    }

    /// Record an approved parameter change. Charged to the current head so
    /// that a reorg below it removes the change again.
    pub fn add_param_change(&mut self, change: ParamChange) -> Result<(), LedgerError> {
        if self.blocks.is_empty() {
            return Err(LedgerError::Empty);
        }
        info!(
            param = %change.param,
            value = change.value,
            activation_height = change.activation_height,
            "parameter change recorded"
        );
        self.param_changes.push(change);
        if let Some(undo) = self.undo.back_mut() {
            undo.param_changes += 1;
        }
        Ok(())
    }

    /// Approve the issuance requested by `tx_id`: its issuance candidate
    /// output becomes an unspent token output.
    pub fn add_issuance(&mut self, tx_id: TxId) -> Result<Issuance, LedgerError> {
        if self.issuances.contains_key(&tx_id) {
            return Err(LedgerError::DuplicateIssuance(tx_id));
        }
        let tx = self
            .tx(&tx_id)
            .ok_or(LedgerError::NotAnIssuanceRequest(tx_id))?;
        let issuance_type = IssuanceType::from_tx_type(tx.tx_type)
            .ok_or(LedgerError::NotAnIssuanceRequest(tx_id))?;
        let candidate = tx
            .outputs
            .iter()
            .find(|o| o.output_type == TxOutputType::IssuanceCandidate)
            .cloned()
            .ok_or(LedgerError::NotAnIssuanceRequest(tx_id))?;

        let key = candidate.key();
        let issuance = Issuance {
            tx_id,
            chain_height: self.chain_height(),
            amount: candidate.value,
            issuance_type,
        };
        info!(%key, amount = issuance.amount, "issuance recorded");
        self.unspent.insert(key, candidate);
        self.issuances.insert(tx_id, issuance.clone());
        if let Some(undo) = self.undo.back_mut() {
            undo.issuances.push(key);
        }
        Ok(issuance)
    }

    /// Lowest height [`rollback_to`](Self::rollback_to) can reach.
    pub fn oldest_undoable_height(&self) -> u32 {
        self.undo
            .front()
            .map_or(self.chain_height(), |u| u.height.saturating_sub(1))
    }

    /// Discard every block above `height`, most recent first. Returns the
    /// number of blocks removed.
    pub fn rollback_to(&mut self, height: u32) -> Result<usize, LedgerError> {
        let to_pop = self
            .blocks
            .iter()
            .rev()
            .take_while(|b| b.height > height)
            .count();
        if to_pop > self.undo.len() {
            return Err(LedgerError::RollbackTooDeep {
                target: height,
                oldest: self.oldest_undoable_height(),
            });
        }
        for _ in 0..to_pop {
            if let Some(undo) = self.undo.pop_back() {
                self.revert(undo);
            }
            self.blocks.pop();
        }
        if to_pop > 0 {
            info!(height, removed = to_pop, "ledger rolled back");
        }
        Ok(to_pop)
    }

    fn revert(&mut self, undo: BlockUndo) {
        debug!(height = undo.height, "reverting block");
        for key in undo.issuances.iter().rev() {
            self.issuances.remove(&key.tx_id);
            self.unspent.remove(key);
        }
        let keep = self.param_changes.len().saturating_sub(undo.param_changes);
        self.param_changes.truncate(keep);
        let keep = self.marker_records.len().saturating_sub(undo.marker_records);
        self.marker_records.truncate(keep);
        for (key, output) in undo.spent.into_iter().rev() {
            self.spent.remove(&key);
            self.unspent.insert(key, output);
        }
        for key in &undo.added_unspent {
            self.unspent.remove(key);
        }
        for tx_id in &undo.txs {
            self.tx_heights.remove(tx_id);
        }
        if undo.cycle_added {
            self.cycles.pop();
        }
        if undo.genesis {
            self.genesis_supply = 0;
        }
    }
}

impl ParamLookup for LedgerState {
    fn param_value(&self, param: Param, height: u32) -> Result<u64, GovernanceError> {
        Ok(latest_change(&self.param_changes, param, height)
            .map_or_else(|| param.default_value(self.network), |c| c.value))
    }
}

impl LedgerView for LedgerState {
    fn unspent_output(&self, key: &TxOutputKey) -> Option<&TxOutput> {
        self.unspent.get(key)
    }

    fn phase_for_height(&self, height: u32) -> Phase {
        self.periods().phase_for_height(height)
    }
}

/// Applies one block's changes to the state. Obtained from
/// [`LedgerState::open_block`]; the block is complete when the writer is
/// dropped.
pub struct BlockWriter<'a> {
    state: &'a mut LedgerState,
}

impl BlockWriter<'_> {
    /// The state as mutated so far, for classifying the next transaction.
    pub fn state(&self) -> &LedgerState {
        self.state
    }

    pub fn add_cycle(&mut self, cycle: Cycle) {
        self.state.cycles.push(cycle);
        if let Some(undo) = self.state.undo.back_mut() {
            undo.cycle_added = true;
        }
    }

    /// Commit a classified token transaction: inputs that resolve to unspent
    /// outputs move to the spent map, token-bearing outputs become unspent.
    pub fn apply_tx(&mut self, tx: Tx) {
        let st = &mut *self.state;
        let height = tx.block_height;
        let mut spent = Vec::new();
        let mut added = Vec::new();

        for (input_index, input) in tx.inputs.iter().enumerate() {
            let key = input.output_key();
            if let Some(output) = st.unspent.remove(&key) {
                st.spent.insert(
                    key,
                    SpentInfo {
                        block_height: height,
                        tx_id: tx.id,
                        input_index: input_index as u32,
                    },
                );
                spent.push((key, output));
            }
        }
        for output in tx.outputs.iter().filter(|o| o.is_token_bearing()) {
            st.unspent.insert(output.key(), output.clone());
            added.push(output.key());
        }

        let genesis = tx.tx_type == TxType::Genesis;
        if genesis {
            st.genesis_supply = tx.token_output_value();
        }
        st.tx_heights.insert(tx.id, height);
        if let Some(undo) = st.undo.back_mut() {
            undo.spent.extend(spent);
            undo.added_unspent.extend(added);
            undo.txs.push(tx.id);
            undo.genesis |= genesis;
        }
        if let Some(block) = st.blocks.last_mut() {
            block.txs.push(tx);
        }
    }

    pub fn add_marker_record(&mut self, record: MarkerRecord) {
        self.state.marker_records.push(record);
        if let Some(undo) = self.state.undo.back_mut() {
            undo.marker_records += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::{RawTxOutput, TxInput};

    const GENESIS_HEIGHT: u32 = 10;

    fn id(b: u8) -> TxId {
        TxId::new([b; 32])
    }

    fn hash(h: u32) -> BlockHash {
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&h.to_be_bytes());
        bytes[31] = 0xEE;
        BlockHash::new(bytes)
    }

    fn new_state() -> LedgerState {
        LedgerState::new(
            NetworkId::Regtest,
            GenesisTxInfo::new(id(1), GENESIS_HEIGHT),
            100,
        )
    }

    fn raw_block(height: u32) -> RawBlock {
        RawBlock {
            height,
            time: height as u64 * 600,
            hash: hash(height),
            prev_hash: hash(height - 1),
            txs: Vec::new(),
        }
    }

    fn output(tx: TxId, index: u32, value: u64, height: u32, t: TxOutputType) -> TxOutput {
        let mut o = TxOutput::from_raw(tx, height, &RawTxOutput::new(index, value, "addr"));
        o.output_type = t;
        o
    }

    fn genesis_tx(values: &[u64]) -> Tx {
        Tx {
            id: id(1),
            block_height: GENESIS_HEIGHT,
            inputs: vec![TxInput::new(id(0), 0)],
            outputs: values
                .iter()
                .enumerate()
                .map(|(i, v)| output(id(1), i as u32, *v, GENESIS_HEIGHT, TxOutputType::Genesis))
                .collect(),
            tx_type: TxType::Genesis,
            burnt_fee: 0,
        }
    }

    fn transfer(tx: u8, height: u32, spends: TxOutputKey, value: u64) -> Tx {
        Tx {
            id: id(tx),
            block_height: height,
            inputs: vec![TxInput::new(spends.tx_id, spends.index)],
            outputs: vec![output(id(tx), 0, value, height, TxOutputType::Bsq)],
            tx_type: TxType::TransferBsq,
            burnt_fee: 0,
        }
    }

    fn with_genesis() -> LedgerState {
        let mut state = new_state();
        let mut w = state.open_block(&raw_block(GENESIS_HEIGHT));
        w.apply_tx(genesis_tx(&[1000, 2000, 300, 500, 333]));
        drop(w);
        state
    }

    #[test]
    fn empty_ledger_expects_genesis_height() {
        let state = new_state();
        assert!(state.is_empty());
        assert_eq!(state.chain_height(), GENESIS_HEIGHT - 1);
        assert_eq!(state.next_block_height(), GENESIS_HEIGHT);
        assert!(state.connects(GENESIS_HEIGHT, &BlockHash::ZERO));
        assert!(!state.connects(GENESIS_HEIGHT + 1, &BlockHash::ZERO));
    }

    #[test]
    fn genesis_seeds_supply() {
        let state = with_genesis();
        assert_eq!(state.unspent_outputs().len(), 5);
        assert_eq!(state.total_supply(), 4133);
        assert_eq!(state.total_unspent_value(), 4133);
        assert_eq!(state.chain_height(), GENESIS_HEIGHT);
    }

    #[test]
    fn spend_moves_output_to_spent_map() {
        let mut state = with_genesis();
        let spent_key = TxOutputKey::new(id(1), 0);
        let mut w = state.open_block(&raw_block(GENESIS_HEIGHT + 1));
        w.apply_tx(transfer(2, GENESIS_HEIGHT + 1, spent_key, 1000));
        drop(w);

        assert!(!state.is_unspent(&spent_key));
        let info = state.spent_info(&spent_key).unwrap();
        assert_eq!(info.tx_id, id(2));
        assert_eq!(info.block_height, GENESIS_HEIGHT + 1);
        assert!(state.is_unspent(&TxOutputKey::new(id(2), 0)));
        assert_eq!(state.unspent_value(&TxOutputKey::new(id(2), 0)), 1000);
        assert_eq!(state.unspent_value(&spent_key), 0);
        assert_eq!(state.total_unspent_value(), 4133);
        for key in state.spent_outputs().keys() {
            assert!(!state.is_unspent(key));
        }
    }

    #[test]
    fn connects_requires_matching_predecessor() {
        let state = with_genesis();
        assert!(state.connects(GENESIS_HEIGHT + 1, &hash(GENESIS_HEIGHT)));
        assert!(!state.connects(GENESIS_HEIGHT + 1, &hash(99)));
        assert!(!state.connects(GENESIS_HEIGHT + 2, &hash(GENESIS_HEIGHT)));
    }

    #[test]
    fn rollback_restores_previous_maps() {
        let mut state = with_genesis();
        let before = state.clone();

        let k0 = TxOutputKey::new(id(1), 0);
        let mut w = state.open_block(&raw_block(GENESIS_HEIGHT + 1));
        w.apply_tx(transfer(2, GENESIS_HEIGHT + 1, k0, 1000));
        // Same-block chain: tx 3 spends tx 2's output.
        w.apply_tx(transfer(3, GENESIS_HEIGHT + 1, TxOutputKey::new(id(2), 0), 1000));
        drop(w);
        let mut w = state.open_block(&raw_block(GENESIS_HEIGHT + 2));
        w.apply_tx(transfer(4, GENESIS_HEIGHT + 2, TxOutputKey::new(id(1), 1), 2000));
        drop(w);

        assert_eq!(state.rollback_to(GENESIS_HEIGHT).unwrap(), 2);
        assert_eq!(state.unspent_outputs(), before.unspent_outputs());
        assert_eq!(state.spent_outputs(), before.spent_outputs());
        assert_eq!(state.chain_height(), GENESIS_HEIGHT);
        assert!(state.tx(&id(3)).is_none());
    }

    #[test]
    fn rollback_beyond_journal_fails_without_mutation() {
        let mut state = LedgerState::new(
            NetworkId::Regtest,
            GenesisTxInfo::new(id(1), GENESIS_HEIGHT),
            2,
        );
        let mut w = state.open_block(&raw_block(GENESIS_HEIGHT));
        w.apply_tx(genesis_tx(&[10]));
        drop(w);
        for h in GENESIS_HEIGHT + 1..=GENESIS_HEIGHT + 3 {
            drop(state.open_block(&raw_block(h)));
        }
        assert_eq!(state.oldest_undoable_height(), GENESIS_HEIGHT + 1);
        let err = state.rollback_to(GENESIS_HEIGHT).unwrap_err();
        assert!(matches!(err, LedgerError::RollbackTooDeep { .. }));
        assert_eq!(state.chain_height(), GENESIS_HEIGHT + 3);
        assert_eq!(state.rollback_to(GENESIS_HEIGHT + 1).unwrap(), 2);
    }

    #[test]
    fn issuance_promotes_candidate_and_is_rolled_back() {
        let mut state = with_genesis();
        let h = GENESIS_HEIGHT + 1;
        let request = Tx {
            id: id(5),
            block_height: h,
            inputs: vec![TxInput::new(id(1), 2)],
            outputs: vec![
                output(id(5), 0, 100, h, TxOutputType::Bsq),
                output(id(5), 1, 5000, h, TxOutputType::IssuanceCandidate),
                output(id(5), 2, 0, h, TxOutputType::CompReqOpReturn),
            ],
            tx_type: TxType::CompensationRequest,
            burnt_fee: 200,
        };
        let mut w = state.open_block(&raw_block(h));
        w.apply_tx(request);
        drop(w);

        let candidate = TxOutputKey::new(id(5), 1);
        assert!(!state.is_unspent(&candidate));
        let issuance = state.add_issuance(id(5)).unwrap();
        assert_eq!(issuance.amount, 5000);
        assert_eq!(issuance.issuance_type, IssuanceType::Compensation);
        assert!(state.is_unspent(&candidate));
        assert_eq!(state.total_supply(), 4133 + 5000);
        assert!(matches!(
            state.add_issuance(id(5)),
            Err(LedgerError::DuplicateIssuance(_))
        ));
        assert!(matches!(
            state.add_issuance(id(1)),
            Err(LedgerError::NotAnIssuanceRequest(_))
        ));

        state.rollback_to(GENESIS_HEIGHT).unwrap();
        assert!(state.issuance(&id(5)).is_none());
        assert!(!state.is_unspent(&candidate));
        assert_eq!(state.total_supply(), 4133);
    }

    #[test]
    fn param_lookup_uses_latest_activated_change() {
        let mut state = with_genesis();
        assert_eq!(
            state.param_value(Param::ProposalFee, 50).unwrap(),
            Param::ProposalFee.default_value(NetworkId::Regtest)
        );
        state
            .add_param_change(ParamChange {
                param: Param::ProposalFee,
                value: 999,
                activation_height: 20,
                proposal_tx_id: id(9),
            })
            .unwrap();
        assert_eq!(state.param_value(Param::ProposalFee, 19).unwrap(), 200);
        assert_eq!(state.param_value(Param::ProposalFee, 20).unwrap(), 999);
        assert_eq!(state.param_changes_for(Param::ProposalFee).count(), 1);

        state.rollback_to(GENESIS_HEIGHT - 1).unwrap();
        assert!(state.param_changes().is_empty());
        assert!(state.is_empty());
    }

    #[test]
    fn earlier_activation_recorded_later_does_not_shadow() {
        let mut state = with_genesis();
        for (value, activation_height, tx) in [(700, 40, 10), (500, 30, 11)] {
            state
                .add_param_change(ParamChange {
                    param: Param::ProposalFee,
                    value,
                    activation_height,
                    proposal_tx_id: id(tx),
                })
                .unwrap();
        }
        assert_eq!(state.param_value(Param::ProposalFee, 35).unwrap(), 500);
        assert_eq!(state.param_value(Param::ProposalFee, 45).unwrap(), 700);
    }

    #[test]
    fn param_change_needs_a_block() {
        let mut state = new_state();
        let change = ParamChange {
            param: Param::BlindVoteFee,
            value: 1,
            activation_height: 1,
            proposal_tx_id: id(9),
        };
        assert!(matches!(state.add_param_change(change), Err(LedgerError::Empty)));
    }

    #[test]
    fn blocks_from_height_serves_suffix() {
        let mut state = with_genesis();
        for h in GENESIS_HEIGHT + 1..=GENESIS_HEIGHT + 4 {
            drop(state.open_block(&raw_block(h)));
        }
        assert_eq!(state.blocks_from_height(GENESIS_HEIGHT + 3, 100).len(), 2);
        assert_eq!(state.blocks_from_height(0, 100).len(), 5);
        assert_eq!(state.blocks_from_height(0, 3).len(), 3);
        assert!(state.blocks_from_height(GENESIS_HEIGHT + 9, 100).is_empty());
        assert_eq!(state.block_at_height(GENESIS_HEIGHT + 2).unwrap().height, GENESIS_HEIGHT + 2);
    }

    #[test]
    fn summary_counts() {
        let state = with_genesis();
        let summary = state.summary();
        assert_eq!(summary.blocks, 1);
        assert_eq!(summary.txs, 1);
        assert_eq!(summary.unspent_outputs, 5);
        assert_eq!(summary.total_supply, 4133);
    }
}
