//! Per-transaction classification.
//!
//! Token value flows from inputs to outputs under a conservation rule: the
//! summed value of the inputs that spend unspent token outputs is a budget,
//! and outputs are walked in index order, each one taking its value from the
//! budget while the budget covers it. The first output the budget cannot
//! cover ends the walk; it and every later output carry no token value.
//! Whatever budget is left over is burnt as a fee.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use tessera_governance::{Param, Phase};
use tessera_ledger::{LedgerView, MarkerRecord};
use tessera_types::{
    GenesisTxInfo, OpReturnType, RawTx, Tx, TxId, TxOutput, TxOutputKey, TxOutputType, TxType,
};

use crate::marker::{parse_marker, ParsedMarker};

/// The outcome of classifying one token transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxClassification {
    pub tx: Tx,
    /// Present when the tx carried a recognized marker and is not invalid.
    pub marker: Option<MarkerRecord>,
}

/// What the inputs of a transaction resolved to.
#[derive(Debug, Default)]
struct InputSummary {
    /// Token value available to the outputs.
    accumulated: u64,
    /// Bonded value destroyed by spending it against the bond rules.
    burnt_bond: u64,
    /// Lock time of a lockup spent at input 0 into a matching unlock.
    spent_lockup: Option<u16>,
    /// Input 0 spends a blind vote stake.
    spends_vote_stake: bool,
}

/// Result of the output walk.
#[derive(Debug)]
struct OutputWalk {
    outputs: Vec<TxOutput>,
    remaining: u64,
    issuance_candidate: Option<usize>,
    token_output_found: bool,
}

/// Classifies raw transactions against a read-only ledger view.
#[derive(Clone, Copy, Debug)]
pub struct TxClassifier {
    genesis: GenesisTxInfo,
}

impl TxClassifier {
    pub fn new(genesis: GenesisTxInfo) -> Self {
        Self { genesis }
    }

    pub fn genesis(&self) -> &GenesisTxInfo {
        &self.genesis
    }

    /// Classify `raw` as confirmed at `height`.
    ///
    /// Returns `None` for transactions that touch no token value: they are
    /// not token transactions and leave no trace in the ledger.
    pub fn classify<V: LedgerView + ?Sized>(
        &self,
        raw: &RawTx,
        height: u32,
        view: &V,
    ) -> Option<TxClassification> {
        if self.genesis.is_genesis(&raw.id, height) {
            return Some(genesis_classification(raw, height));
        }

        let inputs = resolve_inputs(raw, height, view);
        if inputs.accumulated == 0 && inputs.burnt_bond == 0 {
            return None;
        }

        let op_return_outputs = raw.outputs.iter().filter(|o| o.is_op_return()).count();
        let marker = find_marker(raw, height, view);
        let marker_type = marker.as_ref().map(|m| m.op_return_type);

        let mut walk = walk_outputs(raw, height, &inputs, marker.as_ref());
        let fee = walk.remaining;
        let mut burnt_fee = fee + inputs.burnt_bond;

        let mut irregular = false;
        match marker_type {
            Some(OpReturnType::Proposal) => {
                irregular = !fee_and_phase_valid(
                    view,
                    &raw.id,
                    height,
                    fee,
                    Phase::Proposal,
                    Param::ProposalFee,
                );
            }
            Some(OpReturnType::CompensationRequest | OpReturnType::ReimbursementRequest) => {
                let valid = fee_and_phase_valid(
                    view,
                    &raw.id,
                    height,
                    fee,
                    Phase::Proposal,
                    Param::ProposalFee,
                );
                match (valid, walk.issuance_candidate) {
                    (true, Some(index)) => {
                        walk.outputs[index].output_type = TxOutputType::IssuanceCandidate;
                    }
                    (true, None) => {
                        warn!(tx_id = %raw.id, "issuance request without an issuance candidate output");
                        irregular = true;
                    }
                    (false, _) => irregular = true,
                }
            }
            Some(OpReturnType::BlindVote) => {
                if !fee_and_phase_valid(
                    view,
                    &raw.id,
                    height,
                    fee,
                    Phase::BlindVote,
                    Param::BlindVoteFee,
                ) {
                    irregular = true;
                    // The stake stays spendable as ordinary token value.
                    if let Some(stake) = walk
                        .outputs
                        .first_mut()
                        .filter(|o| o.output_type == TxOutputType::BlindVoteLockStake)
                    {
                        stake.output_type = TxOutputType::Bsq;
                    }
                }
            }
            // Late vote reveals are valid token txs; the vote result ignores them.
            _ => {}
        }

        let mut tx_type = if irregular {
            TxType::Irregular
        } else {
            evaluate_tx_type(&raw.id, &walk.outputs, marker_type, burnt_fee)
        };

        let invalid = tx_type == TxType::Invalid
            || op_return_outputs > 1
            || (matches!(
                tx_type,
                TxType::CompensationRequest | TxType::ReimbursementRequest
            ) && !walk.token_output_found)
            || inputs.burnt_bond > 0;

        if invalid {
            tx_type = TxType::Invalid;
            burnt_fee = inputs.accumulated + inputs.burnt_bond;
            for output in &mut walk.outputs {
                if output.is_token_bearing() || output.output_type == TxOutputType::IssuanceCandidate
                {
                    output.output_type = TxOutputType::Btc;
                }
            }
            warn!(
                tx_id = %raw.id,
                height,
                burnt = burnt_fee,
                op_return_outputs,
                burnt_bond = inputs.burnt_bond,
                "invalid transaction, all token input burnt"
            );
        } else if tx_type == TxType::Irregular {
            warn!(tx_id = %raw.id, height, ?marker_type, "irregular governance transaction");
        }

        let marker = marker.filter(|_| !invalid).map(|m| MarkerRecord {
            tx_id: raw.id,
            block_height: height,
            op_return_type: m.op_return_type,
            tx_type,
            op_return_data: m.data,
        });

        debug!(tx_id = %raw.id, height, ?tx_type, burnt_fee, "classified transaction");
        Some(TxClassification {
            tx: Tx {
                id: raw.id,
                block_height: height,
                inputs: raw.inputs.clone(),
                outputs: walk.outputs,
                tx_type,
                burnt_fee,
            },
            marker,
        })
    }
}

/// Every output of the genesis tx carries token value.
fn genesis_classification(raw: &RawTx, height: u32) -> TxClassification {
    let outputs = raw
        .outputs
        .iter()
        .map(|o| {
            let mut output = TxOutput::from_raw(raw.id, height, o);
            output.output_type = if o.is_op_return() {
                TxOutputType::Btc
            } else {
                TxOutputType::Genesis
            };
            output
        })
        .collect();
    TxClassification {
        tx: Tx {
            id: raw.id,
            block_height: height,
            inputs: raw.inputs.clone(),
            outputs,
            tx_type: TxType::Genesis,
            burnt_fee: 0,
        },
        marker: None,
    }
}

fn resolve_inputs<V: LedgerView + ?Sized>(raw: &RawTx, height: u32, view: &V) -> InputSummary {
    let mut summary = InputSummary::default();
    let mut seen: BTreeSet<TxOutputKey> = BTreeSet::new();

    for (index, input) in raw.inputs.iter().enumerate() {
        let key = input.output_key();
        if !seen.insert(key) {
            continue;
        }
        let Some(connected) = view.unspent_output(&key) else {
            continue;
        };
        match connected.output_type {
            TxOutputType::Lockup => {
                let unlocks = raw
                    .outputs
                    .first()
                    .is_some_and(|o| !o.is_op_return() && o.value == connected.value);
                if index == 0 && unlocks {
                    summary.spent_lockup = Some(connected.lock_time);
                    summary.accumulated += connected.value;
                } else {
                    warn!(tx_id = %raw.id, %key, index, "lockup spent without matching unlock, bond burnt");
                    summary.burnt_bond += connected.value;
                }
            }
            TxOutputType::Unlock if height < connected.unlock_block_height => {
                warn!(
                    tx_id = %raw.id,
                    %key,
                    height,
                    unlock_block_height = connected.unlock_block_height,
                    "unlock output spent before lock time expired, bond burnt"
                );
                summary.burnt_bond += connected.value;
            }
            TxOutputType::BlindVoteLockStake => {
                summary.spends_vote_stake |= index == 0;
                summary.accumulated += connected.value;
            }
            _ => summary.accumulated += connected.value,
        }
    }
    summary
}

/// The marker in the last output, if it decodes and (for lockups) carries an
/// acceptable lock time.
fn find_marker<V: LedgerView + ?Sized>(raw: &RawTx, height: u32, view: &V) -> Option<ParsedMarker> {
    let data = raw.outputs.last()?.op_return_data.as_deref()?;
    let marker = match parse_marker(data) {
        Ok(marker) => marker,
        Err(reason) => {
            warn!(tx_id = %raw.id, %reason, "ignoring malformed governance marker");
            return None;
        }
    };
    if let Some(lock_time) = marker.lock_time {
        let bounds = (
            view.param_value(Param::LockTimeMin, height),
            view.param_value(Param::LockTimeMax, height),
        );
        let accepted = match bounds {
            (Ok(min), Ok(max)) => (min..=max).contains(&u64::from(lock_time)),
            (Err(e), _) | (_, Err(e)) => {
                warn!(tx_id = %raw.id, error = %e, "lock time bounds unavailable");
                false
            }
        };
        if !accepted {
            warn!(tx_id = %raw.id, lock_time, "ignoring lockup marker with lock time out of range");
            return None;
        }
    }
    Some(marker)
}

fn walk_outputs(
    raw: &RawTx,
    height: u32,
    inputs: &InputSummary,
    marker: Option<&ParsedMarker>,
) -> OutputWalk {
    let marker_type = marker.map(|m| m.op_return_type);
    let mut outputs: Vec<TxOutput> = raw
        .outputs
        .iter()
        .map(|o| TxOutput::from_raw(raw.id, height, o))
        .collect();

    // A data output in last position is typed by its marker and never takes
    // part in the walk.
    let mut walk_end = outputs.len();
    if raw.outputs.last().is_some_and(|o| o.is_op_return()) {
        walk_end -= 1;
        outputs[walk_end].output_type =
            marker_type.map_or(TxOutputType::Btc, TxOutputType::for_op_return);
    }

    let mut budget = inputs.accumulated;
    let mut closed = false;
    let mut issuance_candidate = None;
    let mut token_output_found = false;

    for (i, (output, raw_output)) in outputs.iter_mut().zip(&raw.outputs).enumerate().take(walk_end) {
        if raw_output.is_op_return() {
            output.output_type = TxOutputType::Btc;
            continue;
        }
        if !closed && budget > 0 && output.value <= budget {
            budget -= output.value;
            token_output_found = true;
            output.output_type = token_output_type(i, marker, inputs);
            if output.output_type == TxOutputType::Unlock {
                output.lock_time = inputs.spent_lockup.unwrap_or_default();
                output.unlock_block_height = height.saturating_add(u32::from(output.lock_time));
            } else if output.output_type == TxOutputType::Lockup {
                output.lock_time = marker.and_then(|m| m.lock_time).unwrap_or_default();
            }
        } else {
            if i == 1
                && budget > 0
                && issuance_candidate.is_none()
                && marker_type.is_some_and(|t| t.is_issuance_request())
            {
                issuance_candidate = Some(i);
            }
            output.output_type = TxOutputType::Btc;
            closed = true;
        }
    }

    OutputWalk {
        outputs,
        remaining: budget,
        issuance_candidate,
        token_output_found,
    }
}

/// Type of a covered output. Only output 0 can take a special role.
fn token_output_type(index: usize, marker: Option<&ParsedMarker>, inputs: &InputSummary) -> TxOutputType {
    if index != 0 {
        return TxOutputType::Bsq;
    }
    if inputs.spent_lockup.is_some() {
        return TxOutputType::Unlock;
    }
    match marker.map(|m| m.op_return_type) {
        Some(OpReturnType::Lockup) => TxOutputType::Lockup,
        Some(OpReturnType::BlindVote) => TxOutputType::BlindVoteLockStake,
        Some(OpReturnType::VoteReveal) if inputs.spends_vote_stake => {
            TxOutputType::VoteRevealUnlockStake
        }
        _ => TxOutputType::Bsq,
    }
}

/// Governance txs must pay exactly the fee in effect and be confirmed in the
/// phase they belong to.
fn fee_and_phase_valid<V: LedgerView + ?Sized>(
    view: &V,
    tx_id: &TxId,
    height: u32,
    fee: u64,
    phase: Phase,
    param: Param,
) -> bool {
    if !view.is_in_phase(height, phase) {
        warn!(%tx_id, height, ?phase, "governance tx outside its phase");
        return false;
    }
    match view.param_value(param, height) {
        Ok(required) if required == fee => true,
        Ok(required) => {
            warn!(%tx_id, fee, required, "governance tx pays wrong fee");
            false
        }
        Err(e) => {
            warn!(%tx_id, error = %e, "fee parameter unavailable");
            false
        }
    }
}

fn evaluate_tx_type(
    tx_id: &TxId,
    outputs: &[TxOutput],
    marker_type: Option<OpReturnType>,
    burnt_fee: u64,
) -> TxType {
    match marker_type {
        Some(op) if op.is_issuance_request() => {
            let candidate_at_1 = outputs.len() >= 3
                && outputs[1].output_type == TxOutputType::IssuanceCandidate;
            if candidate_at_1 {
                TxType::from_op_return(op)
            } else {
                warn!(%tx_id, outputs = outputs.len(), "issuance request needs its candidate at output 1");
                TxType::Invalid
            }
        }
        Some(op) => TxType::from_op_return(op),
        None if burnt_fee > 0 => TxType::PayTradeFee,
        None if outputs
            .first()
            .is_some_and(|o| o.output_type == TxOutputType::Unlock) =>
        {
            TxType::Unlock
        }
        None => TxType::TransferBsq,
    }
}
