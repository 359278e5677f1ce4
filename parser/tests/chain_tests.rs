//! End-to-end parsing of small scripted chains.

use tessera_governance::{Param, ParamChange, Phase};
use tessera_ledger::LedgerState;
use tessera_parser::{encode_lockup, encode_marker, BlockParser};
use tessera_types::{
    BlockHash, GenesisTxInfo, NetworkId, OpReturnType, RawBlock, RawTx, RawTxOutput, TxId, TxInput,
    TxOutputKey, TxOutputType, TxType,
};

const GENESIS_HEIGHT: u32 = 111;

fn id(b: u8) -> TxId {
    TxId::new([b; 32])
}

fn hash(h: u32) -> BlockHash {
    let mut bytes = [0u8; 32];
    bytes[28..].copy_from_slice(&h.to_be_bytes());
    BlockHash::new(bytes)
}

fn block(height: u32, txs: Vec<RawTx>) -> RawBlock {
    RawBlock {
        height,
        time: u64::from(height) * 600,
        hash: hash(height),
        prev_hash: hash(height - 1),
        txs,
    }
}

fn tx(b: u8, spends: &[(u8, u32)], values: &[u64]) -> RawTx {
    RawTx {
        id: id(b),
        inputs: spends.iter().map(|(t, i)| TxInput::new(id(*t), *i)).collect(),
        outputs: values
            .iter()
            .enumerate()
            .map(|(i, v)| RawTxOutput::new(i as u32, *v, format!("addr{i}")))
            .collect(),
    }
}

fn with_marker(mut raw: RawTx, data: Vec<u8>) -> RawTx {
    let index = raw.outputs.len() as u32;
    raw.outputs.push(RawTxOutput::op_return(index, data));
    raw
}

struct Chain {
    parser: BlockParser,
    state: LedgerState,
}

impl Chain {
    fn new() -> Self {
        let genesis = GenesisTxInfo::new(id(1), GENESIS_HEIGHT);
        let mut chain = Self {
            parser: BlockParser::new(genesis, NetworkId::Regtest),
            state: LedgerState::new(NetworkId::Regtest, genesis, 100),
        };
        chain.push(vec![tx(1, &[(0, 0)], &[1000, 2000, 300, 500, 333])]);
        chain
    }

    fn push(&mut self, txs: Vec<RawTx>) {
        let height = self.state.next_block_height();
        self.parser
            .parse_block(&block(height, txs), &mut self.state)
            .unwrap();
    }

    fn push_empty_until(&mut self, height: u32) {
        while self.state.chain_height() < height {
            self.push(Vec::new());
        }
    }
}

#[test]
fn genesis_seeds_total_supply() {
    let chain = Chain::new();
    assert_eq!(chain.state.total_supply(), 4133);
    assert_eq!(chain.state.unspent_outputs().len(), 5);
    for index in 0..5 {
        let out = chain
            .state
            .unspent_outputs()
            .get(&TxOutputKey::new(id(1), index))
            .unwrap();
        assert_eq!(out.output_type, TxOutputType::Genesis);
    }
}

#[test]
fn transfer_moves_output_to_spent() {
    let mut chain = Chain::new();
    chain.push(vec![tx(2, &[(1, 0)], &[1000])]);

    let spent = TxOutputKey::new(id(1), 0);
    assert!(!chain.state.is_unspent(&spent));
    assert_eq!(chain.state.spent_info(&spent).unwrap().tx_id, id(2));
    assert_eq!(chain.state.tx_type(&id(2)), Some(TxType::TransferBsq));
    assert_eq!(chain.state.unspent_value(&TxOutputKey::new(id(2), 0)), 1000);
}

#[test]
fn overspend_burns_excess_outputs() {
    let mut chain = Chain::new();
    chain.push(vec![tx(3, &[(1, 1)], &[500, 1500, 5000])]);

    assert!(chain.state.is_unspent(&TxOutputKey::new(id(3), 0)));
    assert!(chain.state.is_unspent(&TxOutputKey::new(id(3), 1)));
    assert!(!chain.state.is_unspent(&TxOutputKey::new(id(3), 2)));
    assert_eq!(chain.state.total_unspent_value(), 4133);
}

#[test]
fn state_hash_matches_between_independent_parses() {
    let build = || {
        let mut chain = Chain::new();
        chain.push(vec![
            tx(3, &[(2, 0)], &[600, 400]),
            tx(2, &[(1, 0)], &[1000]),
        ]);
        chain.push(vec![tx(4, &[(3, 1), (1, 4)], &[733])]);
        chain
    };
    let a = build();
    let b = build();
    assert_eq!(a.state.state_hash(), b.state.state_hash());
    assert_eq!(a.state.hash_of_last_blocks(2), b.state.hash_of_last_blocks(2));
}

#[test]
fn rollback_and_reparse_is_identical() {
    let mut chain = Chain::new();
    let blocks = vec![
        vec![tx(2, &[(1, 0)], &[1000])],
        vec![tx(3, &[(2, 0)], &[250, 750])],
        vec![tx(4, &[(3, 0), (1, 2)], &[550])],
    ];
    for txs in blocks.clone() {
        chain.push(txs);
    }
    let expected = chain.state.state_hash();

    chain.state.rollback_to(GENESIS_HEIGHT).unwrap();
    assert_eq!(chain.state.chain_height(), GENESIS_HEIGHT);
    assert!(chain.state.is_unspent(&TxOutputKey::new(id(1), 0)));
    for txs in blocks {
        chain.push(txs);
    }
    assert_eq!(chain.state.state_hash(), expected);
}

#[test]
fn compensation_request_and_issuance() {
    let mut chain = Chain::new();
    // Proposal phase on regtest covers the first four blocks of the cycle.
    assert_eq!(
        chain.state.periods().phase_for_height(GENESIS_HEIGHT + 1),
        Phase::Proposal
    );
    let request = with_marker(
        tx(5, &[(1, 1)], &[1800, 50_000]),
        encode_marker(OpReturnType::CompensationRequest, 1, &[0xCC; 20]),
    );
    chain.push(vec![request]);

    assert_eq!(
        chain.state.tx_type(&id(5)),
        Some(TxType::CompensationRequest)
    );
    assert_eq!(chain.state.marker_records().len(), 1);
    assert_eq!(chain.state.total_burnt_fee(), 200);
    let candidate = TxOutputKey::new(id(5), 1);
    assert_eq!(
        chain.state.tx_output(&candidate).unwrap().output_type,
        TxOutputType::IssuanceCandidate
    );
    assert!(!chain.state.is_unspent(&candidate));

    // Approved by the vote result at the end of the cycle.
    chain.push_empty_until(GENESIS_HEIGHT + 12);
    chain.state.add_issuance(id(5)).unwrap();
    assert!(chain.state.is_unspent(&candidate));
    assert_eq!(chain.state.total_supply(), 4133 + 50_000);

    // The issued output spends like any other token output.
    chain.push(vec![tx(6, &[(5, 1)], &[50_000])]);
    assert_eq!(chain.state.tx_type(&id(6)), Some(TxType::TransferBsq));
}

#[test]
fn request_outside_proposal_phase_is_irregular() {
    let mut chain = Chain::new();
    chain.push_empty_until(GENESIS_HEIGHT + 5);
    assert_eq!(
        chain.state.periods().phase_for_height(GENESIS_HEIGHT + 6),
        Phase::BlindVote
    );
    let request = with_marker(
        tx(5, &[(1, 1)], &[1800, 50_000]),
        encode_marker(OpReturnType::CompensationRequest, 1, &[0xCC; 20]),
    );
    chain.push(vec![request]);
    assert_eq!(chain.state.tx_type(&id(5)), Some(TxType::Irregular));
    assert!(chain.state.is_unspent(&TxOutputKey::new(id(5), 0)));
    assert!(chain.state.add_issuance(id(5)).is_err());
}

#[test]
fn lockup_unlock_and_spend_after_lock_time() {
    let mut chain = Chain::new();
    chain.push(vec![with_marker(
        tx(7, &[(1, 0)], &[1000]),
        encode_lockup(6, 1, [1; 20]),
    )]);
    assert_eq!(chain.state.lockup_outputs().count(), 1);

    let unlock_height = chain.state.next_block_height();
    chain.push(vec![tx(8, &[(7, 0)], &[1000])]);
    let unlock = chain.state.tx_output(&TxOutputKey::new(id(8), 0)).unwrap();
    assert_eq!(unlock.output_type, TxOutputType::Unlock);
    assert_eq!(unlock.unlock_block_height, unlock_height + 6);
    assert_eq!(chain.state.lockup_outputs().count(), 0);

    // Too early: the whole tx is invalid and the bond is burnt.
    chain.push(vec![tx(9, &[(8, 0)], &[1000])]);
    assert_eq!(chain.state.tx_type(&id(9)), Some(TxType::Invalid));
    assert_eq!(chain.state.total_unspent_value(), 4133 - 1000);
}

#[test]
fn unlock_spent_once_lock_time_passed() {
    let mut chain = Chain::new();
    chain.push(vec![with_marker(
        tx(7, &[(1, 0)], &[1000]),
        encode_lockup(6, 1, [1; 20]),
    )]);
    chain.push(vec![tx(8, &[(7, 0)], &[1000])]);
    let ready_at = chain
        .state
        .tx_output(&TxOutputKey::new(id(8), 0))
        .unwrap()
        .unlock_block_height;
    chain.push_empty_until(ready_at - 1);
    chain.push(vec![tx(9, &[(8, 0)], &[1000])]);
    assert_eq!(chain.state.tx_type(&id(9)), Some(TxType::TransferBsq));
    assert_eq!(chain.state.total_unspent_value(), 4133);
}

#[test]
fn phase_change_applies_from_next_cycle_only() {
    let mut chain = Chain::new();
    let first = chain.state.cycles()[0].clone();
    assert_eq!(first.height_of_last_block(), GENESIS_HEIGHT + 12);

    chain.push_empty_until(GENESIS_HEIGHT + 4);
    chain
        .state
        .add_param_change(ParamChange {
            param: Param::PhaseProposal,
            value: 10,
            activation_height: GENESIS_HEIGHT + 4,
            proposal_tx_id: id(42),
        })
        .unwrap();
    chain.push_empty_until(first.height_of_last_block() + 1);

    let cycles = chain.state.cycles();
    assert_eq!(cycles.len(), 2);
    assert_eq!(cycles[0], first);
    assert_eq!(cycles[1].height_of_first_block, GENESIS_HEIGHT + 13);
    assert_eq!(cycles[1].duration_of(Phase::Proposal), Some(10));
    assert_eq!(cycles[1].duration(), 19);
}

#[test]
fn oversized_phase_change_keeps_parsing() {
    let mut chain = Chain::new();
    chain
        .state
        .add_param_change(ParamChange {
            param: Param::PhaseProposal,
            value: u64::from(u32::MAX),
            activation_height: GENESIS_HEIGHT,
            proposal_tx_id: id(43),
        })
        .unwrap();
    chain.push_empty_until(GENESIS_HEIGHT + 30);

    let cycles = chain.state.cycles();
    assert_eq!(cycles.len(), 3);
    assert_eq!(cycles[1].phases, cycles[0].phases);
    assert_eq!(cycles[2].height_of_first_block, GENESIS_HEIGHT + 26);
    assert_eq!(
        chain.state.periods().phase_for_height(GENESIS_HEIGHT + 30),
        Phase::Break1
    );
}

#[test]
fn every_parsed_height_has_one_cycle() {
    let mut chain = Chain::new();
    chain.push_empty_until(GENESIS_HEIGHT + 60);
    for height in GENESIS_HEIGHT..=GENESIS_HEIGHT + 60 {
        let owners = chain
            .state
            .cycles()
            .iter()
            .filter(|c| c.contains(height))
            .count();
        assert_eq!(owners, 1, "height {height}");
    }
}
