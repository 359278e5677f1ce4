//! Integration tests exercising the node end to end:
//! scripted chain → source → worker → controller → parser → ledger.
//!
//! These wire together the pieces a daemon connects, using the nullable
//! chain, peer and clock so every run is deterministic.

use std::sync::Arc;
use std::time::Duration;

use tessera_crypto::keypair_from_seed;
use tessera_governance::{Param, ParamChange, Phase};
use tessera_ledger::LedgerState;
use tessera_node::{
    sign_block_window, spawn_worker, verify_block_window, GenesisOverride, LedgerEvent, NextStep,
    NodeConfig, NodeController, NodeError, NodeRole, NodeState, PeerSource, RecordingSink,
    SourceBlock, WindowVerdict, WorkItem,
};
use tessera_nullables::{NullBlockSource, NullChain, NullClock, NullPeer};
use tessera_types::{GenesisTxInfo, RawBlock, TxId, TxOutputKey, TxOutputType};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const GENESIS_HEIGHT: u32 = 111;
const RETRY_UNIT_MS: u64 = 10;

fn genesis_id() -> TxId {
    TxId::new([1; 32])
}

fn genesis() -> GenesisTxInfo {
    GenesisTxInfo::new(genesis_id(), GENESIS_HEIGHT)
}

fn config(role: NodeRole) -> NodeConfig {
    NodeConfig {
        role,
        genesis: Some(GenesisOverride {
            tx_id: genesis_id(),
            block_height: GENESIS_HEIGHT,
        }),
        retry_delay_ms: RETRY_UNIT_MS,
        ..NodeConfig::default()
    }
}

fn chain() -> NullChain {
    NullChain::new(genesis(), &[1000, 2000, 300, 500, 333])
}

fn controller(role: NodeRole) -> (NodeController, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let controller = NodeController::new(&config(role), Box::new(Arc::clone(&sink)));
    (controller, sink)
}

fn raw_blocks(blocks: Vec<RawBlock>) -> Vec<SourceBlock> {
    blocks.into_iter().map(SourceBlock::Raw).collect()
}

/// Drive a controller synchronously against `chain` until it waits.
fn sync_to(controller: &mut NodeController, chain: &NullChain) -> Result<(), NodeError> {
    let mut from = controller.start();
    loop {
        match controller.on_blocks_received(raw_blocks(chain.blocks_from(from)))? {
            NextStep::Request { from_height, .. } => from = from_height,
            NextStep::Wait => return Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// 1. Conservation scenarios through the full node path
// ---------------------------------------------------------------------------

#[test]
fn genesis_transfer_and_overspend() {
    let mut chain = chain();
    let transfer = chain.tx(&[(genesis_id(), 0)], &[1000]);
    let split = chain.tx(&[(genesis_id(), 1)], &[500, 1500, 5000]);
    chain.push_block(vec![transfer.clone(), split.clone()]);

    let (mut node, _) = controller(NodeRole::Full);
    sync_to(&mut node, &chain).unwrap();
    let ledger = node.ledger();

    assert_eq!(ledger.total_supply(), 4133);
    assert!(!ledger.is_unspent(&TxOutputKey::new(genesis_id(), 0)));
    assert_eq!(ledger.unspent_value(&TxOutputKey::new(transfer.id, 0)), 1000);
    assert!(ledger.is_unspent(&TxOutputKey::new(split.id, 0)));
    assert!(ledger.is_unspent(&TxOutputKey::new(split.id, 1)));
    let burned = ledger.tx_output(&TxOutputKey::new(split.id, 2)).unwrap();
    assert_eq!(burned.output_type, TxOutputType::Btc);
    assert_eq!(ledger.total_unspent_value(), 4133);
    assert_eq!(node.state(), NodeState::CaughtUp);
}

// ---------------------------------------------------------------------------
// 2. Reorg recovery
// ---------------------------------------------------------------------------

#[test]
fn shallow_fork_recovers_to_new_branch() {
    let mut chain = chain();
    chain.push_empty(30);
    let (mut node, sink) = controller(NodeRole::Full);
    sync_to(&mut node, &chain).unwrap();

    chain.diverge_from(GENESIS_HEIGHT + 25);
    chain.push_empty(1);
    let tip = chain.block_at(chain.tip_height()).unwrap().clone();
    let step = node.on_new_block_received(SourceBlock::Raw(tip)).unwrap();
    let NextStep::Request { from_height, delay } = step else {
        panic!("expected a re-request");
    };
    assert_eq!(from_height, GENESIS_HEIGHT + 21);
    assert_eq!(delay, Duration::from_millis(RETRY_UNIT_MS));

    node.on_blocks_received(raw_blocks(chain.blocks_from(from_height)))
        .unwrap();
    node.on_blocks_received(Vec::new()).unwrap();
    assert_eq!(node.chain_height(), chain.tip_height());
    assert!(!node.is_stale());
    assert_eq!(node.reorg_attempts(), 0);

    let (mut fresh, _) = controller(NodeRole::Full);
    sync_to(&mut fresh, &chain).unwrap();
    assert_eq!(node.ledger().state_hash(), fresh.ledger().state_hash());
    assert_eq!(node.hash_chain().first_conflict(fresh.hash_chain()), None);
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, LedgerEvent::Reorg { to, .. } if *to == GENESIS_HEIGHT + 20)));
}

#[tokio::test]
async fn persistent_divergence_gives_up_after_five_attempts() {
    let mut chain = chain();
    chain.push_empty(60);
    let source = NullBlockSource::new(chain.clone());
    let clock = NullClock::new();
    let (node, sink) = controller(NodeRole::Full);

    let handle = spawn_worker(node, source.clone(), clock.clone(), 16);
    let mut status = handle.status();
    status
        .wait_for(|s| s.state == NodeState::CaughtUp)
        .await
        .unwrap();
    let caught_up_height = status.borrow().chain_height;
    assert_eq!(caught_up_height, GENESIS_HEIGHT + 60);

    // The source switches to a branch that splits right after genesis.
    source.chain().diverge_from(GENESIS_HEIGHT + 1);
    source.chain().push_empty(1);
    let tip = source.chain().blocks().last().cloned().unwrap();
    handle
        .submit(WorkItem::NewBlock(SourceBlock::Raw(tip)))
        .await
        .unwrap();
    status.wait_for(|s| s.stale).await.unwrap();

    let node = handle.shutdown().await.unwrap();
    let unit = Duration::from_millis(RETRY_UNIT_MS);
    assert_eq!(
        clock.sleeps(),
        [1, 4, 9, 16, 25].iter().map(|n| unit * *n).collect::<Vec<_>>()
    );
    assert_eq!(node.chain_height(), caught_up_height - 50);
    assert!(node.is_stale());
    assert_eq!(node.state(), NodeState::Idle);

    let events = sink.events();
    let reorgs = events
        .iter()
        .filter(|e| matches!(e, LedgerEvent::Reorg { .. }))
        .count();
    assert_eq!(reorgs, 5);
    assert!(matches!(
        events.last(),
        Some(LedgerEvent::PersistentDivergence { attempts: 5, .. })
    ));
}

#[tokio::test]
async fn source_outage_is_retried_with_backoff() {
    let mut chain = chain();
    chain.push_empty(5);
    let source = NullBlockSource::new(chain).with_batch_size(2);
    source.fail_next(2);
    let clock = NullClock::new();
    let (node, _) = controller(NodeRole::Full);

    let handle = spawn_worker(node, source.clone(), clock.clone(), 4);
    let mut status = handle.status();
    status
        .wait_for(|s| s.state == NodeState::CaughtUp)
        .await
        .unwrap();
    let node = handle.shutdown().await.unwrap();

    let unit = Duration::from_millis(RETRY_UNIT_MS);
    assert_eq!(clock.sleeps(), vec![unit, unit * 4]);
    assert_eq!(node.chain_height(), GENESIS_HEIGHT + 5);
    assert_eq!(
        &source.requests()[..3],
        &[GENESIS_HEIGHT, GENESIS_HEIGHT, GENESIS_HEIGHT]
    );
}

// ---------------------------------------------------------------------------
// 3. Governance parameter changes
// ---------------------------------------------------------------------------

#[test]
fn param_change_shapes_next_cycle_only() {
    let mut chain = chain();
    chain.push_empty(5);
    let (mut node, _) = controller(NodeRole::Full);
    sync_to(&mut node, &chain).unwrap();

    node.add_param_change(ParamChange {
        param: Param::PhaseBlindVote,
        value: 6,
        activation_height: node.chain_height(),
        proposal_tx_id: TxId::new([0x42; 32]),
    })
    .unwrap();
    let first_cycle = node.ledger().cycles()[0].clone();

    chain.push_empty(30);
    sync_to(&mut node, &chain).unwrap();
    let ledger = node.ledger();
    assert_eq!(ledger.cycles()[0], first_cycle);
    assert_eq!(ledger.cycles()[0].duration_of(Phase::BlindVote), Some(2));
    assert_eq!(ledger.cycles()[1].duration_of(Phase::BlindVote), Some(6));
    assert_eq!(
        ledger.cycles()[1].height_of_first_block,
        first_cycle.height_of_last_block() + 1
    );
}

#[test]
fn param_change_is_undone_with_its_block() {
    let mut chain = chain();
    chain.push_empty(15);
    let (mut node, _) = controller(NodeRole::Full);
    sync_to(&mut node, &chain).unwrap();
    node.add_param_change(ParamChange {
        param: Param::ProposalFee,
        value: 500,
        activation_height: node.chain_height(),
        proposal_tx_id: TxId::new([0x43; 32]),
    })
    .unwrap();
    assert_eq!(node.ledger().param_changes().len(), 1);

    chain.diverge_from(GENESIS_HEIGHT + 14);
    chain.push_empty(1);
    let tip = chain.blocks().last().cloned().unwrap();
    node.on_new_block_received(SourceBlock::Raw(tip)).unwrap();
    assert!(node.ledger().param_changes().is_empty());
}

// ---------------------------------------------------------------------------
// 4. Lite node: reset to pristine before parsing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lite_node_matches_full_node() {
    let mut chain = chain();
    let spend = chain.tx(&[(genesis_id(), 3)], &[100, 300]);
    chain.push_block(vec![spend]);
    chain.push_empty(12);
    let (mut full, _) = controller(NodeRole::Full);
    sync_to(&mut full, &chain).unwrap();

    // The peer's derived fields are garbage; the lite node must not care.
    let mut served: Vec<_> = full.ledger().blocks().to_vec();
    for block in &mut served {
        for tx in &mut block.txs {
            tx.burnt_fee = 999;
            for output in &mut tx.outputs {
                output.output_type = TxOutputType::Undefined;
            }
        }
    }
    let peer = NullPeer::new(served).with_batch_size(5);
    let (lite, _) = controller(NodeRole::Lite);
    let handle = spawn_worker(lite, PeerSource::new(peer), NullClock::new(), 8);
    let mut status = handle.status();
    status
        .wait_for(|s| s.state == NodeState::CaughtUp)
        .await
        .unwrap();

    chain.push_empty(1);
    let next = chain.blocks().last().cloned().unwrap();
    full.on_new_block_received(SourceBlock::Raw(next)).unwrap();
    let parsed = full.ledger().last_block().cloned().unwrap();
    handle
        .submit(WorkItem::NewBlock(SourceBlock::Parsed(parsed)))
        .await
        .unwrap();
    status
        .wait_for(|s| s.chain_height == chain.tip_height())
        .await
        .unwrap();

    let lite = handle.shutdown().await.unwrap();
    assert_eq!(lite.role(), NodeRole::Lite);
    assert_eq!(lite.ledger().state_hash(), full.ledger().state_hash());
    assert_eq!(lite.hash_chain().first_conflict(full.hash_chain()), None);
}

#[test]
fn reparsing_a_snapshot_is_idempotent() {
    let mut chain = chain();
    let spend = chain.tx(&[(genesis_id(), 2)], &[300]);
    chain.push_block(vec![spend]);
    chain.push_empty(3);
    let (mut node, _) = controller(NodeRole::Full);
    sync_to(&mut node, &chain).unwrap();

    let blocks: Vec<_> = node
        .ledger()
        .blocks()
        .iter()
        .cloned()
        .map(SourceBlock::Parsed)
        .collect();
    let (mut again, _) = controller(NodeRole::Lite);
    again.start();
    again.on_blocks_received(blocks).unwrap();
    assert_eq!(again.ledger().state_hash(), node.ledger().state_hash());
}

// ---------------------------------------------------------------------------
// 5. Persistence
// ---------------------------------------------------------------------------

#[test]
fn reopened_node_resumes_from_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = NodeConfig {
        data_dir: dir.path().to_path_buf(),
        ..config(NodeRole::Full)
    };
    let mut chain = chain();
    chain.push_empty(70);

    let mut node = NodeController::open(&config, Box::new(RecordingSink::new())).unwrap();
    sync_to(&mut node, &chain).unwrap();
    let expected = node.ledger().state_hash();
    drop(node);

    let mut reopened = NodeController::open(&config, Box::new(RecordingSink::new())).unwrap();
    // Candidates were taken at 140, 160 and 180; each is written when the
    // next one is taken, so 160 is the newest on disk.
    assert_eq!(reopened.chain_height(), 160);
    sync_to(&mut reopened, &chain).unwrap();
    assert_eq!(reopened.ledger().state_hash(), expected);
}

// ---------------------------------------------------------------------------
// 6. Oracle cross-check
// ---------------------------------------------------------------------------

#[test]
fn oracle_window_matches_local_blocks() {
    let mut chain = chain();
    chain.push_empty(20);
    let (mut node, _) = controller(NodeRole::Full);
    sync_to(&mut node, &chain).unwrap();

    let oracle = keypair_from_seed(&[7; 32]);
    let window = node.ledger().blocks_from_height(GENESIS_HEIGHT + 10, 10);
    let signed = sign_block_window(window, &oracle);

    let (mut other, _) = controller(NodeRole::Full);
    sync_to(&mut other, &chain).unwrap();
    let ours = other.ledger().blocks_from_height(GENESIS_HEIGHT + 10, 10);
    assert_eq!(
        verify_block_window(ours, &signed, &[oracle.public.clone()]),
        WindowVerdict::Accepted
    );

    let shifted = other.ledger().blocks_from_height(GENESIS_HEIGHT + 11, 10);
    assert_eq!(
        verify_block_window(shifted, &signed, &[oracle.public]),
        WindowVerdict::HashMismatch
    );
}

#[test]
fn oracle_check_trusts_only_configured_keys() {
    let mut chain = chain();
    chain.push_empty(20);
    let oracle = keypair_from_seed(&[7; 32]);

    let (mut signer, _) = controller(NodeRole::Full);
    sync_to(&mut signer, &chain).unwrap();
    let signed = signer.sign_recent_blocks(&oracle);
    assert_eq!(signed.from_height, GENESIS_HEIGHT + 11);
    assert_eq!(signed.to_height, GENESIS_HEIGHT + 20);
    assert_eq!(signed.hash, signer.recent_blocks_hash());

    let trusting_config = NodeConfig {
        oracle_pub_keys: vec![oracle.public.to_hex()],
        ..config(NodeRole::Full)
    };
    let mut trusting = NodeController::new(&trusting_config, Box::new(RecordingSink::new()));
    sync_to(&mut trusting, &chain).unwrap();
    assert_eq!(trusting.recent_blocks_hash(), signer.recent_blocks_hash());
    assert_eq!(trusting.check_oracle_window(&signed), WindowVerdict::Accepted);
    assert_eq!(signer.check_oracle_window(&signed), WindowVerdict::UnknownSigner);

    let wider_config = NodeConfig {
        state_hash_window: 15,
        ..trusting_config.clone()
    };
    let mut wider = NodeController::new(&wider_config, Box::new(RecordingSink::new()));
    sync_to(&mut wider, &chain).unwrap();
    assert_ne!(wider.recent_blocks_hash(), signer.recent_blocks_hash());
    assert_eq!(wider.check_oracle_window(&signed), WindowVerdict::Accepted);

    // A node on another branch hashes the same heights differently.
    chain.diverge_from(GENESIS_HEIGHT + 15);
    let mut forked = NodeController::new(&trusting_config, Box::new(RecordingSink::new()));
    sync_to(&mut forked, &chain).unwrap();
    assert_eq!(forked.check_oracle_window(&signed), WindowVerdict::HashMismatch);
}

#[test]
fn listeners_see_each_block_once_in_order() {
    let mut chain = chain();
    chain.push_empty(4);
    let (mut node, sink) = controller(NodeRole::Full);
    sync_to(&mut node, &chain).unwrap();
    // Already-parsed blocks delivered again are not reported twice.
    node.on_blocks_received(raw_blocks(chain.blocks_from(GENESIS_HEIGHT)))
        .unwrap();

    let heights: Vec<u32> = sink
        .events()
        .iter()
        .filter_map(|e| match e {
            LedgerEvent::NewBlockHeight(h) => Some(*h),
            _ => None,
        })
        .collect();
    assert_eq!(heights, (GENESIS_HEIGHT..=GENESIS_HEIGHT + 4).collect::<Vec<_>>());
    let completions = sink
        .events()
        .iter()
        .filter(|e| **e == LedgerEvent::ParseBlockChainComplete)
        .count();
    assert_eq!(completions, 1);
}

#[test]
fn ledger_snapshot_is_independent() {
    let mut chain = chain();
    chain.push_empty(2);
    let (mut node, _) = controller(NodeRole::Full);
    sync_to(&mut node, &chain).unwrap();
    let snapshot: LedgerState = node.snapshot();
    chain.push_empty(2);
    sync_to(&mut node, &chain).unwrap();
    assert_eq!(snapshot.chain_height(), GENESIS_HEIGHT + 2);
    assert_eq!(node.chain_height(), GENESIS_HEIGHT + 4);
}
