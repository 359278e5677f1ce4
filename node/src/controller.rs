//! The node's synchronous core.
//!
//! [`NodeController`] owns the ledger and drives it from blocks handed in by
//! the worker. It never awaits: every entry point applies what it was given
//! and returns the [`NextStep`] the worker should take, so all state changes
//! happen on one sequence in strictly increasing height order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use tessera_crypto::{KeyPair, PublicKey};
use tessera_governance::ParamChange;
use tessera_ledger::{Issuance, LedgerState, StateHashChain};
use tessera_parser::{BlockParser, ParseError};
use tessera_types::{Pristine, TxId};

use crate::accounting::{sign_block_window, verify_block_window, SignedBlockWindow, WindowVerdict};
use crate::ledger_event::{BlockSummary, EventSink, LedgerEvent};
use crate::tracing_spans::{parse_batch_span, parse_block_span, reorg_span};
use crate::{
    NodeConfig, NodeError, NodeMetrics, NodeRole, ReorgRecovery, SnapshotService, SourceBlock,
    SourceError,
};

/// Pushed blocks held back while the initial catch-up runs. Blocks beyond
/// this are dropped and fetched again through reorg recovery.
pub const MAX_PENDING_BLOCKS: usize = 256;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum NodeState {
    #[default]
    Idle,
    RequestingBlocks,
    Parsing,
    /// All known blocks parsed; new ones are applied as they arrive.
    CaughtUp,
    /// A block failed to connect and recent blocks were discarded.
    ReorgRecovery,
}

/// What the worker should do after a controller call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextStep {
    /// Nothing to fetch; wait for pushed blocks.
    Wait,
    /// Ask the source for blocks from `from_height` once `delay` has passed.
    Request { from_height: u32, delay: Duration },
}

/// Copy-on-read view of the controller for other tasks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub chain_height: u32,
    pub state: NodeState,
    pub stale: bool,
}

pub struct NodeController {
    role: NodeRole,
    ledger: LedgerState,
    parser: BlockParser,
    recovery: ReorgRecovery,
    sink: Box<dyn EventSink>,
    node_state: NodeState,
    stale: bool,
    parse_complete: bool,
    /// Single blocks that arrived before the initial catch-up finished.
    pending: Vec<SourceBlock>,
    hash_chain: StateHashChain,
    /// Blocks covered by [`recent_blocks_hash`](Self::recent_blocks_hash).
    state_hash_window: usize,
    oracle_keys: Vec<PublicKey>,
    snapshots: Option<SnapshotService>,
    metrics: Option<Arc<NodeMetrics>>,
}

impl NodeController {
    /// A controller over a fresh, empty ledger.
    pub fn new(config: &NodeConfig, sink: Box<dyn EventSink>) -> Self {
        let ledger = LedgerState::new(config.network, config.genesis_info(), config.undo_depth);
        Self::with_ledger(config, ledger, sink)
    }

    /// A controller resuming from `ledger`.
    pub fn with_ledger(config: &NodeConfig, ledger: LedgerState, sink: Box<dyn EventSink>) -> Self {
        let parser = BlockParser::new(*ledger.genesis(), ledger.network());
        let oracle_keys = config.oracle_keys().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring configured oracle keys");
            Vec::new()
        });
        Self {
            role: config.role,
            ledger,
            parser,
            recovery: ReorgRecovery::new(
                config.max_reorg_attempts,
                config.rollback_window,
                config.retry_unit(),
            ),
            sink,
            node_state: NodeState::Idle,
            stale: false,
            parse_complete: false,
            pending: Vec::new(),
            hash_chain: StateHashChain::new(),
            state_hash_window: config.state_hash_window,
            oracle_keys,
            snapshots: None,
            metrics: None,
        }
    }

    /// A persistent controller: resumes from the newest snapshot under the
    /// configured data directory and keeps writing snapshots there.
    pub fn open(config: &NodeConfig, sink: Box<dyn EventSink>) -> Result<Self, NodeError> {
        let genesis = config.genesis_info();
        let snapshots = SnapshotService::new(
            config.snapshot_dir(),
            config.snapshot_grid,
            genesis.block_height,
        );
        let ledger = match snapshots.load_latest()? {
            Some(ledger) if *ledger.genesis() == genesis && ledger.network() == config.network => {
                ledger
            }
            Some(ledger) => {
                warn!(
                    snapshot_height = ledger.chain_height(),
                    "snapshot belongs to another network or genesis, starting fresh"
                );
                LedgerState::new(config.network, genesis, config.undo_depth)
            }
            None => LedgerState::new(config.network, genesis, config.undo_depth),
        };
        let mut controller = Self::with_ledger(config, ledger, sink);
        controller.snapshots = Some(snapshots);
        if config.enable_metrics {
            controller.metrics = Some(Arc::new(NodeMetrics::new()));
        }
        Ok(controller)
    }

    pub fn with_snapshots(mut self, snapshots: SnapshotService) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<NodeMetrics>) -> Self {
        metrics.observe_ledger(&self.ledger);
        self.metrics = Some(metrics);
        self
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn state(&self) -> NodeState {
        self.node_state
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn chain_height(&self) -> u32 {
        self.ledger.chain_height()
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            chain_height: self.chain_height(),
            state: self.node_state,
            stale: self.stale,
        }
    }

    /// Read access to the live ledger, for callers on the worker sequence.
    pub fn ledger(&self) -> &LedgerState {
        &self.ledger
    }

    /// Independent copy of the ledger for readers on other tasks.
    pub fn snapshot(&self) -> LedgerState {
        self.ledger.clone()
    }

    pub fn hash_chain(&self) -> &StateHashChain {
        &self.hash_chain
    }

    pub fn metrics(&self) -> Option<&Arc<NodeMetrics>> {
        self.metrics.as_ref()
    }

    pub fn reorg_attempts(&self) -> u32 {
        self.recovery.attempts()
    }

    /// Hash of the last `state_hash_window` blocks, for comparing recent
    /// history with other nodes.
    pub fn recent_blocks_hash(&self) -> [u8; 32] {
        self.ledger.hash_of_last_blocks(self.state_hash_window)
    }

    /// Attest to the last `state_hash_window` blocks with `keys`.
    pub fn sign_recent_blocks(&self, keys: &KeyPair) -> SignedBlockWindow {
        let blocks = self.ledger.blocks();
        let window = &blocks[blocks.len().saturating_sub(self.state_hash_window)..];
        sign_block_window(window, keys)
    }

    /// Check an oracle's signed window against our blocks at the same
    /// heights, trusting only the configured oracle keys.
    pub fn check_oracle_window(&self, signed: &SignedBlockWindow) -> WindowVerdict {
        let len = signed.to_height.saturating_sub(signed.from_height) as usize + 1;
        let blocks = self.ledger.blocks_from_height(signed.from_height, len);
        let verdict = verify_block_window(blocks, signed, &self.oracle_keys);
        debug!(
            from_height = signed.from_height,
            to_height = signed.to_height,
            ?verdict,
            "oracle window checked"
        );
        verdict
    }

    /// Pushed blocks waiting for the initial catch-up.
    pub fn pending_blocks(&self) -> usize {
        self.pending.len()
    }

    // ── Driving ─────────────────────────────────────────────────────────

    /// Begin (or restart) catching up. Returns the first height to request.
    pub fn start(&mut self) -> u32 {
        self.recovery.reset();
        self.stale = false;
        self.node_state = NodeState::RequestingBlocks;
        let from_height = self.ledger.next_block_height();
        info!(role = ?self.role, from_height, "requesting blocks");
        from_height
    }

    /// Apply a batch delivered by the source, in list order.
    ///
    /// An empty batch means the source has nothing newer: the node is caught
    /// up. Otherwise the node asks for more right away.
    pub fn on_blocks_received(&mut self, blocks: Vec<SourceBlock>) -> Result<NextStep, NodeError> {
        let Some(first_height) = blocks.first().map(SourceBlock::height) else {
            return self.catch_up();
        };
        let _span = parse_batch_span(first_height, blocks.len()).entered();
        self.node_state = NodeState::Parsing;
        for block in &blocks {
            if let Err(ParseError::BlockNotConnecting { height, .. }) = self.apply_block(block) {
                return self.recover(height);
            }
        }
        self.recovery.reset();
        self.node_state = NodeState::RequestingBlocks;
        Ok(NextStep::Request {
            from_height: self.ledger.next_block_height(),
            delay: Duration::ZERO,
        })
    }

    /// Apply one newly announced block.
    ///
    /// Before the initial catch-up is done the block is held back, up to
    /// [`MAX_PENDING_BLOCKS`], and applied once the batch work completes. A
    /// stale node ignores pushed blocks until [`start`](Self::start) is
    /// called again.
    pub fn on_new_block_received(&mut self, block: SourceBlock) -> Result<NextStep, NodeError> {
        let height = block.height();
        if self.stale {
            debug!(height, "stale node ignores pushed block until restarted");
            return Ok(NextStep::Wait);
        }
        if self.node_state != NodeState::CaughtUp {
            if height <= self.chain_height() && !self.ledger.is_empty() {
                debug!(height, "pushed block already parsed");
            } else if self.pending.len() >= MAX_PENDING_BLOCKS {
                warn!(height, held = self.pending.len(), "pending block buffer full, dropping block");
            } else {
                debug!(height, state = ?self.node_state, "new block held until caught up");
                self.pending.push(block);
            }
            return Ok(NextStep::Wait);
        }
        self.node_state = NodeState::Parsing;
        match self.apply_block(&block) {
            Ok(_) => {
                self.recovery.reset();
                self.node_state = NodeState::CaughtUp;
                Ok(NextStep::Wait)
            }
            Err(ParseError::BlockNotConnecting { height, .. }) => self.recover(height),
        }
    }

    /// The source could not deliver. Retry with the same backoff as a reorg,
    /// without discarding anything.
    pub fn on_request_failed(&mut self, error: &SourceError) -> Result<NextStep, NodeError> {
        let from_height = self.ledger.next_block_height();
        warn!(from_height, error = %error, "block request failed");
        match self.recovery.next_attempt() {
            Some(delay) => {
                self.node_state = NodeState::RequestingBlocks;
                Ok(NextStep::Request { from_height, delay })
            }
            None => Err(self.give_up(from_height)),
        }
    }

    // ── Governance results ──────────────────────────────────────────────

    /// Record a parameter change approved by a vote. It shapes the next
    /// cycle, never the current one, and is undone with the head block.
    pub fn add_param_change(&mut self, change: ParamChange) -> Result<(), NodeError> {
        info!(
            param = ?change.param,
            value = change.value,
            activation_height = change.activation_height,
            "parameter change recorded"
        );
        self.ledger.add_param_change(change)?;
        Ok(())
    }

    /// Record an approved compensation or reimbursement request.
    pub fn add_issuance(&mut self, tx_id: TxId) -> Result<Issuance, NodeError> {
        let issuance = self.ledger.add_issuance(tx_id)?;
        info!(tx_id = %tx_id, amount = issuance.amount, "issuance recorded");
        if let Some(metrics) = &self.metrics {
            metrics.observe_ledger(&self.ledger);
        }
        Ok(issuance)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn catch_up(&mut self) -> Result<NextStep, NodeError> {
        self.node_state = NodeState::CaughtUp;
        self.recovery.reset();
        if !self.parse_complete {
            self.parse_complete = true;
            info!(chain_height = self.chain_height(), "initial parsing complete");
            self.sink.publish(LedgerEvent::ParseBlockChainComplete);
        }
        let pending = std::mem::take(&mut self.pending);
        let mut pending = pending.into_iter();
        while let Some(block) = pending.next() {
            if let Err(ParseError::BlockNotConnecting { height, .. }) = self.apply_block(&block) {
                // Whatever is left is re-evaluated after recovery.
                self.pending.extend(pending);
                return self.recover(height);
            }
        }
        Ok(NextStep::Wait)
    }

    /// Parse one block and notify listeners. A block we already hold under
    /// the same hash is skipped.
    fn apply_block(&mut self, block: &SourceBlock) -> Result<bool, ParseError> {
        let raw = block.pristine();
        if self
            .ledger
            .block_at_height(raw.height)
            .is_some_and(|b| b.hash == raw.hash)
        {
            debug!(height = raw.height, "block already parsed");
            return Ok(false);
        }
        if self.ledger.connects(raw.height, &raw.prev_hash) {
            self.sink.publish(LedgerEvent::NewBlockHeight(raw.height));
        }

        let _span = parse_block_span(raw.height, raw.txs.len()).entered();
        let started = Instant::now();
        let result = self.parser.parse_block(&raw, &mut self.ledger)?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let state_hash = self.ledger.state_hash();
        self.hash_chain.push(result.height, state_hash);
        for record in &result.marker_records {
            self.sink.publish(LedgerEvent::GovernanceRecord(record.clone()));
        }
        self.sink.publish(LedgerEvent::BlockAdded(BlockSummary {
            height: result.height,
            hash: raw.hash,
            txs: result.txs.iter().map(|(id, _)| *id).collect(),
            new_outputs: result.new_outputs.len(),
            state_hash,
        }));

        if let Some(metrics) = &self.metrics {
            metrics.blocks_parsed.inc();
            metrics.txs_classified.inc_by(result.txs.len() as u64);
            metrics.block_parse_time_ms.observe(elapsed_ms);
            metrics.observe_ledger(&self.ledger);
        }
        if let Some(snapshots) = &mut self.snapshots {
            if let Err(e) = snapshots.on_block_parsed(&self.ledger) {
                warn!(height = result.height, error = %e, "snapshot failed");
            }
        }
        Ok(true)
    }

    /// Discard the most recent blocks and ask for them again after a
    /// growing delay, or give up once the attempts are spent.
    fn recover(&mut self, from_height: u32) -> Result<NextStep, NodeError> {
        self.node_state = NodeState::ReorgRecovery;
        let Some(delay) = self.recovery.next_attempt() else {
            return Err(self.give_up(from_height));
        };
        let attempt = self.recovery.attempts();
        let target = self
            .recovery
            .rollback_target(self.chain_height(), self.ledger.oldest_undoable_height());
        let _span = reorg_span(attempt, target).entered();

        let removed = self.ledger.rollback_to(target)?;
        self.hash_chain.truncate_above(target);
        if let Some(snapshots) = &mut self.snapshots {
            if let Err(e) = snapshots.on_rollback(target) {
                warn!(height = target, error = %e, "snapshot cleanup failed");
            }
        }
        warn!(
            from_height,
            rollback_to = target,
            removed,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "block does not connect, rolled back"
        );
        self.sink.publish(LedgerEvent::Reorg {
            from: from_height,
            to: target,
        });
        if let Some(metrics) = &self.metrics {
            if attempt == 1 {
                metrics.reorgs.inc();
            }
            metrics.reorg_attempts.inc();
            metrics.observe_ledger(&self.ledger);
        }
        Ok(NextStep::Request {
            from_height: target + 1,
            delay,
        })
    }

    fn give_up(&mut self, from_height: u32) -> NodeError {
        let attempts = self.recovery.attempts();
        self.stale = true;
        self.node_state = NodeState::Idle;
        self.pending.clear();
        error!(
            attempts,
            from_height,
            chain_height = self.chain_height(),
            "chain still diverges, serving stale state"
        );
        if let Some(metrics) = &self.metrics {
            metrics.reorg_attempts.inc();
        }
        self.sink.publish(LedgerEvent::PersistentDivergence {
            attempts,
            from_height,
        });
        NodeError::PersistentDivergence {
            attempts,
            from_height,
        }
    }
}
