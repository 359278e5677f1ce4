//! Nullable chain backend: a scripted block chain with forks and outages.

use std::sync::{Arc, Mutex, MutexGuard};

use tessera_node::{BlockSource, ChainReader, NodeRole, SourceBlock, SourceError};
use tessera_types::{BlockHash, GenesisTxInfo, RawBlock, RawTx, RawTxOutput, TxId, TxInput};

/// Deterministic hash of the block at `height` on branch `fork`.
pub fn block_hash(height: u32, fork: u8) -> BlockHash {
    let mut bytes = [0xB0; 32];
    bytes[..4].copy_from_slice(&height.to_be_bytes());
    bytes[4] = fork;
    BlockHash::new(bytes)
}

/// An in-memory chain of raw blocks.
///
/// Block hashes depend on height and the current branch, so re-mining a
/// range with [`diverge_from`](Self::diverge_from) yields blocks a node that
/// followed the old branch cannot connect.
#[derive(Clone, Debug)]
pub struct NullChain {
    genesis: GenesisTxInfo,
    blocks: Vec<RawBlock>,
    fork: u8,
    next_tx: u32,
}

impl NullChain {
    /// A chain holding only the genesis block, whose genesis tx has one
    /// output per value.
    pub fn new(genesis: GenesisTxInfo, genesis_values: &[u64]) -> Self {
        let genesis_tx = RawTx {
            id: genesis.tx_id,
            inputs: vec![TxInput::new(TxId::ZERO, 0)],
            outputs: outputs(genesis_values),
        };
        let height = genesis.block_height;
        Self {
            genesis,
            blocks: vec![RawBlock {
                height,
                time: block_time(height),
                hash: block_hash(height, 0),
                prev_hash: block_hash(height.saturating_sub(1), 0),
                txs: vec![genesis_tx],
            }],
            fork: 0,
            next_tx: 1,
        }
    }

    pub fn genesis(&self) -> GenesisTxInfo {
        self.genesis
    }

    pub fn tip_height(&self) -> u32 {
        self.blocks
            .last()
            .map_or(self.genesis.block_height, |b| b.height)
    }

    pub fn blocks(&self) -> &[RawBlock] {
        &self.blocks
    }

    pub fn block_at(&self, height: u32) -> Option<&RawBlock> {
        let index = height.checked_sub(self.genesis.block_height)?;
        self.blocks.get(index as usize)
    }

    pub fn blocks_from(&self, from_height: u32) -> Vec<RawBlock> {
        let start = from_height.saturating_sub(self.genesis.block_height) as usize;
        self.blocks.get(start..).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// A transaction with a fresh id spending `spends` into `values`.
    pub fn tx(&mut self, spends: &[(TxId, u32)], values: &[u64]) -> RawTx {
        let mut id = [0xEE; 32];
        id[..4].copy_from_slice(&self.next_tx.to_be_bytes());
        self.next_tx += 1;
        RawTx {
            id: TxId::new(id),
            inputs: spends
                .iter()
                .map(|(tx_id, index)| TxInput::new(*tx_id, *index))
                .collect(),
            outputs: outputs(values),
        }
    }

    /// Mine a block on top of the tip.
    pub fn push_block(&mut self, txs: Vec<RawTx>) -> &RawBlock {
        let prev = self.blocks.last().map(|b| (b.height, b.hash));
        let (height, prev_hash) = match prev {
            Some((h, hash)) => (h + 1, hash),
            None => (
                self.genesis.block_height,
                block_hash(self.genesis.block_height.saturating_sub(1), self.fork),
            ),
        };
        self.blocks.push(RawBlock {
            height,
            time: block_time(height),
            hash: block_hash(height, self.fork),
            prev_hash,
            txs,
        });
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn push_empty(&mut self, count: u32) {
        for _ in 0..count {
            self.push_block(Vec::new());
        }
    }

    /// Drop every block at or above `height`; later blocks are mined on a
    /// new branch.
    pub fn fork_at(&mut self, height: u32) {
        let keep = height.saturating_sub(self.genesis.block_height) as usize;
        self.blocks.truncate(keep.max(1));
        self.fork = self.fork.wrapping_add(1);
    }

    /// Re-mine the blocks at or above `height` on a new branch, keeping their
    /// transactions.
    pub fn diverge_from(&mut self, height: u32) {
        let keep = height.saturating_sub(self.genesis.block_height) as usize;
        let keep = keep.max(1).min(self.blocks.len());
        let tail: Vec<Vec<RawTx>> = self.blocks.drain(keep..).map(|b| b.txs).collect();
        self.fork = self.fork.wrapping_add(1);
        for txs in tail {
            self.push_block(txs);
        }
    }
}

impl ChainReader for NullChain {
    fn raw_blocks_from(&self, from_height: u32) -> Result<Vec<RawBlock>, SourceError> {
        Ok(self.blocks_from(from_height))
    }
}

fn outputs(values: &[u64]) -> Vec<RawTxOutput> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| RawTxOutput::new(i as u32, *v, format!("addr{i}")))
        .collect()
}

fn block_time(height: u32) -> u64 {
    1_600_000_000 + u64::from(height) * 600
}

// ── Source ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct SourceScript {
    failures: u32,
    requests: Vec<u32>,
}

/// Full-node block source over a shared [`NullChain`].
///
/// Clones share the chain and the script, so a test can extend or fork the
/// chain while a worker owns the source.
#[derive(Clone)]
pub struct NullBlockSource {
    chain: Arc<Mutex<NullChain>>,
    script: Arc<Mutex<SourceScript>>,
    batch_size: usize,
}

impl NullBlockSource {
    pub fn new(chain: NullChain) -> Self {
        Self {
            chain: Arc::new(Mutex::new(chain)),
            script: Arc::default(),
            batch_size: usize::MAX,
        }
    }

    /// Serve at most `batch_size` blocks per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn chain(&self) -> MutexGuard<'_, NullChain> {
        self.chain.lock().unwrap()
    }

    /// Make the next `count` requests fail.
    pub fn fail_next(&self, count: u32) {
        self.script.lock().unwrap().failures = count;
    }

    /// Heights requested so far, in order.
    pub fn requests(&self) -> Vec<u32> {
        self.script.lock().unwrap().requests.clone()
    }

    fn serve(&self, from_height: u32) -> Result<Vec<SourceBlock>, SourceError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(from_height);
        if script.failures > 0 {
            script.failures -= 1;
            return Err(SourceError::Unavailable("scripted outage".into()));
        }
        Ok(self
            .chain()
            .blocks_from(from_height)
            .into_iter()
            .take(self.batch_size)
            .map(SourceBlock::Raw)
            .collect())
    }
}

impl BlockSource for NullBlockSource {
    fn role(&self) -> NodeRole {
        NodeRole::Full
    }

    fn request_blocks(
        &mut self,
        from_height: u32,
    ) -> impl std::future::Future<Output = Result<Vec<SourceBlock>, SourceError>> + Send {
        std::future::ready(self.serve(from_height))
    }
}
