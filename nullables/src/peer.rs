//! Nullable peer: serves blocks another node has already parsed.

use std::sync::{Arc, Mutex};

use tessera_ledger::LedgerState;
use tessera_node::{PeerClient, SourceError};
use tessera_types::Block;

/// A peer answering block requests from a fixed list.
///
/// Clones share the list, so a test can publish more blocks while a lite
/// node's worker holds the peer.
#[derive(Clone, Default)]
pub struct NullPeer {
    blocks: Arc<Mutex<Vec<Block>>>,
    batch_size: Option<usize>,
}

impl NullPeer {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Arc::new(Mutex::new(blocks)),
            batch_size: None,
        }
    }

    /// Serve what `ledger` has parsed, as a full node peer would.
    pub fn from_ledger(ledger: &LedgerState) -> Self {
        Self::new(ledger.blocks().to_vec())
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size.max(1));
        self
    }

    pub fn publish(&self, block: Block) {
        self.blocks.lock().unwrap().push(block);
    }

    /// Replace everything the peer serves.
    pub fn replace(&self, blocks: Vec<Block>) {
        *self.blocks.lock().unwrap() = blocks;
    }
}

impl PeerClient for NullPeer {
    fn fetch_blocks(
        &mut self,
        from_height: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Block>, SourceError>> + Send {
        let blocks: Vec<Block> = self
            .blocks
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.height >= from_height)
            .take(self.batch_size.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        std::future::ready(Ok(blocks))
    }
}
