//! Events emitted while the ledger advances, and the sinks that carry them.

use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::broadcast;

use tessera_ledger::MarkerRecord;
use tessera_types::{BlockHash, TxId};

/// What one parsed block added to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlockSummary {
    pub height: u32,
    pub hash: BlockHash,
    /// Token transactions recorded, in parse order.
    pub txs: Vec<TxId>,
    pub new_outputs: usize,
    pub state_hash: [u8; 32],
}

/// Ledger-level events, published once per occurrence and in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum LedgerEvent {
    /// The ledger is about to report a block at this height.
    NewBlockHeight(u32),
    BlockAdded(BlockSummary),
    /// A transaction with a governance marker was recorded.
    GovernanceRecord(MarkerRecord),
    /// The initial catch-up finished; later blocks arrive one at a time.
    ParseBlockChainComplete,
    /// Blocks above `to` were discarded after a block at `from` did not
    /// connect.
    Reorg { from: u32, to: u32 },
    /// Recovery gave up; the node now serves stale state.
    PersistentDivergence { attempts: u32, from_height: u32 },
}

/// Receives ledger events from the controller.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: LedgerEvent);
}

/// Synchronous fan-out to registered callbacks.
///
/// Listeners run inline on the parsing thread; keep them fast.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&LedgerEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &LedgerEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: LedgerEvent) {
        self.emit(&event);
    }
}

/// Forwards events to any number of async subscribers.
///
/// A subscriber that falls more than `capacity` events behind sees a lag
/// error on its next receive and skips ahead.
#[derive(Clone)]
pub struct ChannelSink {
    sender: broadcast::Sender<LedgerEvent>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: LedgerEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: LedgerEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn publish(&self, event: LedgerEvent) {
        (**self).publish(event);
    }
}
