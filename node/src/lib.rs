//! Tessera ledger node.
//!
//! Wires the parser and ledger to a block source:
//! - [`NodeController`] applies blocks in height order and recovers from
//!   chain reorganizations with a bounded, growing backoff
//! - [`spawn_worker`] runs the controller on one tokio task fed by an
//!   ordered queue
//! - [`BlockSource`] abstracts full-node (direct chain access) and lite-node
//!   (peer relay) retrieval
//! - [`SnapshotService`] persists the ledger on a fixed height grid
//! - [`accounting`] cross-checks block windows against signed oracle hashes

pub mod accounting;
pub mod block_source;
pub mod config;
pub mod controller;
pub mod error;
pub mod ledger_event;
pub mod logging;
pub mod metrics;
pub mod reorg;
pub mod snapshot_service;
pub mod tracing_spans;
pub mod worker;

pub use accounting::{sign_block_window, verify_block_window, SignedBlockWindow, WindowVerdict};
pub use block_source::{
    BlockSource, ChainReader, DirectSource, PeerClient, PeerSource, SourceBlock, SourceError,
};
pub use config::{GenesisOverride, NodeConfig, NodeRole};
pub use controller::{NextStep, NodeController, NodeState, NodeStatus, MAX_PENDING_BLOCKS};
pub use error::NodeError;
pub use ledger_event::{BlockSummary, ChannelSink, EventBus, EventSink, LedgerEvent, RecordingSink};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use reorg::ReorgRecovery;
pub use snapshot_service::SnapshotService;
pub use worker::{spawn_worker, Sleeper, TokioSleeper, WorkItem, WorkerHandle};
