//! Canonical ledger state for the Tessera engine.
//!
//! Holds the append-only block list, the unspent and spent output maps, the
//! cycle list, and the append-only governance records (parameter changes,
//! issuances, marker records). Every map that feeds the state hash is a
//! `BTreeMap`, so iteration order is the same on every node.
//!
//! Mutation happens one block at a time through a [`BlockWriter`]; each block
//! leaves an undo entry so that the most recent blocks can be discarded in
//! LIFO order when the chain reorganizes.

pub mod error;
pub mod issuance;
pub mod persistence;
pub mod state;
pub mod state_hash;
pub mod undo;
pub mod view;

pub use error::LedgerError;
pub use issuance::{Issuance, IssuanceType, MarkerRecord};
pub use persistence::{PersistedLedger, LEDGER_FORMAT_VERSION};
pub use state::{BlockWriter, LedgerState, LedgerSummary, DEFAULT_UNDO_DEPTH};
pub use state_hash::{hash_of_block_window, StateHashChain, StateHashEntry};
pub use undo::BlockUndo;
pub use view::LedgerView;
