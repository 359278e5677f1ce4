//! Fundamental types for the Tessera ledger engine.
//!
//! This crate defines the data model shared across every other crate in the
//! workspace: block and transaction shapes as they arrive from a block source,
//! their parsed counterparts stored in the ledger, output keys, the
//! classification tags, governance marker codes, and network identifiers.

pub mod block;
pub mod error;
pub mod hash;
pub mod network;
pub mod op_return;
pub mod tx;
pub mod tx_type;

pub use block::{Block, BlockHash, Pristine, RawBlock};
pub use error::TesseraError;
pub use hash::TxId;
pub use network::{GenesisTxInfo, NetworkId};
pub use op_return::OpReturnType;
pub use tx::{RawTx, RawTxOutput, SpentInfo, Tx, TxInput, TxOutput, TxOutputKey};
pub use tx_type::{TxOutputType, TxType};
