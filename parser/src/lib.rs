//! Derives token state from raw blocks.
//!
//! The [`TxClassifier`] decides, for one transaction against a read-only
//! ledger view, which outputs carry token value and what governance marker
//! (if any) the transaction carries. It never mutates anything. The
//! [`BlockParser`] orders a block's transactions so that same-block spends
//! follow their producers, runs the classifier on each, and folds the
//! results into the ledger one transaction at a time.

pub mod block_parser;
pub mod classifier;
pub mod error;
pub mod marker;
pub mod ordering;

pub use block_parser::{BlockParser, ParseResult};
pub use classifier::{TxClassification, TxClassifier};
pub use error::ParseError;
pub use marker::{encode_lockup, encode_marker, parse_marker, MarkerRejection, ParsedMarker};
pub use ordering::{dependency_order, MAX_ORDERING_PASSES};
