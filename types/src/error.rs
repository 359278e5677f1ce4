//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for the data model.
#[derive(Debug, Error)]
pub enum TesseraError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}
