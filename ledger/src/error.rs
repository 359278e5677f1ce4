use thiserror::Error;

use tessera_types::TxId;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot roll back to height {target}: undo journal only reaches height {oldest}")]
    RollbackTooDeep { target: u32, oldest: u32 },

    #[error("transaction {0} is not a known issuance request")]
    NotAnIssuanceRequest(TxId),

    #[error("issuance for {0} was already recorded")]
    DuplicateIssuance(TxId),

    #[error("ledger is empty")]
    Empty,

    #[error("unsupported ledger format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
