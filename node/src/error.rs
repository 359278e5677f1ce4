use thiserror::Error;

use crate::block_source::SourceError;

#[derive(Debug, Error)]
pub enum NodeError {
    /// Reorg recovery ran out of attempts. The node keeps serving the state
    /// it has but flags itself stale.
    #[error("chain still diverges after {attempts} recovery attempts (from height {from_height})")]
    PersistentDivergence { attempts: u32, from_height: u32 },

    #[error("ledger error: {0}")]
    Ledger(#[from] tessera_ledger::LedgerError),

    #[error("parse error: {0}")]
    Parse(#[from] tessera_parser::ParseError),

    #[error("block source error: {0}")]
    Source(#[from] SourceError),

    #[error("config error: {0}")]
    Config(String),

    #[error("worker has stopped")]
    WorkerStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
