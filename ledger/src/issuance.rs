//! Append-only governance records kept in the ledger.

use serde::{Deserialize, Serialize};

use tessera_types::{OpReturnType, TxId, TxType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssuanceType {
    Compensation,
    Reimbursement,
}

impl IssuanceType {
    pub fn from_tx_type(tx_type: TxType) -> Option<Self> {
        match tx_type {
            TxType::CompensationRequest => Some(Self::Compensation),
            TxType::ReimbursementRequest => Some(Self::Reimbursement),
            _ => None,
        }
    }
}

/// Newly created token value, approved by governance for a request tx.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuance {
    pub tx_id: TxId,
    /// Chain height at which the approval was recorded.
    pub chain_height: u32,
    pub amount: u64,
    pub issuance_type: IssuanceType,
}

/// A transaction carrying a recognized governance marker, as seen by the
/// parser. Downstream governance services consume these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub tx_id: TxId,
    pub block_height: u32,
    pub op_return_type: OpReturnType,
    /// Final classification; `Irregular` when fee or phase was wrong.
    pub tx_type: TxType,
    pub op_return_data: Vec<u8>,
}
