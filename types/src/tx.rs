//! Transactions, inputs, outputs and output keys.
//!
//! `Raw*` types are what a block source delivers: decoded from the chain's
//! wire format but carrying no token classification. [`Tx`] and [`TxOutput`]
//! are the parsed forms stored in the ledger. Converting a parsed value back
//! with `to_raw` drops everything the parser derived.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{TxId, TxOutputType, TxType};

/// Uniquely identifies an output: the id of the transaction that created it
/// and the output's index within that transaction.
///
/// Ordered by tx id, then index. Both output maps are keyed by this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxOutputKey {
    pub tx_id: TxId,
    pub index: u32,
}

impl TxOutputKey {
    pub fn new(tx_id: TxId, index: u32) -> Self {
        Self { tx_id, index }
    }
}

impl fmt::Display for TxOutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.index)
    }
}

/// A reference to the output an input spends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxInput {
    pub connected_tx_id: TxId,
    pub connected_index: u32,
}

impl TxInput {
    pub fn new(connected_tx_id: TxId, connected_index: u32) -> Self {
        Self {
            connected_tx_id,
            connected_index,
        }
    }

    pub fn output_key(&self) -> TxOutputKey {
        TxOutputKey::new(self.connected_tx_id, self.connected_index)
    }
}

/// An output as delivered by the block source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTxOutput {
    pub index: u32,
    /// Native chain value in the smallest unit.
    pub value: u64,
    #[serde(default)]
    pub address: Option<String>,
    /// Payload of an unspendable data output, if this is one.
    #[serde(default, with = "opt_hex")]
    pub op_return_data: Option<Vec<u8>>,
}

impl RawTxOutput {
    pub fn new(index: u32, value: u64, address: impl Into<String>) -> Self {
        Self {
            index,
            value,
            address: Some(address.into()),
            op_return_data: None,
        }
    }

    pub fn op_return(index: u32, data: Vec<u8>) -> Self {
        Self {
            index,
            value: 0,
            address: None,
            op_return_data: Some(data),
        }
    }

    pub fn is_op_return(&self) -> bool {
        self.op_return_data.is_some()
    }
}

/// A transaction as delivered by the block source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTx {
    pub id: TxId,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<RawTxOutput>,
}

impl RawTx {
    /// Whether any input spends an output of `tx_id`.
    pub fn spends_from(&self, tx_id: &TxId) -> bool {
        self.inputs.iter().any(|i| i.connected_tx_id == *tx_id)
    }
}

/// A parsed output with its derived classification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub tx_id: TxId,
    pub index: u32,
    pub value: u64,
    pub address: Option<String>,
    pub op_return_data: Option<Vec<u8>>,
    pub block_height: u32,
    pub output_type: TxOutputType,
    /// Lock time in blocks; set on lockup and unlock outputs.
    pub lock_time: u16,
    /// Height from which an unlock output may be spent; zero otherwise.
    pub unlock_block_height: u32,
}

impl TxOutput {
    /// Fresh, unclassified output confirmed at `block_height`.
    pub fn from_raw(tx_id: TxId, block_height: u32, raw: &RawTxOutput) -> Self {
        Self {
            tx_id,
            index: raw.index,
            value: raw.value,
            address: raw.address.clone(),
            op_return_data: raw.op_return_data.clone(),
            block_height,
            output_type: TxOutputType::Undefined,
            lock_time: 0,
            unlock_block_height: 0,
        }
    }

    pub fn key(&self) -> TxOutputKey {
        TxOutputKey::new(self.tx_id, self.index)
    }

    pub fn is_token_bearing(&self) -> bool {
        self.output_type.is_token_bearing()
    }

    pub fn to_raw(&self) -> RawTxOutput {
        RawTxOutput {
            index: self.index,
            value: self.value,
            address: self.address.clone(),
            op_return_data: self.op_return_data.clone(),
        }
    }
}

/// A parsed token transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub id: TxId,
    pub block_height: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub tx_type: TxType,
    /// Token input value not allocated to any output.
    pub burnt_fee: u64,
}

impl Tx {
    pub fn output(&self, index: u32) -> Option<&TxOutput> {
        self.outputs.get(index as usize)
    }

    /// Sum of the values of all token-bearing outputs.
    pub fn token_output_value(&self) -> u64 {
        self.outputs
            .iter()
            .filter(|o| o.is_token_bearing())
            .map(|o| o.value)
            .sum()
    }

    pub fn to_raw(&self) -> RawTx {
        RawTx {
            id: self.id,
            inputs: self.inputs.clone(),
            outputs: self.outputs.iter().map(TxOutput::to_raw).collect(),
        }
    }
}

/// Which transaction consumed an output, and where.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentInfo {
    pub block_height: u32,
    pub tx_id: TxId,
    pub input_index: u32,
}

mod opt_hex {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            data.as_ref().map(hex::encode).serialize(serializer)
        } else {
            data.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        if deserializer.is_human_readable() {
            Option::<String>::deserialize(deserializer)?
                .map(|s| hex::decode(s).map_err(D::Error::custom))
                .transpose()
        } else {
            Option::<Vec<u8>>::deserialize(deserializer)
        }
    }
}
