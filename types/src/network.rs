//! Network identifier and the genesis transaction that seeds each network.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{TesseraError, TxId};

/// Identifies which chain a node derives its ledger from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production chain.
    Mainnet,
    /// The public test chain.
    Testnet,
    /// Local regression-test chain with short governance phases.
    Regtest,
}

impl NetworkId {
    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Regtest => "regtest",
        }
    }

    /// Hard-coded genesis transaction for this network.
    ///
    /// Regtest has no fixed genesis; nodes on it are expected to override
    /// the tx id through configuration.
    pub fn genesis(&self) -> GenesisTxInfo {
        match self {
            Self::Mainnet => GenesisTxInfo::from_hex(
                "4b5417ec5ab6112bedf539c3b4f5a806ed539542d8b717e1c4470aa3180edce5",
                571_747,
            ),
            Self::Testnet => GenesisTxInfo::from_hex(
                "09e70ce0ab7a962a82a2ca84c9ae8a89140bf1c3fb6f7efad6162e39e4b362ae",
                1_446_300,
            ),
            Self::Regtest => GenesisTxInfo {
                tx_id: TxId::ZERO,
                block_height: 111,
            },
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "regtest" => Ok(Self::Regtest),
            other => Err(TesseraError::UnknownNetwork(other.to_string())),
        }
    }
}

/// The single transaction that seeds the token supply, identified by id and
/// the height of the block that must confirm it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisTxInfo {
    pub tx_id: TxId,
    pub block_height: u32,
}

impl GenesisTxInfo {
    pub fn new(tx_id: TxId, block_height: u32) -> Self {
        Self {
            tx_id,
            block_height,
        }
    }

    /// Build from a compile-time constant. Falls back to a zero id if the
    /// constant is not valid hex, which never matches a real transaction.
    fn from_hex(tx_id: &str, block_height: u32) -> Self {
        Self {
            tx_id: tx_id.parse().unwrap_or(TxId::ZERO),
            block_height,
        }
    }

    /// Whether `tx_id` confirmed at `height` is the genesis transaction.
    pub fn is_genesis(&self, tx_id: &TxId, height: u32) -> bool {
        self.tx_id == *tx_id && self.block_height == height
    }
}
