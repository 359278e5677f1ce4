//! Block hash, raw blocks as delivered by a source, and parsed blocks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::hash::hex_bytes;
use crate::{RawTx, TesseraError, Tx};

/// A 32-byte block hash as assigned by the underlying chain.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockHash(#[serde(with = "hex_bytes")] [u8; 32]);

impl Default for BlockHash {
    fn default() -> Self {
        Self::ZERO
    }
}

impl BlockHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash(")?;
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "\u{2026})")
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for BlockHash {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex_bytes::decode_32(s).map(Self)
    }
}

/// A block as delivered by a block source: decoded, but not yet parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBlock {
    pub height: u32,
    /// Block time in seconds since the epoch.
    pub time: u64,
    pub hash: BlockHash,
    pub prev_hash: BlockHash,
    pub txs: Vec<RawTx>,
}

/// A parsed block as stored in the ledger.
///
/// Only token transactions are kept; everything else in the raw block had no
/// effect on the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u32,
    pub time: u64,
    pub hash: BlockHash,
    pub prev_hash: BlockHash,
    pub txs: Vec<Tx>,
}

impl Block {
    /// Empty parsed block carrying the header of `raw`.
    pub fn from_raw_header(raw: &RawBlock) -> Self {
        Self {
            height: raw.height,
            time: raw.time,
            hash: raw.hash,
            prev_hash: raw.prev_hash,
            txs: Vec::new(),
        }
    }
}

/// Anything that can be turned back into an unparsed block.
///
/// Blocks relayed by peers arrive already parsed. A node never trusts those
/// derived fields: it resets the block and parses it again itself.
pub trait Pristine {
    fn pristine(&self) -> RawBlock;
}

impl Pristine for RawBlock {
    fn pristine(&self) -> RawBlock {
        self.clone()
    }
}

impl Pristine for Block {
    fn pristine(&self) -> RawBlock {
        RawBlock {
            height: self.height,
            time: self.time,
            hash: self.hash,
            prev_hash: self.prev_hash,
            txs: self.txs.iter().map(Tx::to_raw).collect(),
        }
    }
}
