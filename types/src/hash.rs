//! Transaction identifiers and the hex serde helper shared by 32-byte ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TesseraError;

/// A 32-byte transaction id as assigned by the underlying chain.
///
/// Ordering is bytewise, which is what keeps the output maps and the state
/// hash identical across nodes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxId(#[serde(with = "hex_bytes")] [u8; 32]);

impl TxId {
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

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({}\u{2026})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for TxId {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex_bytes::decode_32(s).map(Self)
    }
}

/// Serde adapter: hex strings for human-readable formats (JSON, TOML), raw
/// bytes for binary formats so the canonical bincode encoding stays compact.
pub(crate) mod hex_bytes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::TesseraError;

    pub fn decode_32(s: &str) -> Result<[u8; 32], TesseraError> {
        let bytes = hex::decode(s).map_err(|e| TesseraError::InvalidHex(e.to_string()))?;
        bytes
            .try_into()
            .map_err(|v: Vec<u8>| TesseraError::InvalidHex(format!("expected 32 bytes, got {}", v.len())))
    }

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            serde::Serialize::serialize(bytes, serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            decode_32(&s).map_err(D::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer)
        }
    }
}
