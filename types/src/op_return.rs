//! Governance marker type codes carried in a transaction's data output.
//!
//! Layout of a marker: byte 0 is the type code, byte 1 the version, the rest
//! a type-specific payload. Each type has a fixed total length.

use serde::{Deserialize, Serialize};

/// The fixed set of governance markers a data output can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OpReturnType {
    Proposal,
    CompensationRequest,
    ReimbursementRequest,
    BlindVote,
    VoteReveal,
    Lockup,
    AssetListingFee,
    ProofOfBurn,
}

impl OpReturnType {
    pub const ALL: [OpReturnType; 8] = [
        Self::Proposal,
        Self::CompensationRequest,
        Self::ReimbursementRequest,
        Self::BlindVote,
        Self::VoteReveal,
        Self::Lockup,
        Self::AssetListingFee,
        Self::ProofOfBurn,
    ];

    pub fn code(&self) -> u8 {
        match self {
            Self::Proposal => 0x10,
            Self::CompensationRequest => 0x11,
            Self::ReimbursementRequest => 0x12,
            Self::BlindVote => 0x13,
            Self::VoteReveal => 0x14,
            Self::Lockup => 0x15,
            Self::AssetListingFee => 0x16,
            Self::ProofOfBurn => 0x17,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Total marker length in bytes, type and version included.
    ///
    /// Hash-carrying markers hold a 20-byte hash. Vote reveals add a 16-byte
    /// secret key; lockups carry a reason byte and a 2-byte lock time before
    /// the hash.
    pub fn expected_len(&self) -> usize {
        match self {
            Self::VoteReveal => 38,
            Self::Lockup => 25,
            _ => 22,
        }
    }

    /// Whether this marker asks for newly issued tokens.
    pub fn is_issuance_request(&self) -> bool {
        matches!(self, Self::CompensationRequest | Self::ReimbursementRequest)
    }
}
