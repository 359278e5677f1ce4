//! Classification tags assigned to transactions and outputs at parse time.

use serde::{Deserialize, Serialize};

use crate::OpReturnType;

/// What kind of token transaction a parsed transaction turned out to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TxType {
    Undefined,
    Genesis,
    /// Plain transfer: no marker and no burnt fee.
    TransferBsq,
    /// No marker but some input value left unallocated.
    PayTradeFee,
    Proposal,
    CompensationRequest,
    ReimbursementRequest,
    BlindVote,
    VoteReveal,
    Lockup,
    Unlock,
    AssetListingFee,
    ProofOfBurn,
    /// Wrong fee or wrong phase. Token outputs stay valid.
    Irregular,
    /// Rule violation. Every input is burnt and no output is valid.
    Invalid,
}

impl TxType {
    /// Tx type implied by a well-formed marker.
    pub fn from_op_return(op: OpReturnType) -> Self {
        match op {
            OpReturnType::Proposal => Self::Proposal,
            OpReturnType::CompensationRequest => Self::CompensationRequest,
            OpReturnType::ReimbursementRequest => Self::ReimbursementRequest,
            OpReturnType::BlindVote => Self::BlindVote,
            OpReturnType::VoteReveal => Self::VoteReveal,
            OpReturnType::Lockup => Self::Lockup,
            OpReturnType::AssetListingFee => Self::AssetListingFee,
            OpReturnType::ProofOfBurn => Self::ProofOfBurn,
        }
    }
}

/// What a single output turned out to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TxOutputType {
    Undefined,
    Genesis,
    Bsq,
    /// Native chain value only; carries no token value.
    Btc,
    ProposalOpReturn,
    CompReqOpReturn,
    ReimbursementOpReturn,
    /// Requested issuance; becomes token value only once approved.
    IssuanceCandidate,
    BlindVoteLockStake,
    BlindVoteOpReturn,
    VoteRevealUnlockStake,
    VoteRevealOpReturn,
    AssetListingFeeOpReturn,
    ProofOfBurnOpReturn,
    Lockup,
    LockupOpReturn,
    Unlock,
    InvalidOutput,
}

impl TxOutputType {
    /// Outputs of these types enter the unspent map when their tx commits.
    pub fn is_token_bearing(&self) -> bool {
        matches!(
            self,
            Self::Genesis
                | Self::Bsq
                | Self::BlindVoteLockStake
                | Self::VoteRevealUnlockStake
                | Self::Lockup
                | Self::Unlock
        )
    }

    /// Output type used for a marker output of the given kind.
    pub fn for_op_return(op: OpReturnType) -> Self {
        match op {
            OpReturnType::Proposal => Self::ProposalOpReturn,
            OpReturnType::CompensationRequest => Self::CompReqOpReturn,
            OpReturnType::ReimbursementRequest => Self::ReimbursementOpReturn,
            OpReturnType::BlindVote => Self::BlindVoteOpReturn,
            OpReturnType::VoteReveal => Self::VoteRevealOpReturn,
            OpReturnType::Lockup => Self::LockupOpReturn,
            OpReturnType::AssetListingFee => Self::AssetListingFeeOpReturn,
            OpReturnType::ProofOfBurn => Self::ProofOfBurnOpReturn,
        }
    }

    pub fn is_op_return(&self) -> bool {
        matches!(
            self,
            Self::ProposalOpReturn
                | Self::CompReqOpReturn
                | Self::ReimbursementOpReturn
                | Self::BlindVoteOpReturn
                | Self::VoteRevealOpReturn
                | Self::AssetListingFeeOpReturn
                | Self::ProofOfBurnOpReturn
                | Self::LockupOpReturn
        )
    }
}
