//! Governance parameters, their per-network defaults, and approved changes.

use serde::{Deserialize, Serialize};
use std::fmt;

use tessera_types::{NetworkId, TxId};

use crate::GovernanceError;

/// Every parameter the ledger engine reads. Fees are in the token's smallest
/// unit, phase durations and lock times in blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Param {
    ProposalFee,
    BlindVoteFee,
    LockTimeMin,
    LockTimeMax,

    PhaseProposal,
    PhaseBreak1,
    PhaseBlindVote,
    PhaseBreak2,
    PhaseVoteReveal,
    PhaseBreak3,
    PhaseResult,
}

impl Param {
    /// Human-readable name of this parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProposalFee => "proposal_fee",
            Self::BlindVoteFee => "blind_vote_fee",
            Self::LockTimeMin => "lock_time_min",
            Self::LockTimeMax => "lock_time_max",
            Self::PhaseProposal => "phase_proposal",
            Self::PhaseBreak1 => "phase_break1",
            Self::PhaseBlindVote => "phase_blind_vote",
            Self::PhaseBreak2 => "phase_break2",
            Self::PhaseVoteReveal => "phase_vote_reveal",
            Self::PhaseBreak3 => "phase_break3",
            Self::PhaseResult => "phase_result",
        }
    }

    /// Value in effect when no change has been approved.
    pub fn default_value(&self, network: NetworkId) -> u64 {
        match self {
            Self::ProposalFee | Self::BlindVoteFee => 200,
            Self::LockTimeMin => 6,
            Self::LockTimeMax => u16::MAX as u64,
            phase => phase_default(*phase, network),
        }
    }

    pub fn is_phase_duration(&self) -> bool {
        matches!(
            self,
            Self::PhaseProposal
                | Self::PhaseBreak1
                | Self::PhaseBlindVote
                | Self::PhaseBreak2
                | Self::PhaseVoteReveal
                | Self::PhaseBreak3
                | Self::PhaseResult
        )
    }
}

fn phase_default(param: Param, network: NetworkId) -> u64 {
    // proposal, break1, blind vote, break2, vote reveal, break3, result
    let table: [u64; 7] = match network {
        NetworkId::Mainnet => [3601, 149, 451, 9, 451, 9, 10],
        NetworkId::Testnet => [380, 10, 300, 10, 300, 10, 2],
        NetworkId::Regtest => [4, 1, 2, 1, 2, 1, 2],
    };
    let idx = match param {
        Param::PhaseProposal => 0,
        Param::PhaseBreak1 => 1,
        Param::PhaseBlindVote => 2,
        Param::PhaseBreak2 => 3,
        Param::PhaseVoteReveal => 4,
        Param::PhaseBreak3 => 5,
        _ => 6,
    };
    table[idx]
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A governance-approved parameter value, effective from `activation_height`.
///
/// Keyed by the id of the proposal transaction that requested it. Never
/// mutated once recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamChange {
    pub param: Param,
    pub value: u64,
    pub activation_height: u32,
    pub proposal_tx_id: TxId,
}

/// Resolves a parameter's effective value at a height.
pub trait ParamLookup {
    fn param_value(&self, param: Param, height: u32) -> Result<u64, GovernanceError>;

    /// The value as a block count. Durations must be non-zero and fit in a
    /// block height.
    fn param_value_as_block_count(&self, param: Param, height: u32) -> Result<u32, GovernanceError> {
        let value = self.param_value(param, height)?;
        match u32::try_from(value) {
            Ok(0) if param.is_phase_duration() => Err(GovernanceError::ParameterLookupFailure {
                param,
                height,
                reason: "phase duration of zero blocks".to_string(),
            }),
            Ok(blocks) => Ok(blocks),
            Err(_) => Err(GovernanceError::ParameterLookupFailure {
                param,
                height,
                reason: format!("{value} does not fit a block count"),
            }),
        }
    }
}

/// The change to `param` with the highest activation height at or below
/// `height`, if any. Of changes activated at the same height, the one
/// recorded last wins.
pub fn latest_change(changes: &[ParamChange], param: Param, height: u32) -> Option<&ParamChange> {
    changes
        .iter()
        .filter(|c| c.param == param && c.activation_height <= height)
        .max_by_key(|c| c.activation_height)
}
