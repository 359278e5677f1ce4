//! Cycles and their phases.

use serde::{Deserialize, Serialize};

use crate::Param;

/// A governance phase. `Undefined` is returned for heights no cycle covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Undefined,
    Proposal,
    Break1,
    BlindVote,
    Break2,
    VoteReveal,
    Break3,
    Result,
}

impl Phase {
    /// Phases of a cycle, in order.
    pub const ORDERED: [Phase; 7] = [
        Self::Proposal,
        Self::Break1,
        Self::BlindVote,
        Self::Break2,
        Self::VoteReveal,
        Self::Break3,
        Self::Result,
    ];

    /// The parameter holding this phase's duration.
    pub fn duration_param(&self) -> Option<Param> {
        match self {
            Self::Undefined => None,
            Self::Proposal => Some(Param::PhaseProposal),
            Self::Break1 => Some(Param::PhaseBreak1),
            Self::BlindVote => Some(Param::PhaseBlindVote),
            Self::Break2 => Some(Param::PhaseBreak2),
            Self::VoteReveal => Some(Param::PhaseVoteReveal),
            Self::Break3 => Some(Param::PhaseBreak3),
            Self::Result => Some(Param::PhaseResult),
        }
    }
}

/// A phase and its duration in blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoPhase {
    pub phase: Phase,
    pub duration: u32,
}

impl DaoPhase {
    pub fn new(phase: Phase, duration: u32) -> Self {
        Self { phase, duration }
    }
}

/// A window of blocks starting at `height_of_first_block`, split into phases.
///
/// Immutable once the next cycle exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub height_of_first_block: u32,
    pub phases: Vec<DaoPhase>,
}

impl Cycle {
    pub fn new(height_of_first_block: u32, phases: Vec<DaoPhase>) -> Self {
        Self {
            height_of_first_block,
            phases,
        }
    }

    /// Total length in blocks, saturating at `u32::MAX`.
    pub fn duration(&self) -> u32 {
        self.phases
            .iter()
            .fold(0u32, |total, p| total.saturating_add(p.duration))
    }

    /// Saturates at `u32::MAX` for a cycle reaching past the last height.
    pub fn height_of_last_block(&self) -> u32 {
        self.height_of_first_block
            .saturating_add(self.duration().saturating_sub(1))
    }

    pub fn contains(&self, height: u32) -> bool {
        height >= self.height_of_first_block && height <= self.height_of_last_block()
    }

    /// `[first, last]` block window of `phase` within this cycle.
    pub fn phase_window(&self, phase: Phase) -> Option<(u32, u32)> {
        let mut start = self.height_of_first_block;
        for p in &self.phases {
            if p.duration == 0 {
                continue;
            }
            let end = start.saturating_add(p.duration - 1);
            if p.phase == phase {
                return Some((start, end));
            }
            start = end.saturating_add(1);
        }
        None
    }

    /// The phase whose window contains `height`, or `Undefined`.
    pub fn phase_for_height(&self, height: u32) -> Phase {
        if !self.contains(height) {
            return Phase::Undefined;
        }
        let mut start = u64::from(self.height_of_first_block);
        for p in &self.phases {
            let end = start + u64::from(p.duration);
            if p.duration > 0 && u64::from(height) < end {
                return p.phase;
            }
            start = end;
        }
        Phase::Undefined
    }

    pub fn duration_of(&self, phase: Phase) -> Option<u32> {
        self.phases.iter().find(|p| p.phase == phase).map(|p| p.duration)
    }
}
