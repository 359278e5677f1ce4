//! Height-based queries over a cycle list.

use crate::{Cycle, Phase};

/// Read-only view answering "which cycle / phase is this height in".
///
/// Heights no cycle covers resolve to [`Phase::Undefined`]; callers treat
/// that as "not in any phase", never as an error.
#[derive(Clone, Copy, Debug)]
pub struct PeriodService<'a> {
    cycles: &'a [Cycle],
}

impl<'a> PeriodService<'a> {
    /// `cycles` must be ordered by start height without gaps, as the ledger
    /// keeps them.
    pub fn new(cycles: &'a [Cycle]) -> Self {
        Self { cycles }
    }

    pub fn cycle_for_height(&self, height: u32) -> Option<&'a Cycle> {
        let idx = self
            .cycles
            .partition_point(|c| c.height_of_first_block <= height);
        let cycle = self.cycles.get(idx.checked_sub(1)?)?;
        cycle.contains(height).then_some(cycle)
    }

    pub fn phase_for_height(&self, height: u32) -> Phase {
        self.cycle_for_height(height)
            .map_or(Phase::Undefined, |c| c.phase_for_height(height))
    }

    pub fn is_in_phase(&self, height: u32, phase: Phase) -> bool {
        phase != Phase::Undefined && self.phase_for_height(height) == phase
    }

    /// First block of `phase` in the cycle containing `height`.
    pub fn first_block_of_phase(&self, height: u32, phase: Phase) -> Option<u32> {
        self.cycle_for_height(height)?
            .phase_window(phase)
            .map(|(first, _)| first)
    }

    /// Last block of `phase` in the cycle containing `height`.
    pub fn last_block_of_phase(&self, height: u32, phase: Phase) -> Option<u32> {
        self.cycle_for_height(height)?
            .phase_window(phase)
            .map(|(_, last)| last)
    }

    pub fn duration_for_phase(&self, height: u32, phase: Phase) -> Option<u32> {
        self.cycle_for_height(height)?.duration_of(phase)
    }

    pub fn is_first_block_in_cycle(&self, height: u32) -> bool {
        self.cycle_for_height(height)
            .is_some_and(|c| c.height_of_first_block == height)
    }

    pub fn is_last_block_in_cycle(&self, height: u32) -> bool {
        self.cycle_for_height(height)
            .is_some_and(|c| c.height_of_last_block() == height)
    }

    /// Zero-based index of the cycle containing `height`.
    pub fn cycle_index(&self, height: u32) -> Option<usize> {
        let cycle = self.cycle_for_height(height)?;
        self.cycles
            .iter()
            .position(|c| c.height_of_first_block == cycle.height_of_first_block)
    }
}
