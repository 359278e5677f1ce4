//! Extends the cycle list as blocks arrive.

use tracing::{debug, warn};

use tessera_types::NetworkId;

use crate::{Cycle, DaoPhase, Param, ParamLookup, Phase};

/// Derives cycles from chain height and the parameter history.
///
/// Holds no state of its own: the cycle list lives in the ledger so that it
/// is rolled back together with the blocks that produced it.
#[derive(Clone, Debug)]
pub struct CycleService {
    genesis_height: u32,
    network: NetworkId,
}

impl CycleService {
    pub fn new(genesis_height: u32, network: NetworkId) -> Self {
        Self {
            genesis_height,
            network,
        }
    }

    pub fn genesis_height(&self) -> u32 {
        self.genesis_height
    }

    /// Called once per parsed block, in height order, before the block's
    /// transactions are classified. Returns the cycle to append, if `height`
    /// starts one.
    pub fn on_new_block_height(
        &self,
        height: u32,
        cycles: &[Cycle],
        lookup: &dyn ParamLookup,
    ) -> Option<Cycle> {
        match cycles.last() {
            None if height == self.genesis_height => Some(self.first_cycle(lookup)),
            None => None,
            Some(previous) => self.maybe_create_cycle(height, previous, lookup),
        }
    }

    /// A new cycle starts exactly at the block after the previous cycle's
    /// last block.
    pub fn maybe_create_cycle(
        &self,
        height: u32,
        previous: &Cycle,
        lookup: &dyn ParamLookup,
    ) -> Option<Cycle> {
        if previous.height_of_last_block().checked_add(1) != Some(height) {
            return None;
        }
        let cycle = self.create_cycle(height, previous, lookup);
        debug!(
            height,
            duration = cycle.duration(),
            "new cycle created"
        );
        Some(cycle)
    }

    fn first_cycle(&self, lookup: &dyn ParamLookup) -> Cycle {
        let template = Phase::ORDERED.iter().map(|phase| {
            let fallback = phase
                .duration_param()
                .map_or(1, |p| p.default_value(self.network) as u32);
            DaoPhase::new(*phase, fallback)
        });
        Cycle::new(
            self.genesis_height,
            self.phases_at(self.genesis_height, template, lookup),
        )
    }

    /// Clone the previous cycle's phase list with current parameter values.
    /// Values are read at the new cycle's first block, so a change approved
    /// while `previous` was running applies here and never to `previous`.
    fn create_cycle(&self, height: u32, previous: &Cycle, lookup: &dyn ParamLookup) -> Cycle {
        Cycle::new(
            height,
            self.phases_at(height, previous.phases.iter().copied(), lookup),
        )
    }

    /// Resolve each phase of `template` at `height`, keeping the template's
    /// duration when the lookup fails or when the value would run the cycle
    /// past the last representable height.
    fn phases_at(
        &self,
        height: u32,
        template: impl Iterator<Item = DaoPhase>,
        lookup: &dyn ParamLookup,
    ) -> Vec<DaoPhase> {
        let capacity = u64::from(u32::MAX - height) + 1;
        let mut total = 0u64;
        template
            .map(|p| {
                let mut duration = self.duration_at(p.phase, height, p.duration, lookup);
                if total + u64::from(duration) > capacity {
                    warn!(
                        phase = ?p.phase,
                        height,
                        duration,
                        fallback = p.duration,
                        "phase duration overflows block height, using previous phase duration"
                    );
                    duration = p.duration;
                }
                total += u64::from(duration);
                DaoPhase::new(p.phase, duration)
            })
            .collect()
    }

    fn duration_at(&self, phase: Phase, height: u32, fallback: u32, lookup: &dyn ParamLookup) -> u32 {
        let Some(param) = phase.duration_param() else {
            return fallback;
        };
        match lookup.param_value_as_block_count(param, height) {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!(%param, height, fallback, error = %e, "using previous phase duration");
                fallback
            }
        }
    }
}

/// Lookup that only knows the network defaults. Useful before any change
/// has been approved, and in tests.
#[derive(Clone, Copy, Debug)]
pub struct DefaultParams(pub NetworkId);

impl ParamLookup for DefaultParams {
    fn param_value(&self, param: Param, _height: u32) -> Result<u64, crate::GovernanceError> {
        Ok(param.default_value(self.0))
    }
}
