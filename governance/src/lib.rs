//! Governance cycles for the Tessera ledger engine.
//!
//! A cycle is a window of blocks split into ordered phases: proposal, a
//! break, blind vote, a break, vote reveal, a break, and result. Phase
//! durations are governance parameters themselves. Cycles are derived
//! incrementally as blocks arrive; a parameter change approved during one
//! cycle only shapes the cycles that start after it.

pub mod cycle;
pub mod cycle_service;
pub mod error;
pub mod params;
pub mod period;

pub use cycle::{Cycle, DaoPhase, Phase};
pub use cycle_service::{CycleService, DefaultParams};
pub use error::GovernanceError;
pub use params::{latest_change, Param, ParamChange, ParamLookup};
pub use period::PeriodService;
