//! Nullable infrastructure for deterministic testing.
//!
//! Everything a node talks to (its chain backend, its peers, the clock it
//! waits on) sits behind a trait in `tessera-node`. This crate provides
//! implementations that:
//! - return scripted, reproducible blocks
//! - can be steered programmatically (forks, outages)
//! - never touch the network or wait in real time

pub mod chain;
pub mod clock;
pub mod peer;

pub use chain::{NullBlockSource, NullChain};
pub use clock::NullClock;
pub use peer::NullPeer;
