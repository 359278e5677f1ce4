//! Nullable clock: retry delays pass instantly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tessera_node::Sleeper;

#[derive(Default)]
struct ClockState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

/// A manual clock for the node worker.
///
/// Every requested sleep returns at once and advances the clock by its
/// duration. Clones share the same time line, so a test keeps one clone and
/// inspects the delays the worker asked for.
#[derive(Clone, Default)]
pub struct NullClock {
    state: Arc<Mutex<ClockState>>,
}

impl NullClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time slept so far.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().unwrap().elapsed
    }

    /// Every delay requested, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().sleeps.clone()
    }

    /// Move time forward without a sleep.
    pub fn advance(&self, by: Duration) {
        self.state.lock().unwrap().elapsed += by;
    }
}

impl Sleeper for NullClock {
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        {
            let mut state = self.state.lock().unwrap();
            state.elapsed += duration;
            state.sleeps.push(duration);
        }
        std::future::ready(())
    }
}
