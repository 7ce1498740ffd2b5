//! Wall-clock source for time budgets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Milliseconds since an arbitrary, fixed origin.
#[derive(Clone, Debug)]
pub enum HostClock {
    /// Real time, measured from when the clock was created.
    System(Instant),
    /// Time that only moves when the host says so.
    Manual(ManualClock),
}

impl HostClock {
    pub fn system() -> Self {
        HostClock::System(Instant::now())
    }

    pub fn now_ms(&self) -> u64 {
        match self {
            HostClock::System(origin) => {
                u64::try_from(origin.elapsed().as_millis()).unwrap_or(u64::MAX)
            }
            HostClock::Manual(clock) => clock.now_ms(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        HostClock::system()
    }
}

/// Host-driven clock, shareable with the code that advances it.
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::Relaxed);
    }
}
