//! # Global runtime configuration.
//!
//! Provides [`Config`], the knobs of the scheduler runtime itself. What to
//! run lives in [`Settings`](crate::Settings); how the runtime paces its
//! polls and sizes its channels lives here.
//!
//! ## Sentinel values
//! - `watch_interval = 0s` → clamped to 1ms (a zero interval would spin)
//! - `barrier_poll = 0s` → clamped to 1ms
//! - `barrier_log_ratio = 0` → treated as 1
//! - `bus_capacity = 0` → treated as 1

use std::time::Duration;

/// Global configuration for the scheduler runtime.
///
/// ## Field semantics
/// - `watch_interval`: pause between two probes of a launched role
/// - `barrier_poll`: pause between two shared-store polls (remote prerequisite, web follower)
/// - `barrier_log_ratio`: call ratio of the logarithmic waiting heartbeat
/// - `bus_capacity`: event bus ring buffer size
///
/// ## Notes
/// All fields are public. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Pause between two probes (operational / restart / alive) of a launched role.
    ///
    /// Bounds both the start delay of a dependent role and crash detection.
    pub watch_interval: Duration,

    /// Fixed pause between two polls while waiting on the shared store.
    pub barrier_poll: Duration,

    /// Poll `n` of a wait is reported only when `floor(ln(n / ratio))` grows.
    pub barrier_log_ratio: u64,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the watch interval clamped to a minimum of 1ms.
    #[inline]
    pub fn watch_interval_clamped(&self) -> Duration {
        self.watch_interval.max(Duration::from_millis(1))
    }

    /// Returns the barrier poll interval clamped to a minimum of 1ms.
    #[inline]
    pub fn barrier_poll_clamped(&self) -> Duration {
        self.barrier_poll.max(Duration::from_millis(1))
    }

    /// Returns the barrier log ratio clamped to a minimum of 1.
    #[inline]
    pub fn barrier_log_ratio_clamped(&self) -> u64 {
        self.barrier_log_ratio.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `watch_interval = 50ms`
    /// - `barrier_poll = 200ms`
    /// - `barrier_log_ratio = 10`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            watch_interval: Duration::from_millis(50),
            barrier_poll: Duration::from_millis(200),
            barrier_log_ratio: 10,
            bus_capacity: 1024,
        }
    }
}
