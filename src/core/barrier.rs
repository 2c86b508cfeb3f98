//! # Startup barrier for roles running on other nodes.
//!
//! When a prerequisite role is disabled locally, its dependents wait until
//! the shared store reports it operational somewhere in the cluster. The wait
//! is unbounded: a node may join long before the rest of the cluster.
//!
//! The heartbeat of such a wait goes through [`LogarithmicLogger`]: poll `n`
//! is reported only when `floor(ln(n / ratio))` exceeds the last reported
//! level. With `ratio = 10`, polls 10, 28, 74, 201, 546… are reported.
//!
//! ```text
//! wait_for_operational(token)
//!   loop:
//!     token cancelled?            → Ok(false)
//!     is_operational(role, true)? → Ok(true)      (store error → Err)
//!     logger.log(BarrierWaiting)  (rate limited)
//!     sleep(interval)             (interrupted by token)
//! ```

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::events::{Bus, Event, EventKind};
use crate::roles::Role;
use crate::state::AppStateRef;

/// Call-count keyed rate limiter in front of the event [`Bus`].
///
/// # Example
/// ```rust
/// use rolevisor::{Bus, Event, EventKind, LogarithmicLogger};
///
/// let mut logger = LogarithmicLogger::new(Bus::new(8), 10);
/// let mut logged = Vec::new();
/// for _ in 0..100 {
///     if logger.log(Event::new(EventKind::BarrierWaiting)) {
///         logged.push(logger.calls());
///     }
/// }
/// assert_eq!(logged, vec![10, 28, 74]);
/// ```
pub struct LogarithmicLogger {
    bus: Bus,
    ratio: u64,
    calls: u64,
    last_level: i64,
}

impl LogarithmicLogger {
    /// Creates a logger publishing to `bus`; a `ratio` of 0 is treated as 1.
    pub fn new(bus: Bus, ratio: u64) -> Self {
        Self {
            bus,
            ratio: ratio.max(1),
            calls: 0,
            last_level: -1,
        }
    }

    /// Number of calls to [`LogarithmicLogger::log`] so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Counts one call and publishes `event` if the call reaches a new level.
    ///
    /// The published event carries the call count as `attempt`.
    /// Returns whether the event was published.
    pub fn log(&mut self, event: Event) -> bool {
        self.calls = self.calls.saturating_add(1);
        if self.calls < self.ratio {
            return false;
        }
        let level = (self.calls as f64 / self.ratio as f64).ln().floor() as i64;
        if level <= self.last_level {
            return false;
        }
        self.last_level = level;
        self.bus.publish(event.with_attempt(self.calls));
        true
    }
}

/// Unbounded wait for a role to become operational anywhere in the cluster.
pub struct StartupBarrier {
    state: AppStateRef,
    role: Role,
    interval: Duration,
    logger: LogarithmicLogger,
}

impl StartupBarrier {
    /// Creates a barrier waiting for `role`, polling every `interval`.
    pub fn new(state: AppStateRef, role: Role, interval: Duration, logger: LogarithmicLogger) -> Self {
        Self {
            state,
            role,
            interval,
            logger,
        }
    }

    /// Role this barrier waits for.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Polls until `role` is operational (local or remote).
    ///
    /// Returns `Ok(true)` once it is, `Ok(false)` when `token` is cancelled
    /// first, and the store error if a poll fails.
    pub async fn wait_for_operational(&mut self, token: &CancellationToken) -> Result<bool, StoreError> {
        loop {
            let ready = tokio::select! {
                _ = token.cancelled() => return Ok(false),
                ready = self.state.is_operational(self.role, true) => ready?,
            };
            if ready {
                return Ok(true);
            }

            self.logger
                .log(Event::new(EventKind::BarrierWaiting).with_role(self.role));

            tokio::select! {
                _ = token.cancelled() => return Ok(false),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::state::{AppState, ClusterAppState, LocalAppState, MemoryStore};

    fn barrier(state: AppStateRef, role: Role, bus: &Bus) -> StartupBarrier {
        StartupBarrier::new(
            state,
            role,
            Duration::from_millis(2),
            LogarithmicLogger::new(bus.clone(), 1),
        )
    }

    #[test]
    fn test_logger_growth_curve() {
        let mut logger = LogarithmicLogger::new(Bus::new(8), 10);
        let mut logged = Vec::new();
        for _ in 0..600 {
            if logger.log(Event::new(EventKind::BarrierWaiting)) {
                logged.push(logger.calls());
            }
        }
        assert_eq!(logged, vec![10, 28, 74, 201, 546]);
    }

    #[test]
    fn test_logger_ratio_one_logs_first_call() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let mut logger = LogarithmicLogger::new(bus, 0);

        assert!(logger.log(Event::new(EventKind::BarrierWaiting)));
        assert!(!logger.log(Event::new(EventKind::BarrierWaiting)));
        assert!(logger.log(Event::new(EventKind::BarrierWaiting)));

        assert_eq!(rx.try_recv().unwrap().attempt, Some(1));
        assert_eq!(rx.try_recv().unwrap().attempt, Some(3));
    }

    #[tokio::test]
    async fn test_barrier_returns_once_remote_is_operational() {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(ClusterAppState::new(store.clone(), "c", "search-node"));
        let local: AppStateRef = Arc::new(ClusterAppState::new(store, "c", "app-node"));
        let bus = Bus::new(64);

        let mut barrier = barrier(local, Role::Search, &bus);
        let token = CancellationToken::new();

        let setter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            remote.set_operational(Role::Search).await.unwrap();
        });

        let ready = tokio::time::timeout(Duration::from_secs(5), barrier.wait_for_operational(&token))
            .await
            .expect("barrier timed out");
        assert_eq!(ready, Ok(true));
        setter.await.unwrap();
    }

    #[tokio::test]
    async fn test_barrier_abandons_on_cancel() {
        let bus = Bus::new(64);
        let mut barrier = barrier(Arc::new(LocalAppState::new()), Role::Web, &bus);
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let ready = tokio::time::timeout(Duration::from_secs(5), barrier.wait_for_operational(&token))
            .await
            .expect("barrier timed out");
        assert_eq!(ready, Ok(false));
    }

    #[tokio::test]
    async fn test_barrier_surfaces_store_outage() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let bus = Bus::new(64);
        let mut barrier = barrier(
            Arc::new(ClusterAppState::new(store, "c", "n")),
            Role::Search,
            &bus,
        );

        let res = barrier.wait_for_operational(&CancellationToken::new()).await;
        assert!(matches!(res, Err(StoreError::Unavailable { .. })));
    }
}
