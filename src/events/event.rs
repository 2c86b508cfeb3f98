//! # Runtime events emitted by the scheduler and its role watchers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Run events**: session lifecycle (scheduling, running, stopping, terminated)
//! - **Role events**: per-role flow (waiting, launching, operational, died, stopped)
//! - **Restart events**: restart request and configuration reload
//! - **Subscriber events**: overflow and panics of event subscribers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, role,
//! run generation, launch mode and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use rolevisor::{Event, EventKind, Role};
//!
//! let ev = Event::new(EventKind::RoleDied)
//!     .with_role(Role::Web)
//!     .with_generation(2)
//!     .with_reason("exit status 137");
//!
//! assert_eq!(ev.kind, EventKind::RoleDied);
//! assert_eq!(ev.role, Some(Role::Web));
//! assert_eq!(ev.reason.as_deref(), Some("exit status 137"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::roles::Role;
use crate::settings::LaunchMode;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Run lifecycle ===
    /// A run is starting its roles.
    ///
    /// Sets:
    /// - `generation`: run number (1-based)
    RunScheduling,

    /// Every locally enabled role of the run has been launched.
    ///
    /// Sets:
    /// - `generation`: run number
    RunRunning,

    /// The run started its shutdown cascade.
    ///
    /// Sets:
    /// - `generation`: run number
    /// - `reason`: what triggered the cascade
    /// - `role`: role involved in the trigger, if any
    RunStopping,

    /// Every role of the run is confirmed dead.
    ///
    /// Sets:
    /// - `generation`: run number
    RunTerminated,

    /// Termination requested from outside (OS signal or `terminate()`).
    ShutdownRequested,

    /// The scheduler reached its terminal state; no run will follow.
    ///
    /// Sets:
    /// - `reason`: outcome label
    SchedulerTerminated,

    // === Role lifecycle ===
    /// Role waits for its prerequisite.
    ///
    /// Sets:
    /// - `role`: waiting role
    /// - `reason`: awaited prerequisite
    RoleWaiting,

    /// Heartbeat while waiting on the shared store (rate limited).
    ///
    /// Sets:
    /// - `role`: awaited role
    /// - `attempt`: poll count so far
    BarrierWaiting,

    /// This node acquired the web leader lock.
    ///
    /// Sets:
    /// - `role`: [`Role::Web`]
    LeaderElected,

    /// Leader lock is held elsewhere; waiting for the leader to become operational.
    ///
    /// Sets:
    /// - `role`: [`Role::Web`]
    FollowerWaiting,

    /// Role process is being launched.
    ///
    /// Sets:
    /// - `role`, `mode`, `generation`
    RoleLaunching,

    /// Role process was launched.
    ///
    /// Sets:
    /// - `role`, `mode`, `generation`
    RoleLaunched,

    /// Role process could not be launched.
    ///
    /// Sets:
    /// - `role`, `generation`
    /// - `reason`: launch error
    RoleLaunchFailed,

    /// Role reported operational for the first time in this launch.
    ///
    /// Sets:
    /// - `role`, `generation`
    RoleOperational,

    /// Role process exited on its own.
    ///
    /// Sets:
    /// - `role`, `generation`
    RoleDied,

    /// Role is asked to stop as part of the cascade.
    ///
    /// Sets:
    /// - `role`, `generation`
    RoleStopping,

    /// Role process is confirmed dead after the stop request.
    ///
    /// Sets:
    /// - `role`, `generation`
    RoleStopped,

    /// Shared store failed while a role waited on it.
    ///
    /// Sets:
    /// - `role`: role affected
    /// - `reason`: store error
    StoreFailed,

    // === Restart ===
    /// A role asked for an application-wide restart.
    ///
    /// Sets:
    /// - `role`, `generation`
    RestartRequested,

    /// Configuration reloaded; a fresh run follows.
    ReloadSucceeded,

    /// Configuration reload failed; the scheduler terminates.
    ///
    /// Sets:
    /// - `reason`: reload error
    ReloadFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Role concerned, if applicable.
    pub role: Option<Role>,
    /// Run generation (1 for the first run, +1 per restart).
    pub generation: Option<u64>,
    /// Launch mode, for launch events.
    pub mode: Option<LaunchMode>,
    /// Poll or attempt count.
    pub attempt: Option<u64>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Subscriber name, for subscriber events.
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            role: None,
            generation: None,
            mode: None,
            attempt: None,
            reason: None,
            subscriber: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a role.
    #[inline]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Attaches the run generation.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a launch mode.
    #[inline]
    pub fn with_mode(mut self, mode: LaunchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Attaches a poll/attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u64) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"));
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Returns true for subscriber overflow events.
    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}
