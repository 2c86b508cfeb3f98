//! # Scheduler lifecycle and final outcome.
//!
//! ```text
//! Idle ──► Scheduling ──► Running ──► Stopping ──► Terminated
//!   │           │                       ▲  │
//!   │           └───────────────────────┘  └──► Scheduling   (restart)
//!   └──────────────────────────────────────────► Terminated   (terminate before schedule)
//! ```

use tokio::sync::watch;

use crate::error::{LaunchError, ReloadError, StoreError};
use crate::roles::Role;

/// Lifecycle state of a [`Scheduler`](crate::Scheduler).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Built, not scheduled yet.
    Idle,
    /// Roles are waiting for prerequisites or being launched.
    Scheduling,
    /// Every locally enabled role has been launched.
    Running,
    /// The shutdown cascade is stopping roles.
    Stopping,
    /// Final state; no role is alive and none will be launched.
    Terminated,
}

impl RunState {
    /// Returns whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Scheduling)
                | (Idle, Terminated)
                | (Scheduling, Running)
                | (Scheduling, Stopping)
                | (Running, Stopping)
                | (Stopping, Scheduling)
                | (Stopping, Terminated)
        )
    }

    /// Returns a short stable label (snake_case).
    pub fn as_label(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Scheduling => "scheduling",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
            RunState::Terminated => "terminated",
        }
    }
}

/// Why the scheduler terminated.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Terminated on request (`terminate()` or OS signal).
    Stopped,
    /// A role process exited on its own.
    RoleDied {
        /// Role whose process died.
        role: Role,
    },
    /// A role process could not be launched.
    LaunchFailed(LaunchError),
    /// The shared store failed.
    StoreFailed {
        /// Role that was waiting on, or publishing to, the store.
        role: Role,
        /// Store error.
        error: StoreError,
    },
    /// A restart was requested but the configuration could not be reloaded.
    ReloadFailed(ReloadError),
}

impl Outcome {
    /// Returns true only for a requested stop.
    ///
    /// Embedding binaries map this to the process exit code.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Stopped)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Stopped => "stopped",
            Outcome::RoleDied { .. } => "role_died",
            Outcome::LaunchFailed(_) => "launch_failed",
            Outcome::StoreFailed { .. } => "store_failed",
            Outcome::ReloadFailed(_) => "reload_failed",
        }
    }
}

/// Validated state holder shared by the scheduler and its runs.
pub(crate) struct Lifecycle {
    tx: watch::Sender<RunState>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            tx: watch::channel(RunState::Idle).0,
        }
    }

    pub(crate) fn current(&self) -> RunState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<RunState> {
        self.tx.subscribe()
    }

    /// Moves to `next` if legal from the current state; returns whether it did.
    pub(crate) fn transition(&self, next: RunState) -> bool {
        self.tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Moves `expected → next` only if the current state is `expected`.
    pub(crate) fn transition_from(&self, expected: RunState, next: RunState) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == expected && expected.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}
