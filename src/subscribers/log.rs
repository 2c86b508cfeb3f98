//! # LogWriter - events as `tracing` records
//!
//! A subscriber that renders incoming [`Event`]s as structured `tracing`
//! records under the `rolevisor::events` target. The embedding binary decides
//! where they go by installing a `tracing` subscriber.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO rolevisor::events: role launched role=search mode=standalone generation=1
//! INFO rolevisor::events: role operational role=search generation=1
//! WARN rolevisor::events: role died role=web generation=1
//! INFO rolevisor::events: run stopping generation=1 reason="web died"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const EVENTS_TARGET: &str = "rolevisor::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let role = e.role.map(|r| r.key()).unwrap_or("-");
        let generation = e.generation.unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::RunScheduling => {
                info!(target: EVENTS_TARGET, generation, "run scheduling");
            }
            EventKind::RunRunning => {
                info!(target: EVENTS_TARGET, generation, "all roles launched");
            }
            EventKind::RunStopping => {
                info!(target: EVENTS_TARGET, generation, role, reason, "run stopping");
            }
            EventKind::RunTerminated => {
                info!(target: EVENTS_TARGET, generation, "run terminated");
            }
            EventKind::ShutdownRequested => {
                info!(target: EVENTS_TARGET, "shutdown requested");
            }
            EventKind::SchedulerTerminated => {
                info!(target: EVENTS_TARGET, outcome = reason, "scheduler terminated");
            }
            EventKind::RoleWaiting => {
                debug!(target: EVENTS_TARGET, role, prerequisite = reason, "waiting for prerequisite");
            }
            EventKind::BarrierWaiting => {
                info!(
                    target: EVENTS_TARGET,
                    role,
                    polls = e.attempt.unwrap_or_default(),
                    "waiting for {role} to be operational in the cluster"
                );
            }
            EventKind::LeaderElected => {
                info!(target: EVENTS_TARGET, role, "web leader lock acquired");
            }
            EventKind::FollowerWaiting => {
                info!(target: EVENTS_TARGET, role, "waiting for web leader to be operational");
            }
            EventKind::RoleLaunching => {
                debug!(target: EVENTS_TARGET, role, mode = ?e.mode, generation, "launching role");
            }
            EventKind::RoleLaunched => {
                info!(
                    target: EVENTS_TARGET,
                    role,
                    mode = e.mode.map(|m| m.key()).unwrap_or("-"),
                    generation,
                    "role launched"
                );
            }
            EventKind::RoleLaunchFailed => {
                error!(target: EVENTS_TARGET, role, generation, reason, "role launch failed");
            }
            EventKind::RoleOperational => {
                info!(target: EVENTS_TARGET, role, generation, "role operational");
            }
            EventKind::RoleDied => {
                warn!(target: EVENTS_TARGET, role, generation, "role died");
            }
            EventKind::RoleStopping => {
                info!(target: EVENTS_TARGET, role, generation, "stopping role");
            }
            EventKind::RoleStopped => {
                info!(target: EVENTS_TARGET, role, generation, "role stopped");
            }
            EventKind::StoreFailed => {
                error!(target: EVENTS_TARGET, role, reason, "shared store failure");
            }
            EventKind::RestartRequested => {
                info!(target: EVENTS_TARGET, role, generation, "restart requested");
            }
            EventKind::ReloadSucceeded => {
                info!(target: EVENTS_TARGET, "configuration reloaded");
            }
            EventKind::ReloadFailed => {
                error!(target: EVENTS_TARGET, reason, "configuration reload failed; not restarting");
            }
            EventKind::SubscriberOverflow => {
                warn!(
                    target: EVENTS_TARGET,
                    subscriber = e.subscriber.unwrap_or("unknown"),
                    reason,
                    "subscriber overflow"
                );
            }
            EventKind::SubscriberPanicked => {
                error!(
                    target: EVENTS_TARGET,
                    subscriber = e.subscriber.unwrap_or("unknown"),
                    info = reason,
                    "subscriber panicked"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
