//! # Handle to one spawned role process.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::roles::Role;

/// Handle to one OS process running a [`Role`].
///
/// The scheduler polls the probes every watch interval, so they must not
/// block the runtime. Stop requests are idempotent: calling either on a dead
/// process does nothing.
#[async_trait]
pub trait ProcessHandle: Send + Sync + 'static {
    /// Role this process runs.
    fn role(&self) -> Role;

    /// Returns true while the process has not exited.
    fn is_alive(&self) -> bool;

    /// Returns true once the process declared itself ready to serve.
    async fn is_operational(&self) -> bool;

    /// Returns true if the process asks for an application-wide restart.
    async fn asked_for_restart(&self) -> bool;

    /// Clears the restart request so it is only handled once.
    async fn acknowledge_ask_for_restart(&self);

    /// Requests a graceful stop. Escalation to a kill on timeout belongs to the launcher.
    async fn ask_for_stop(&self);

    /// Kills the process immediately.
    fn destroy_forcibly(&self);

    /// Waits until the process is dead, at most `timeout` when given.
    ///
    /// Returns true if the process is dead when this returns.
    async fn wait_for(&self, timeout: Option<Duration>) -> bool;
}

/// Shared handle to a role process.
pub type ProcessRef = Arc<dyn ProcessHandle>;
