//! # Process launcher trait.

use async_trait::async_trait;

use crate::error::LaunchError;
use crate::process::ProcessRef;
use crate::settings::RoleCommand;

/// Spawns role processes.
///
/// # Example
/// ```no_run
/// use async_trait::async_trait;
/// use rolevisor::{LaunchError, Launcher, ProcessRef, RoleCommand};
///
/// struct Refusing;
///
/// #[async_trait]
/// impl Launcher for Refusing {
///     async fn launch(&self, command: &RoleCommand) -> Result<ProcessRef, LaunchError> {
///         Err(LaunchError::Rejected { role: command.role(), reason: "maintenance".into() })
///     }
/// }
/// ```
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    /// Spawns the process described by `command`.
    ///
    /// The returned handle must already be alive (or dead, if the process
    /// crashed immediately); the scheduler starts polling it right away.
    async fn launch(&self, command: &RoleCommand) -> Result<ProcessRef, LaunchError>;
}
