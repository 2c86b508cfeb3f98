//! Boundary to OS process spawning.
//!
//! The scheduler only depends on the two traits of this module, so it can be
//! driven by an in-memory fake in tests.
//!
//! ## Contents
//! - [`ProcessHandle`] / [`ProcessRef`] one spawned process of a role
//! - [`Launcher`] spawns a process for a [`RoleCommand`](crate::RoleCommand)
//! - [`CommandLauncher`] real launcher on top of `tokio::process`
//!
//! ## Signals exchanged with a process
//! ```text
//!   process ──► operational   (polled by the scheduler)
//!   process ──► ask restart   (polled, acknowledged by the scheduler)
//!   scheduler ──► ask stop    (graceful; the launcher escalates to kill on timeout)
//! ```

mod command;
mod handle;
mod launcher;

pub use command::{CommandHandle, CommandLauncher, ENV_LAUNCH_MODE, ENV_ROLE, ENV_STATUS_DIR};
pub use handle::{ProcessHandle, ProcessRef};
pub use launcher::Launcher;
