//! # Launcher backed by real OS processes.
//!
//! [`CommandLauncher`] spawns the configured program with `tokio::process`
//! and exchanges lifecycle signals with it through marker files in a per-role
//! status directory:
//!
//! ```text
//! <status_root>/<role>/
//!   operational   created by the child once it is ready to serve
//!   restart       created by the child to ask for an application-wide restart
//!   stop          created by the supervisor to ask for a graceful stop
//! ```
//!
//! The child learns where to look from its environment:
//! `ROLEVISOR_ROLE`, `ROLEVISOR_STATUS_DIR`, `ROLEVISOR_LAUNCH_MODE`.
//!
//! ## Rules
//! - Stale markers are removed before every spawn.
//! - A monitor task owns the `Child`; its exit is published on a `watch` channel.
//! - After `ask_for_stop`, a child still alive when its stop timeout elapses is killed.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::LaunchError;
use crate::process::{Launcher, ProcessHandle, ProcessRef};
use crate::roles::Role;
use crate::settings::RoleCommand;

const PROCESS_TARGET: &str = "rolevisor::process";

/// Environment variable naming the role of the child.
pub const ENV_ROLE: &str = "ROLEVISOR_ROLE";
/// Environment variable pointing at the child's status directory.
pub const ENV_STATUS_DIR: &str = "ROLEVISOR_STATUS_DIR";
/// Environment variable carrying the launch mode (`standalone`, `leader`, `follower`).
pub const ENV_LAUNCH_MODE: &str = "ROLEVISOR_LAUNCH_MODE";

const OPERATIONAL_MARKER: &str = "operational";
const RESTART_MARKER: &str = "restart";
const STOP_MARKER: &str = "stop";

/// Spawns role processes from their [`RoleCommand`].
#[derive(Clone, Debug)]
pub struct CommandLauncher {
    status_root: PathBuf,
}

impl CommandLauncher {
    /// Creates a launcher keeping status directories under `status_root`.
    pub fn new(status_root: impl Into<PathBuf>) -> Self {
        Self {
            status_root: status_root.into(),
        }
    }

    /// Status directory of `role`.
    pub fn status_dir(&self, role: Role) -> PathBuf {
        self.status_root.join(role.key())
    }
}

#[async_trait]
impl Launcher for CommandLauncher {
    async fn launch(&self, command: &RoleCommand) -> Result<ProcessRef, LaunchError> {
        let role = command.role();
        if command.program().as_os_str().is_empty() {
            return Err(LaunchError::MissingCommand { role });
        }

        let dir = self.status_dir(role);
        prepare_status_dir(&dir)
            .await
            .map_err(|source| LaunchError::StatusDir {
                role,
                path: dir.clone(),
                source: Arc::new(source),
            })?;

        let mut cmd = Command::new(command.program());
        cmd.args(command.arguments())
            .envs(command.envs().iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env(ENV_ROLE, role.key())
            .env(ENV_STATUS_DIR, &dir)
            .env(ENV_LAUNCH_MODE, command.mode().key())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(wd) = command.working_dir() {
            cmd.current_dir(wd);
        }

        let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            role,
            program: command.program().display().to_string(),
            source: Arc::new(source),
        })?;

        debug!(
            target: PROCESS_TARGET,
            role = role.key(),
            pid = child.id(),
            mode = command.mode().key(),
            program = %command.program().display(),
            "spawned role process"
        );
        Ok(Arc::new(CommandHandle::start(
            role,
            child,
            dir,
            command.graceful_timeout(),
        )))
    }
}

/// Creates the status directory and removes markers left by a previous process.
async fn prepare_status_dir(dir: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    for marker in [OPERATIONAL_MARKER, RESTART_MARKER, STOP_MARKER] {
        match tokio::fs::remove_file(dir.join(marker)).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// [`ProcessHandle`] of a process spawned by [`CommandLauncher`].
pub struct CommandHandle {
    role: Role,
    pid: Option<u32>,
    status_dir: PathBuf,
    stop_timeout: Duration,
    exit: watch::Receiver<Option<ExitStatus>>,
    kill: CancellationToken,
    stop_requested: AtomicBool,
}

impl CommandHandle {
    /// Takes ownership of `child` and starts its monitor task.
    fn start(role: Role, child: Child, status_dir: PathBuf, stop_timeout: Duration) -> Self {
        let pid = child.id();
        let (tx, rx) = watch::channel(None);
        let kill = CancellationToken::new();
        tokio::spawn(monitor(role, child, tx, kill.clone()));

        Self {
            role,
            pid,
            status_dir,
            stop_timeout,
            exit: rx,
            kill,
            stop_requested: AtomicBool::new(false),
        }
    }

    /// OS process id, if the process was still running when spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Exit status once the process is dead.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.exit.borrow()
    }

    fn marker(&self, name: &str) -> PathBuf {
        self.status_dir.join(name)
    }

    /// Kills the process unless it exits within the stop timeout.
    fn escalate_after_timeout(&self) {
        let mut exit = self.exit.clone();
        let kill = self.kill.clone();
        let timeout = self.stop_timeout;
        let role = self.role;

        tokio::spawn(async move {
            let dead = exit.wait_for(|s| s.is_some());
            if tokio::time::timeout(timeout, dead).await.is_err() {
                warn!(
                    target: PROCESS_TARGET,
                    role = role.key(),
                    ?timeout,
                    "process did not stop in time; killing"
                );
                kill.cancel();
            }
        });
    }
}

/// Unreadable status directories count as "no marker".
async fn marker_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Owns the child until it exits; publishes the exit status.
async fn monitor(
    role: Role,
    mut child: Child,
    tx: watch::Sender<Option<ExitStatus>>,
    kill: CancellationToken,
) {
    let res = tokio::select! {
        res = child.wait() => res,
        _ = kill.cancelled() => {
            if let Err(e) = child.start_kill() {
                debug!(target: PROCESS_TARGET, role = role.key(), error = %e, "kill failed");
            }
            child.wait().await
        }
    };
    let status = res.unwrap_or_else(|e| {
        warn!(target: PROCESS_TARGET, role = role.key(), error = %e, "failed to reap process");
        ExitStatus::default()
    });
    debug!(target: PROCESS_TARGET, role = role.key(), %status, "process exited");
    let _ = tx.send(Some(status));
}

#[async_trait]
impl ProcessHandle for CommandHandle {
    fn role(&self) -> Role {
        self.role
    }

    fn is_alive(&self) -> bool {
        self.exit.borrow().is_none()
    }

    async fn is_operational(&self) -> bool {
        marker_exists(&self.marker(OPERATIONAL_MARKER)).await
    }

    async fn asked_for_restart(&self) -> bool {
        marker_exists(&self.marker(RESTART_MARKER)).await
    }

    async fn acknowledge_ask_for_restart(&self) {
        if let Err(e) = tokio::fs::remove_file(self.marker(RESTART_MARKER)).await
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(target: PROCESS_TARGET, role = self.role.key(), error = %e, "failed to clear restart marker");
        }
    }

    async fn ask_for_stop(&self) {
        if !self.is_alive() || self.stop_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = tokio::fs::write(self.marker(STOP_MARKER), b"").await {
            warn!(
                target: PROCESS_TARGET,
                role = self.role.key(),
                error = %e,
                "failed to write stop marker; killing"
            );
            self.kill.cancel();
            return;
        }
        self.escalate_after_timeout();
    }

    fn destroy_forcibly(&self) {
        self.kill.cancel();
    }

    async fn wait_for(&self, timeout: Option<Duration>) -> bool {
        let mut exit = self.exit.clone();
        let dead = exit.wait_for(|s| s.is_some());
        match timeout {
            Some(t) => {
                let _ = tokio::time::timeout(t, dead).await;
            }
            None => {
                let _ = dead.await;
            }
        }
        !self.is_alive()
    }
}
