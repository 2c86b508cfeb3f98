//! # Role command definitions.
//!
//! A [`RoleCommand`] describes the program the launcher starts for a role.
//! The scheduler stamps the [`LaunchMode`] onto a copy of the configured
//! command right before launching.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::roles::Role;

/// How a role process is started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LaunchMode {
    /// Roles without a leadership decision (search, task processor).
    #[default]
    Standalone,
    /// Web process holding the leader lock; performs first-time initialization.
    Leader,
    /// Web process started after the leader elsewhere became operational.
    Follower,
}

impl LaunchMode {
    /// Stable lowercase key, exported to children.
    pub const fn key(self) -> &'static str {
        match self {
            LaunchMode::Standalone => "standalone",
            LaunchMode::Leader => "leader",
            LaunchMode::Follower => "follower",
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Program, arguments and environment used to start one role.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use rolevisor::{LaunchMode, Role, RoleCommand};
///
/// let cmd = RoleCommand::new(Role::Web, "/opt/app/bin/web")
///     .arg("--port=9000")
///     .env("JAVA_OPTS", "-Xmx512m")
///     .stop_timeout(Duration::from_secs(30));
///
/// assert_eq!(cmd.role(), Role::Web);
/// assert_eq!(cmd.mode(), LaunchMode::Standalone);
/// assert_eq!(cmd.with_mode(LaunchMode::Leader).mode(), LaunchMode::Leader);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleCommand {
    role: Role,
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    working_dir: Option<PathBuf>,
    stop_timeout: Duration,
    mode: LaunchMode,
}

impl RoleCommand {
    /// Default time a process gets to exit after a graceful stop request.
    pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(60);

    /// Creates a command running `program` for `role`.
    pub fn new(role: Role, program: impl Into<PathBuf>) -> Self {
        Self {
            role,
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            stop_timeout: Self::DEFAULT_STOP_TIMEOUT,
            mode: LaunchMode::Standalone,
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets the working directory of the child.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets how long the launcher waits after a graceful stop request before killing.
    #[must_use]
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Returns a copy stamped with `mode`.
    #[must_use]
    pub fn with_mode(mut self, mode: LaunchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Role this command starts.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Program to execute.
    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    /// Program arguments.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Extra environment variables.
    pub fn envs(&self) -> &[(String, String)] {
        &self.env
    }

    /// Working directory, if set.
    pub fn working_dir(&self) -> Option<&std::path::Path> {
        self.working_dir.as_deref()
    }

    /// Grace period granted after a graceful stop request.
    pub fn graceful_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Launch mode stamped by the scheduler.
    pub fn mode(&self) -> LaunchMode {
        self.mode
    }
}
