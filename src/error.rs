//! Error types used by the rolevisor runtime and its collaborators.
//!
//! - [`RuntimeError`]: misuse of the scheduler or failures of the runtime itself.
//! - [`LaunchError`]: a role process could not be spawned.
//! - [`StoreError`]: the cluster shared store could not be reached.
//! - [`ReloadError`]: configuration could not be re-validated on restart.
//! - [`SettingsError`]: resolved settings are inconsistent.
//!
//! Each type provides `as_label()` (stable snake_case label for logs/metrics).

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::roles::Role;

/// # Errors produced by the rolevisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// `schedule()` was called on a scheduler that already left the idle state.
    #[error("scheduler already scheduled")]
    AlreadyScheduled,

    /// Settings were rejected before anything was launched.
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    /// Registering OS signal handlers failed.
    #[error("failed to listen for shutdown signals: {0}")]
    Signal(#[source] io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rolevisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::AlreadyScheduled.as_label(), "runtime_already_scheduled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyScheduled => "runtime_already_scheduled",
            RuntimeError::InvalidSettings(_) => "runtime_invalid_settings",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}

/// # Errors raised while spawning a role process.
///
/// A launch error is never fatal to the supervisor itself: the scheduler
/// captures it, unwinds the roles already started and terminates the run.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum LaunchError {
    /// The OS refused to spawn the program.
    #[error("failed to spawn {role} ({program}): {source}")]
    Spawn {
        /// Role being launched.
        role: Role,
        /// Program that was executed.
        program: String,
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },

    /// Preparing the per-role status directory failed.
    #[error("failed to prepare status directory '{path}' for {role}: {source}")]
    StatusDir {
        /// Role being launched.
        role: Role,
        /// Directory that could not be prepared.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },

    /// No command is configured for the role.
    #[error("no command configured for {role}")]
    MissingCommand {
        /// Role without command.
        role: Role,
    },

    /// The launcher declined to start the role.
    #[error("launch of {role} rejected: {reason}")]
    Rejected {
        /// Role being launched.
        role: Role,
        /// Human-readable reason.
        reason: String,
    },
}

impl LaunchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LaunchError::Spawn { .. } => "launch_spawn",
            LaunchError::StatusDir { .. } => "launch_status_dir",
            LaunchError::MissingCommand { .. } => "launch_missing_command",
            LaunchError::Rejected { .. } => "launch_rejected",
        }
    }

    /// Role the failed launch was for.
    pub fn role(&self) -> Role {
        match self {
            LaunchError::Spawn { role, .. }
            | LaunchError::StatusDir { role, .. }
            | LaunchError::MissingCommand { role }
            | LaunchError::Rejected { role, .. } => *role,
        }
    }
}

/// Errors compare by kind and role; IO sources are not comparable.
impl PartialEq for LaunchError {
    fn eq(&self, other: &Self) -> bool {
        self.as_label() == other.as_label() && self.role() == other.role()
    }
}

/// # Errors raised by the cluster shared store.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be reached at all.
    #[error("shared store unavailable: {reason}")]
    Unavailable {
        /// Human-readable reason.
        reason: String,
    },

    /// The store answered with an error for a specific key.
    #[error("shared store error on '{key}': {reason}")]
    Backend {
        /// Key of the failed operation.
        key: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Unavailable { .. } => "store_unavailable",
            StoreError::Backend { .. } => "store_backend",
        }
    }
}

/// # Errors raised by an [`AppReloader`](crate::AppReloader).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReloadError {
    /// The reloaded configuration is not valid.
    #[error("reloaded configuration is invalid: {reason}")]
    Invalid {
        /// Human-readable reason.
        reason: String,
    },

    /// The configuration could not be reloaded at all.
    #[error("configuration reload failed: {reason}")]
    Failed {
        /// Human-readable reason.
        reason: String,
    },
}

impl ReloadError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ReloadError::Invalid { .. } => "reload_invalid",
            ReloadError::Failed { .. } => "reload_failed",
        }
    }
}

/// # Inconsistent [`Settings`](crate::Settings).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Roles may only be disabled on a node that is part of a cluster.
    #[error("{role} can only be disabled in cluster mode")]
    DisabledOutsideCluster {
        /// Disabled role.
        role: Role,
    },

    /// Every role is disabled; nothing would ever run on this node.
    #[error("no role is enabled on this node")]
    NothingEnabled,

    /// Enabled role with an empty program.
    #[error("{role} has an empty program")]
    EmptyProgram {
        /// Misconfigured role.
        role: Role,
    },

    /// Cluster mode needs a cluster name and a node name.
    #[error("cluster mode requires a non-empty {field}")]
    MissingClusterField {
        /// Name of the missing field.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_error_keeps_role() {
        let err = LaunchError::Rejected {
            role: Role::TaskProcessor,
            reason: "boom".into(),
        };
        assert_eq!(err.role(), Role::TaskProcessor);
        assert_eq!(err.as_label(), "launch_rejected");
        assert_eq!(err.to_string(), "launch of task_processor rejected: boom");
    }

    #[test]
    fn test_settings_error_converts_into_runtime_error() {
        let err: RuntimeError = SettingsError::NothingEnabled.into();
        assert_eq!(err.as_label(), "runtime_invalid_settings");
    }
}
