//! # Resolved settings.
//!
//! [`Settings`] tells the scheduler whether the node is part of a cluster,
//! which roles run locally, and how to start each of them.
//!
//! ## Rules
//! - Outside cluster mode every role is enabled (disabling is a [`SettingsError`]).
//! - In cluster mode a disabled role is expected to run on another node; its
//!   dependents wait for it through the shared store.

use std::collections::HashMap;

use crate::error::SettingsError;
use crate::roles::{Role, RoleSet};
use crate::settings::{LaunchMode, RoleCommand};

/// Cluster identity of this node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterSettings {
    /// Name shared by all nodes of the cluster (store namespace).
    pub name: String,
    /// Unique name of this node inside the cluster.
    pub node: String,
}

/// Resolved application settings.
///
/// ## Example
/// ```rust
/// use rolevisor::{Role, RoleCommand, Settings};
///
/// let settings = Settings::cluster("prod", "app-1")
///     .disable(Role::Search)
///     .with_command(RoleCommand::new(Role::Web, "/opt/app/bin/web"))
///     .with_command(RoleCommand::new(Role::TaskProcessor, "/opt/app/bin/tasks"));
///
/// assert!(settings.validate().is_ok());
/// assert!(!settings.is_enabled(Role::Search));
/// assert!(settings.is_cluster());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    cluster: Option<ClusterSettings>,
    enabled: RoleSet,
    commands: HashMap<Role, RoleCommand>,
}

impl Settings {
    /// Single-node settings with every role enabled.
    pub fn local() -> Self {
        Self {
            cluster: None,
            enabled: RoleSet::all(),
            commands: HashMap::new(),
        }
    }

    /// Cluster-mode settings for node `node` of cluster `name`, every role enabled.
    pub fn cluster(name: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            cluster: Some(ClusterSettings {
                name: name.into(),
                node: node.into(),
            }),
            enabled: RoleSet::all(),
            commands: HashMap::new(),
        }
    }

    /// Disables `role` on this node (it runs elsewhere in the cluster).
    #[must_use]
    pub fn disable(mut self, role: Role) -> Self {
        self.enabled.remove(role);
        self
    }

    /// Registers (or replaces) the command of a role.
    #[must_use]
    pub fn with_command(mut self, command: RoleCommand) -> Self {
        self.commands.insert(command.role(), command);
        self
    }

    /// Returns true when the node is part of a cluster.
    pub fn is_cluster(&self) -> bool {
        self.cluster.is_some()
    }

    /// Cluster identity, if any.
    pub fn cluster_settings(&self) -> Option<&ClusterSettings> {
        self.cluster.as_ref()
    }

    /// Returns true if `role` runs on this node.
    pub fn is_enabled(&self, role: Role) -> bool {
        self.enabled.contains(role)
    }

    /// Roles running on this node.
    pub fn enabled_roles(&self) -> RoleSet {
        self.enabled
    }

    /// Configured command of `role`, as registered.
    pub fn command(&self, role: Role) -> Option<&RoleCommand> {
        self.commands.get(&role)
    }

    /// Command of `role` stamped with `mode`, ready to hand to a launcher.
    pub fn command_for(&self, role: Role, mode: LaunchMode) -> Option<RoleCommand> {
        self.commands
            .get(&role)
            .map(|cmd| cmd.clone().with_mode(mode))
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<(), SettingsError> {
        match &self.cluster {
            None => {
                if let Some(role) = Role::ALL.into_iter().find(|r| !self.is_enabled(*r)) {
                    return Err(SettingsError::DisabledOutsideCluster { role });
                }
            }
            Some(cluster) => {
                if cluster.name.trim().is_empty() {
                    return Err(SettingsError::MissingClusterField { field: "cluster name" });
                }
                if cluster.node.trim().is_empty() {
                    return Err(SettingsError::MissingClusterField { field: "node name" });
                }
                if self.enabled.is_empty() {
                    return Err(SettingsError::NothingEnabled);
                }
            }
        }

        for role in self.enabled.iter() {
            if let Some(cmd) = self.commands.get(&role)
                && cmd.program().as_os_str().is_empty()
            {
                return Err(SettingsError::EmptyProgram { role });
            }
        }
        Ok(())
    }
}

impl Default for Settings {
    /// Returns [`Settings::local`].
    fn default() -> Self {
        Self::local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_rejects_disabled_roles() {
        let settings = Settings::local().disable(Role::Search);
        assert_eq!(
            settings.validate(),
            Err(SettingsError::DisabledOutsideCluster { role: Role::Search })
        );
    }

    #[test]
    fn test_cluster_requires_identity_and_one_role() {
        assert_eq!(
            Settings::cluster("", "n1").validate(),
            Err(SettingsError::MissingClusterField { field: "cluster name" })
        );

        let nothing = Role::ALL
            .into_iter()
            .fold(Settings::cluster("c", "n1"), Settings::disable);
        assert_eq!(nothing.validate(), Err(SettingsError::NothingEnabled));
    }

    #[test]
    fn test_empty_program_is_rejected_only_when_enabled() {
        let settings = Settings::cluster("c", "n1")
            .with_command(RoleCommand::new(Role::Search, ""))
            .disable(Role::Search);
        assert!(settings.validate().is_ok());

        let settings = Settings::local().with_command(RoleCommand::new(Role::Web, ""));
        assert_eq!(
            settings.validate(),
            Err(SettingsError::EmptyProgram { role: Role::Web })
        );
    }

    #[test]
    fn test_command_for_stamps_mode() {
        let settings = Settings::local().with_command(RoleCommand::new(Role::Web, "web"));
        let cmd = settings.command_for(Role::Web, LaunchMode::Follower);
        assert_eq!(cmd.map(|c| c.mode()), Some(LaunchMode::Follower));
        assert!(settings.command_for(Role::Search, LaunchMode::Standalone).is_none());
    }
}
