//! # Role identifiers.
//!
//! [`Role`] enumerates the supervised processes. The set is closed and
//! statically known; its declaration order is the launch order.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One of the supervised process kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Search engine. Has no prerequisite.
    Search,
    /// Web-serving process. Requires [`Role::Search`] and a leadership decision.
    Web,
    /// Background task processing. Requires [`Role::Web`].
    TaskProcessor,
}

impl Role {
    /// All roles, in dependency (launch) order.
    pub const ALL: [Role; 3] = [Role::Search, Role::Web, Role::TaskProcessor];

    /// Returns the role that must be operational before `self` may be launched.
    ///
    /// ```
    /// use rolevisor::Role;
    ///
    /// assert_eq!(Role::Search.prerequisite(), None);
    /// assert_eq!(Role::Web.prerequisite(), Some(Role::Search));
    /// assert_eq!(Role::TaskProcessor.prerequisite(), Some(Role::Web));
    /// ```
    pub const fn prerequisite(self) -> Option<Role> {
        match self {
            Role::Search => None,
            Role::Web => Some(Role::Search),
            Role::TaskProcessor => Some(Role::Web),
        }
    }

    /// Stable snake_case key (logs, store keys, status directories).
    pub const fn key(self) -> &'static str {
        match self {
            Role::Search => "search",
            Role::Web => "web",
            Role::TaskProcessor => "task_processor",
        }
    }

    /// Position of the role in [`Role::ALL`].
    pub(crate) const fn index(self) -> usize {
        match self {
            Role::Search => 0,
            Role::Web => 1,
            Role::TaskProcessor => 2,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Returned when a string does not name a [`Role`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role {0:?}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search" => Ok(Role::Search),
            "web" => Ok(Role::Web),
            "task_processor" => Ok(Role::TaskProcessor),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_dependency_ordered() {
        for (i, role) in Role::ALL.iter().enumerate() {
            assert_eq!(role.index(), i);
            if let Some(pre) = role.prerequisite() {
                assert!(pre.index() < role.index(), "{pre} must come before {role}");
            }
        }
    }

    #[test]
    fn test_key_parses_back() {
        for role in Role::ALL {
            assert_eq!(role.key().parse::<Role>(), Ok(role));
        }
        assert_eq!(
            "elastic".parse::<Role>(),
            Err(ParseRoleError("elastic".into()))
        );
    }
}
