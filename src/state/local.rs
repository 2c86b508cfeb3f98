//! # In-process application state.
//!
//! [`LocalAppState`] keeps flags in memory. Remote flags do not exist on a
//! single node, so `include_remote` is ignored.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::roles::{Role, RoleSet};
use crate::state::AppState;

#[derive(Default)]
struct Flags {
    operational: RoleSet,
    web_leader_locked: bool,
}

/// Single-node [`AppState`].
///
/// # Example
/// ```rust
/// use rolevisor::{AppState, LocalAppState, Role};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), rolevisor::StoreError> {
/// let state = LocalAppState::new();
/// assert!(state.try_lock_web_leader().await?);
/// assert!(!state.try_lock_web_leader().await?);
///
/// state.set_operational(Role::Search).await?;
/// assert!(state.is_operational(Role::Search, false).await?);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct LocalAppState {
    flags: RwLock<Flags>,
}

impl LocalAppState {
    /// Creates state with every flag cleared and the leader lock free.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every flag and frees the leader lock.
    ///
    /// Meant for test harnesses sharing one state across scenarios; the
    /// scheduler never calls it.
    pub async fn reset(&self) {
        *self.flags.write().await = Flags::default();
    }
}

#[async_trait]
impl AppState for LocalAppState {
    async fn set_operational(&self, role: Role) -> Result<(), StoreError> {
        self.flags.write().await.operational.insert(role);
        Ok(())
    }

    async fn is_operational(&self, role: Role, _include_remote: bool) -> Result<bool, StoreError> {
        Ok(self.flags.read().await.operational.contains(role))
    }

    async fn try_lock_web_leader(&self) -> Result<bool, StoreError> {
        let mut flags = self.flags.write().await;
        if flags.web_leader_locked {
            return Ok(false);
        }
        flags.web_leader_locked = true;
        Ok(true)
    }

    async fn clear_operational(&self, role: Role) -> Result<(), StoreError> {
        self.flags.write().await.operational.remove(role);
        Ok(())
    }

    async fn release_web_leader(&self) -> Result<(), StoreError> {
        self.flags.write().await.web_leader_locked = false;
        Ok(())
    }
}
