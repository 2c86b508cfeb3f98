//! # Cluster-wide application state.
//!
//! [`ClusterAppState`] mirrors this node's operational flags into a
//! [`SharedStore`] and reads other nodes' flags from it. The web leader lock
//! is a set-if-absent entry holding the node name; the node already named
//! by the entry holds it again.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::roles::{Role, RoleSet};
use crate::settings::ClusterSettings;
use crate::state::{AppState, SharedStore};

/// Cluster [`AppState`] backed by a [`SharedStore`].
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use rolevisor::{AppState, ClusterAppState, MemoryStore, Role};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), rolevisor::StoreError> {
/// let store = Arc::new(MemoryStore::new());
/// let search_node = ClusterAppState::new(store.clone(), "prod", "search-1");
/// let app_node = ClusterAppState::new(store, "prod", "app-1");
///
/// search_node.set_operational(Role::Search).await?;
/// assert!(app_node.is_operational(Role::Search, true).await?);
/// assert!(!app_node.is_operational(Role::Search, false).await?);
/// # Ok(())
/// # }
/// ```
pub struct ClusterAppState {
    store: Arc<dyn SharedStore>,
    cluster: String,
    node: String,
    local: RwLock<RoleSet>,
}

impl ClusterAppState {
    /// Creates the state of node `node` in cluster `cluster`.
    pub fn new(
        store: Arc<dyn SharedStore>,
        cluster: impl Into<String>,
        node: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cluster: cluster.into(),
            node: node.into(),
            local: RwLock::new(RoleSet::empty()),
        }
    }

    /// Creates the state from resolved cluster settings.
    pub fn from_settings(store: Arc<dyn SharedStore>, cluster: &ClusterSettings) -> Self {
        Self::new(store, cluster.name.clone(), cluster.node.clone())
    }

    /// Name of this node.
    pub fn node(&self) -> &str {
        &self.node
    }

    fn operational_prefix(&self, role: Role) -> String {
        format!("{}/operational/{}/", self.cluster, role.key())
    }

    fn operational_key(&self, role: Role) -> String {
        format!("{}{}", self.operational_prefix(role), self.node)
    }

    fn leader_key(&self) -> String {
        format!("{}/leader/web", self.cluster)
    }
}

#[async_trait]
impl AppState for ClusterAppState {
    async fn set_operational(&self, role: Role) -> Result<(), StoreError> {
        self.store.set_flag(&self.operational_key(role)).await?;
        self.local.write().await.insert(role);
        Ok(())
    }

    async fn is_operational(&self, role: Role, include_remote: bool) -> Result<bool, StoreError> {
        if self.local.read().await.contains(role) {
            return Ok(true);
        }
        if !include_remote {
            return Ok(false);
        }
        let nodes = self.store.scan_flags(&self.operational_prefix(role)).await?;
        Ok(!nodes.is_empty())
    }

    async fn try_lock_web_leader(&self) -> Result<bool, StoreError> {
        let holder = self.store.put_if_absent(&self.leader_key(), &self.node).await?;
        Ok(holder.is_none_or(|current| current == self.node))
    }

    async fn clear_operational(&self, role: Role) -> Result<(), StoreError> {
        self.local.write().await.remove(role);
        self.store.remove_flag(&self.operational_key(role)).await
    }

    async fn release_web_leader(&self) -> Result<(), StoreError> {
        self.store
            .remove_if_equals(&self.leader_key(), &self.node)
            .await
            .map(|_| ())
    }
}
