//! # Application state contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::roles::Role;

/// Process-wide or cluster-wide state shared by the role watchers.
///
/// ### Rules
/// - `operational[role]` is set at most once per launch and cleared only after
///   the role's process has been stopped.
/// - The web leader lock is held by at most one node; the holder releases it
///   when its web process terminates.
/// - Store failures are returned, never mapped to "not operational".
#[async_trait]
pub trait AppState: Send + Sync + 'static {
    /// Marks `role` operational on this node (idempotent).
    async fn set_operational(&self, role: Role) -> Result<(), StoreError>;

    /// Returns whether `role` is operational.
    ///
    /// With `include_remote`, a cluster implementation also reports roles
    /// operational on other nodes.
    async fn is_operational(&self, role: Role, include_remote: bool) -> Result<bool, StoreError>;

    /// Attempts to acquire the web leader lock without blocking.
    ///
    /// Returns true only for the caller that acquired it.
    async fn try_lock_web_leader(&self) -> Result<bool, StoreError>;

    /// Clears this node's operational flag of `role`.
    async fn clear_operational(&self, role: Role) -> Result<(), StoreError>;

    /// Releases the web leader lock if this node holds it.
    async fn release_web_leader(&self) -> Result<(), StoreError>;
}

/// Shared handle to an [`AppState`] implementation.
pub type AppStateRef = Arc<dyn AppState>;
