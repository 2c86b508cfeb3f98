//! Shared application state: operational flags and the web leader lock.
//!
//! The scheduler reaches this state only through the [`AppState`] trait, so
//! the single-node and cluster implementations are interchangeable.
//!
//! ## Contents
//! - [`AppState`] narrow contract used by the scheduler
//! - [`LocalAppState`] in-process flags (single node, tests)
//! - [`ClusterAppState`] flags and lock propagated through a [`SharedStore`]
//! - [`SharedStore`] capability of a distributed key-value store with lock primitives
//! - [`MemoryStore`] in-process [`SharedStore`] (several nodes in one process, tests)
//!
//! ## Store layout
//! ```text
//! <cluster>/operational/<role>/<node>   flag   role is operational on node
//! <cluster>/leader/web                  value  node holding the web leader lock
//! ```

mod app_state;
mod cluster;
mod local;
mod store;

pub use app_state::{AppState, AppStateRef};
pub use cluster::ClusterAppState;
pub use local::LocalAppState;
pub use store::{MemoryStore, SharedStore};
