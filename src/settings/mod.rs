//! Resolved application settings consumed by the scheduler.
//!
//! Settings are produced by the embedding application (file parsing is not
//! part of this crate) and read at `schedule()` time and again after every
//! successful reload.
//!
//! ## Contents
//! - [`Settings`] cluster mode, locally enabled roles, role commands
//! - [`ClusterSettings`] cluster identity of this node
//! - [`RoleCommand`] how to start one role, and in which [`LaunchMode`]

mod command;
mod resolved;

pub use command::{LaunchMode, RoleCommand};
pub use resolved::{ClusterSettings, Settings};
