//! Supervised roles and the dependency graph between them.
//!
//! ## Contents
//! - [`Role`] the three supervised process kinds, in dependency order
//! - [`RoleSet`] a tiny copyable set of roles (enabled roles, operational marks)
//!
//! ## Dependency graph
//! ```text
//! Search ◄── Web ◄── TaskProcessor
//! ```
//! A role may only be launched once its prerequisite is operational, either
//! locally or (when the prerequisite is disabled on this node) anywhere in the cluster.

mod role;
mod set;

pub use role::{ParseRoleError, Role};
pub use set::RoleSet;
