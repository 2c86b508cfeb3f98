//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the scheduler, its per-role
//! watchers, the startup barrier and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Scheduler` (run lifecycle, reload), role watchers
//!   (launch, operational, death, restart request), `StartupBarrier`
//!   (rate-limited waiting heartbeat), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the scheduler's subscriber listener, which fans out to the
//!   [`SubscriberSet`](crate::SubscriberSet).
//!
//! See `core/mod.rs` for the system-level wiring diagram.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
