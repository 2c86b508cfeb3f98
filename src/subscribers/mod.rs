//! # Event subscribers for the rolevisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Watcher ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet::emit
//!                                                                     │
//!                                                      ┌──────────────┼──────────┐
//!                                                      ▼              ▼          ▼
//!                                                  LogWriter       Metrics    Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use rolevisor::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct CrashCounter;
//!
//! #[async_trait]
//! impl Subscribe for CrashCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::RoleDied {
//!             // increment crash counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "crash-counter" }
//! }
//! ```

mod log;
mod subscriber;
mod subscriber_set;

pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
