//! # Observers of the scheduler's event stream.
//!
//! A [`Subscribe`] implementation sees every [`Event`] the scheduler and its
//! runs publish: role launches and deaths, leader election, barrier
//! heartbeats, stops in cascade order, reloads and the final outcome.
//! [`LogWriter`](crate::LogWriter) turns them into `tracing` records; a metrics
//! exporter or an alerting hook plugs in the same way.
//!
//! Delivery is handled by [`SubscriberSet`](crate::SubscriberSet): one queue and
//! one worker per subscriber, so a stuck exporter can delay its own view of a
//! cascade but never the cascade itself. Lost events surface on the bus as
//! `SubscriberOverflow`, caught panics as `SubscriberPanicked`.

use async_trait::async_trait;

use crate::events::Event;

/// Receiver of scheduler events.
///
/// # Example
/// ```rust
/// use async_trait::async_trait;
/// use rolevisor::{Event, EventKind, Subscribe};
///
/// /// Counts role deaths.
/// #[derive(Default)]
/// struct DeathCounter(std::sync::atomic::AtomicUsize);
///
/// #[async_trait]
/// impl Subscribe for DeathCounter {
///     async fn on_event(&self, event: &Event) {
///         if event.kind == EventKind::RoleDied {
///             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
///         }
///     }
///
///     fn name(&self) -> &'static str {
///         "death_counter"
///     }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event, in publication order for this subscriber.
    ///
    /// Runs on the subscriber's worker task; it must not block the executor.
    async fn on_event(&self, event: &Event);

    /// Label carried by the overflow and panic events of this subscriber.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered for this subscriber before new ones are dropped (min 1).
    ///
    /// A restart produces a few dozen events; the default leaves ample room.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
