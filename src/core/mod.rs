//! Runtime core: orchestration and lifecycle.
//!
//! The public API of this module is [`Scheduler`] (built with
//! [`SchedulerBuilder`]), its [`Config`], the [`AppReloader`] collaborator and
//! the [`StartupBarrier`] used for roles running on other nodes.
//!
//! Internal modules:
//! - [`scheduler`]: lifecycle, terminate/await, restart and reload driver;
//! - [`run`]: one orchestration session (role tasks, watchers, cascade);
//! - [`barrier`]: unbounded wait on the shared store, logarithmic heartbeat;
//! - [`lifecycle`]: state machine and final outcome;
//! - [`stops`]: ordered stop history;
//! - [`shutdown`]: OS termination signals.
//!
//! ## Wiring
//! ```text
//!  Scheduler ── bus ──► listener ──► SubscriberSet ──► LogWriter, custom…
//!     │
//!     └─ driver ──► SchedulerRun(generation)
//!                      ├─ role task Search        ─┐
//!                      ├─ role task Web           ─┼─► Launcher ─► ProcessHandle
//!                      ├─ role task TaskProcessor ─┘
//!                      │      └─ AppState (flags, leader lock), StartupBarrier
//!                      └─ cascade ─► OrderedStops
//! ```

mod barrier;
mod builder;
mod config;
mod lifecycle;
mod reloader;
mod run;
mod scheduler;
mod shutdown;
mod stops;

pub use barrier::{LogarithmicLogger, StartupBarrier};
pub use builder::SchedulerBuilder;
pub use config::Config;
pub use lifecycle::{Outcome, RunState};
pub use reloader::AppReloader;
pub use scheduler::Scheduler;
pub use stops::StopRecord;
