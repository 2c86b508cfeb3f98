//! # rolevisor
//!
//! **Rolevisor** supervises the three cooperating processes of one
//! application node: a search engine, a web server, and a background task
//! processor. It starts them in dependency order, watches them, stops them
//! in reverse order when anything goes wrong, and restarts the whole stack on
//! request. Several nodes can form a cluster through a shared store.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                       Settings (what to run)      Config (how to pace)
//!                                  │                       │
//!                                  ▼                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler                                                        │
//! │  - Bus (broadcast events) ──► SubscriberSet ──► LogWriter, …      │
//! │  - Lifecycle (Idle → Scheduling → Running → Stopping → Terminated)│
//! │  - OrderedStops (stop history across runs)                        │
//! │  - AppReloader (called once per restart)                          │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//!                  SchedulerRun (generation 1, 2, …)
//!        ┌───────────────────────┼────────────────────────┐
//!        ▼                       ▼                        ▼
//!   role task Search       role task Web          role task TaskProcessor
//!   (no prerequisite)      (after Search,         (after Web)
//!                           leader or follower)
//!        │                       │                        │
//!        └──────────► Launcher::launch(RoleCommand) ◄─────┘
//!                                │
//!                                ▼
//!                     ProcessHandle (polled every watch_interval)
//!
//! Remote prerequisites and the web leader lock go through AppState:
//!   LocalAppState            single node
//!   ClusterAppState ──► SharedStore (MemoryStore, or a real distributed store)
//! ```
//!
//! ### Lifecycle of a run
//! ```text
//! for each enabled role (concurrently):
//!   ├─► wait for prerequisite (local: operational in this run; remote: StartupBarrier)
//!   ├─► Web: try_lock_web_leader → Leader, else wait for the leader → Follower
//!   ├─► launch, then watch:
//!   │       ├─ first operational → AppState::set_operational
//!   │       ├─ restart request   → cascade, reload, next run
//!   │       └─ process died      → cascade, terminate
//!   └─► launch failure / store failure → cascade, terminate
//!
//! cascade: stop handles in reverse launch order
//!          (ask_for_stop → wait_for → clear operational → release leader lock)
//! ```
//!
//! ## Features
//! | Area              | Description                                          | Key types / traits                         |
//! |-------------------|------------------------------------------------------|--------------------------------------------|
//! | **Scheduling**    | Ordered start, watch, cascade, restart               | [`Scheduler`], [`SchedulerBuilder`]        |
//! | **Processes**     | Spawning and probing role processes                  | [`Launcher`], [`ProcessHandle`], [`CommandLauncher`] |
//! | **State**         | Operational flags and the web leader lock            | [`AppState`], [`LocalAppState`], [`ClusterAppState`] |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics)        | [`Subscribe`], [`LogWriter`]               |
//! | **Errors**        | Typed errors and final outcome                       | [`RuntimeError`], [`LaunchError`], [`Outcome`] |
//! | **Configuration** | Runtime knobs and application settings               | [`Config`], [`Settings`], [`RoleCommand`]  |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use rolevisor::{CommandLauncher, LogWriter, Role, RoleCommand, Scheduler, Settings, Subscribe};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::local()
//!         .with_command(RoleCommand::new(Role::Search, "/opt/app/bin/search"))
//!         .with_command(RoleCommand::new(Role::Web, "/opt/app/bin/web"))
//!         .with_command(RoleCommand::new(Role::TaskProcessor, "/opt/app/bin/tasks"));
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let scheduler = Scheduler::builder(settings, Arc::new(CommandLauncher::new("/var/run/app")))
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let outcome = scheduler.run_until_signal().await?;
//!     std::process::exit(if outcome.is_success() { 0 } else { 1 });
//! }
//! ```
mod core;
mod error;
mod events;
mod process;
mod roles;
mod settings;
mod state;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    AppReloader, Config, LogarithmicLogger, Outcome, RunState, Scheduler, SchedulerBuilder,
    StartupBarrier, StopRecord,
};
pub use error::{LaunchError, ReloadError, RuntimeError, SettingsError, StoreError};
pub use events::{Bus, Event, EventKind};
pub use process::{
    CommandHandle, CommandLauncher, ENV_LAUNCH_MODE, ENV_ROLE, ENV_STATUS_DIR, Launcher,
    ProcessHandle, ProcessRef,
};
pub use roles::{ParseRoleError, Role, RoleSet};
pub use settings::{ClusterSettings, LaunchMode, RoleCommand, Settings};
pub use state::{AppState, AppStateRef, ClusterAppState, LocalAppState, MemoryStore, SharedStore};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
