//! # Scheduler: starts the roles, watches them, and drives restarts.
//!
//! The [`Scheduler`] owns the event bus, the subscriber fan-out and the
//! collaborators shared by its runs. `schedule()` spawns a driver task that
//! executes one [`SchedulerRun`] after the other:
//!
//! ```text
//! schedule()
//!   └─ driver:
//!        loop {
//!          run(generation).execute()      ─► StopReason
//!          Restart and not terminating?   ─► reload(settings) once
//!             Ok(next)  → generation + 1, next run
//!             Err(e)    → Outcome::ReloadFailed
//!          otherwise                      ─► Outcome
//!        }
//!        state = Terminated, outcome published
//!
//! terminate()
//!   Idle → Terminated directly, otherwise cancel the scheduler token
//!   (parent of every run token) and wait for the driver.
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use rolevisor::{CommandLauncher, Role, RoleCommand, Scheduler, Settings};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), rolevisor::RuntimeError> {
//! let settings = Settings::local()
//!     .with_command(RoleCommand::new(Role::Search, "/opt/app/bin/search"))
//!     .with_command(RoleCommand::new(Role::Web, "/opt/app/bin/web"))
//!     .with_command(RoleCommand::new(Role::TaskProcessor, "/opt/app/bin/tasks"));
//!
//! let launcher = Arc::new(CommandLauncher::new("/tmp/rolevisor-doc"));
//! let scheduler = Scheduler::builder(settings, launcher).build();
//!
//! // Terminating before scheduling never launches anything.
//! scheduler.terminate().await;
//! assert!(scheduler.await_termination().await.is_success());
//! assert!(scheduler.schedule().is_err());
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::core::builder::SchedulerBuilder;
use crate::core::lifecycle::{Lifecycle, Outcome, RunState};
use crate::core::run::{RunEnv, SchedulerRun, StopReason};
use crate::core::stops::{OrderedStops, StopRecord};
use crate::core::{AppReloader, Config, shutdown};
use crate::error::{ReloadError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::process::Launcher;
use crate::roles::Role;
use crate::settings::Settings;
use crate::state::AppStateRef;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Fan-out waiting for `schedule()` to start forwarding.
struct Listener {
    rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
}

/// Starts, watches and stops the three roles of one node.
pub struct Scheduler {
    env: RunEnv,
    settings: Settings,
    reloader: Arc<dyn AppReloader>,
    listener: Mutex<Option<Listener>>,
    lifecycle: Lifecycle,
    outcome: watch::Sender<Option<Outcome>>,
    token: CancellationToken,
    shutdown_requested: AtomicBool,
}

impl Scheduler {
    /// Returns a builder for a scheduler of `settings`, launching through `launcher`.
    pub fn builder(settings: Settings, launcher: Arc<dyn Launcher>) -> SchedulerBuilder {
        SchedulerBuilder::new(settings, launcher)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        settings: Settings,
        launcher: Arc<dyn Launcher>,
        app_state: AppStateRef,
        reloader: Arc<dyn AppReloader>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let listener = Listener {
            rx: bus.subscribe(),
            set: SubscriberSet::new(subscribers, bus.clone()),
        };

        Self {
            env: RunEnv {
                cfg,
                bus,
                launcher,
                app_state,
                stops: Arc::new(OrderedStops::default()),
            },
            settings,
            reloader,
            listener: Mutex::new(Some(listener)),
            lifecycle: Lifecycle::new(),
            outcome: watch::channel(None).0,
            token: CancellationToken::new(),
            shutdown_requested: AtomicBool::new(false),
        }
    }

    /// Starts the first run.
    ///
    /// Returns immediately; roles are started by background tasks. Fails with
    /// [`RuntimeError::AlreadyScheduled`] unless the scheduler is idle, and
    /// with [`RuntimeError::InvalidSettings`] (staying idle) if the settings
    /// do not validate.
    pub fn schedule(self: &Arc<Self>) -> Result<(), RuntimeError> {
        if self.lifecycle.current() != RunState::Idle {
            return Err(RuntimeError::AlreadyScheduled);
        }
        self.settings.validate()?;
        if !self
            .lifecycle
            .transition_from(RunState::Idle, RunState::Scheduling)
        {
            return Err(RuntimeError::AlreadyScheduled);
        }

        self.spawn_listener();
        tokio::spawn(Arc::clone(self).drive(self.settings.clone()));
        Ok(())
    }

    /// Stops every role in reverse launch order and waits for termination.
    ///
    /// Idempotent. Before `schedule()` it terminates without launching
    /// anything; during startup, waiting roles never launch. Wins over a
    /// restart in progress.
    pub async fn terminate(&self) {
        if !self.shutdown_requested.swap(true, Ordering::SeqCst) {
            self.env
                .bus
                .publish(Event::new(EventKind::ShutdownRequested));
        }
        self.token.cancel();
        if self
            .lifecycle
            .transition_from(RunState::Idle, RunState::Terminated)
        {
            self.finish(Outcome::Stopped);
        }
        self.await_termination().await;
    }

    /// Waits until the scheduler is terminated and returns why.
    pub async fn await_termination(&self) -> Outcome {
        let mut rx = self.outcome.subscribe();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(Outcome::Stopped)
    }

    /// Schedules, then terminates on the first OS termination signal.
    ///
    /// Returns when the scheduler is terminated, by the signal or on its own.
    pub async fn run_until_signal(self: &Arc<Self>) -> Result<Outcome, RuntimeError> {
        self.schedule()?;
        tokio::select! {
            outcome = self.await_termination() => Ok(outcome),
            signal = shutdown::wait_for_shutdown_signal() => {
                self.terminate().await;
                signal?;
                Ok(self.await_termination().await)
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.lifecycle.current()
    }

    /// Receiver notified on every lifecycle transition.
    pub fn state_changes(&self) -> watch::Receiver<RunState> {
        self.lifecycle.subscribe()
    }

    /// Roles stopped so far, in stop order, across runs.
    pub fn ordered_stops(&self) -> Vec<Role> {
        self.env.stops.roles()
    }

    /// Full stop history, across runs.
    pub fn stops(&self) -> Vec<StopRecord> {
        self.env.stops.snapshot()
    }

    /// Subscribes to the raw event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.env.bus.subscribe()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.env.cfg
    }

    /// Forwards bus events to the subscribers until the scheduler terminates.
    fn spawn_listener(&self) {
        let taken = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(Listener { mut rx, set }) = taken else {
            return;
        };

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        set.emit(&ev);
                        if ev.kind == EventKind::SchedulerTerminated {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
            set.shutdown().await;
        });
    }

    async fn drive(self: Arc<Self>, mut settings: Settings) {
        let mut generation = 1;
        let outcome = loop {
            let run = SchedulerRun::new(
                generation,
                settings.clone(),
                self.env.clone(),
                self.token.child_token(),
            );
            let reason = run.execute(&self.lifecycle).await;

            let StopReason::Restart(_) = reason else {
                break reason.into_outcome();
            };
            if self.token.is_cancelled() {
                break Outcome::Stopped;
            }
            match self.reload(&settings).await {
                Ok(next) => settings = next,
                Err(error) => break Outcome::ReloadFailed(error),
            }
            if self.token.is_cancelled() {
                break Outcome::Stopped;
            }

            self.lifecycle.transition(RunState::Scheduling);
            generation += 1;
        };

        self.lifecycle.transition(RunState::Terminated);
        self.finish(outcome);
    }

    async fn reload(&self, current: &Settings) -> Result<Settings, ReloadError> {
        let reloaded = self.reloader.reload(current).await.and_then(|next| {
            next.validate()
                .map_err(|e| ReloadError::Invalid { reason: e.to_string() })?;
            Ok(next)
        });

        match &reloaded {
            Ok(_) => self.env.bus.publish(Event::new(EventKind::ReloadSucceeded)),
            Err(error) => self.env.bus.publish(
                Event::new(EventKind::ReloadFailed).with_reason(error.to_string()),
            ),
        }
        reloaded
    }

    fn finish(&self, outcome: Outcome) {
        self.env.bus.publish(
            Event::new(EventKind::SchedulerTerminated).with_reason(outcome.as_label()),
        );
        self.outcome.send_replace(Some(outcome));
    }
}
