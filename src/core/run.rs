//! # One orchestration session.
//!
//! A [`SchedulerRun`] starts every locally enabled role, watches the launched
//! processes, and tears everything down on the first stop trigger. It is never
//! reused: a restart builds a fresh run with the next generation number.
//!
//! ```text
//! execute()
//!   ├─ spawn one role task per enabled role:
//!   │     await prerequisite (local: marked by this run; remote: StartupBarrier)
//!   │     Web only: try_lock_web_leader → Leader | wait for leader → Follower
//!   │     launch → register handle
//!   │     watch every watch_interval:
//!   │        first operational → set_operational
//!   │        restart request   → trigger(Restart)
//!   │        dead              → trigger(Died)
//!   ├─ all launched → Running
//!   └─ token cancelled (first trigger, or terminate through the parent token)
//!         cascade():
//!           join role tasks (waits abandon, in-flight launches register)
//!           for each handle in reverse launch order:
//!             record stop → ask_for_stop → wait_for(None)
//!             clear_operational, release leader lock (leader Web)
//! ```
//!
//! ## Rules
//! - The first trigger wins; later triggers (and triggers after the token is
//!   cancelled) only cancel, so exactly one cascade runs per run.
//! - A role still waiting when the token is cancelled never launches.
//! - A store error while stopping (clearing a flag, releasing the leader lock)
//!   turns a terminate or restart into `StoreFailed`, so the scheduler never
//!   restarts on top of stale shared state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::barrier::{LogarithmicLogger, StartupBarrier};
use crate::core::config::Config;
use crate::core::lifecycle::{Lifecycle, Outcome, RunState};
use crate::core::stops::OrderedStops;
use crate::error::{LaunchError, StoreError};
use crate::events::{Bus, Event, EventKind};
use crate::process::{Launcher, ProcessRef};
use crate::roles::{Role, RoleSet};
use crate::settings::{LaunchMode, Settings};
use crate::state::AppStateRef;

/// Collaborators shared by every run of one scheduler.
#[derive(Clone)]
pub(crate) struct RunEnv {
    pub(crate) cfg: Config,
    pub(crate) bus: Bus,
    pub(crate) launcher: Arc<dyn Launcher>,
    pub(crate) app_state: AppStateRef,
    pub(crate) stops: Arc<OrderedStops>,
}

/// What ended a run.
#[derive(Debug)]
pub(crate) enum StopReason {
    Terminate,
    Died(Role),
    LaunchFailed(LaunchError),
    StoreFailed { role: Role, error: StoreError },
    Restart(Role),
}

impl StopReason {
    /// Stops nobody reported as a failure.
    fn is_graceful(&self) -> bool {
        matches!(self, StopReason::Terminate | StopReason::Restart(_))
    }

    fn role(&self) -> Option<Role> {
        match self {
            StopReason::Terminate => None,
            StopReason::Died(role) | StopReason::Restart(role) => Some(*role),
            StopReason::LaunchFailed(error) => Some(error.role()),
            StopReason::StoreFailed { role, .. } => Some(*role),
        }
    }

    fn describe(&self) -> String {
        match self {
            StopReason::Terminate => "termination requested".to_string(),
            StopReason::Died(role) => format!("{role} died"),
            StopReason::LaunchFailed(error) => error.to_string(),
            StopReason::StoreFailed { error, .. } => error.to_string(),
            StopReason::Restart(role) => format!("restart requested by {role}"),
        }
    }

    pub(crate) fn into_outcome(self) -> Outcome {
        match self {
            StopReason::Terminate | StopReason::Restart(_) => Outcome::Stopped,
            StopReason::Died(role) => Outcome::RoleDied { role },
            StopReason::LaunchFailed(error) => Outcome::LaunchFailed(error),
            StopReason::StoreFailed { role, error } => Outcome::StoreFailed { role, error },
        }
    }
}

struct Launched {
    role: Role,
    mode: LaunchMode,
    handle: ProcessRef,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One orchestration session.
pub(crate) struct SchedulerRun {
    generation: u64,
    settings: Settings,
    env: RunEnv,
    token: CancellationToken,
    reason: Mutex<Option<StopReason>>,
    cleanup_failure: Mutex<Option<(Role, StoreError)>>,
    launched: Mutex<Vec<Launched>>,
    launched_count: watch::Sender<usize>,
    operational: watch::Sender<RoleSet>,
}

impl SchedulerRun {
    pub(crate) fn new(
        generation: u64,
        settings: Settings,
        env: RunEnv,
        token: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            generation,
            settings,
            env,
            token,
            reason: Mutex::new(None),
            cleanup_failure: Mutex::new(None),
            launched: Mutex::new(Vec::new()),
            launched_count: watch::channel(0).0,
            operational: watch::channel(RoleSet::empty()).0,
        })
    }

    /// Runs the session to its end and returns what stopped it.
    pub(crate) async fn execute(self: Arc<Self>, lifecycle: &Lifecycle) -> StopReason {
        self.publish(Event::new(EventKind::RunScheduling));

        let enabled = self.settings.enabled_roles();
        let mut roles = JoinSet::new();
        for role in enabled.iter() {
            roles.spawn(Arc::clone(&self).drive_role(role));
        }

        let mut launched = self.launched_count.subscribe();
        let all_launched = async move { launched.wait_for(|n| *n >= enabled.len()).await.is_ok() };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => {}
            ok = all_launched => {
                if ok && lifecycle.transition_from(RunState::Scheduling, RunState::Running) {
                    self.publish(Event::new(EventKind::RunRunning));
                }
                self.token.cancelled().await;
            }
        }

        let reason = lock(&self.reason).take().unwrap_or(StopReason::Terminate);
        lifecycle.transition(RunState::Stopping);
        let mut stopping = Event::new(EventKind::RunStopping).with_reason(reason.describe());
        if let Some(role) = reason.role() {
            stopping = stopping.with_role(role);
        }
        self.publish(stopping);

        self.cascade(roles).await;
        let reason = match lock(&self.cleanup_failure).take() {
            Some((role, error)) if reason.is_graceful() => StopReason::StoreFailed { role, error },
            _ => reason,
        };
        self.publish(Event::new(EventKind::RunTerminated).with_reason(reason.describe()));
        reason
    }

    fn publish(&self, event: Event) {
        self.env.bus.publish(event.with_generation(self.generation));
    }

    /// Records the first stop reason and cancels the run.
    fn trigger(&self, reason: StopReason) {
        {
            let mut slot = lock(&self.reason);
            if slot.is_none() && !self.token.is_cancelled() {
                *slot = Some(reason);
            }
        }
        self.token.cancel();
    }

    fn store_failed(&self, role: Role, error: StoreError) {
        self.publish(
            Event::new(EventKind::StoreFailed)
                .with_role(role)
                .with_reason(error.to_string()),
        );
        self.trigger(StopReason::StoreFailed { role, error });
    }

    /// Reports a store error of the stop path; the first one is kept.
    fn cleanup_failed(&self, role: Role, error: StoreError) {
        self.publish(
            Event::new(EventKind::StoreFailed)
                .with_role(role)
                .with_reason(error.to_string()),
        );
        let mut slot = lock(&self.cleanup_failure);
        if slot.is_none() {
            *slot = Some((role, error));
        }
    }

    fn barrier(&self, role: Role) -> StartupBarrier {
        StartupBarrier::new(
            Arc::clone(&self.env.app_state),
            role,
            self.env.cfg.barrier_poll_clamped(),
            LogarithmicLogger::new(self.env.bus.clone(), self.env.cfg.barrier_log_ratio_clamped()),
        )
    }

    async fn drive_role(self: Arc<Self>, role: Role) {
        if let Some(prerequisite) = role.prerequisite() {
            match self.await_prerequisite(role, prerequisite).await {
                Ok(true) => {}
                Ok(false) => return,
                Err(error) => return self.store_failed(role, error),
            }
        }

        let mode = if role == Role::Web {
            match self.elect_web().await {
                Ok(Some(mode)) => mode,
                Ok(None) => return,
                Err(error) => return self.store_failed(role, error),
            }
        } else {
            LaunchMode::Standalone
        };

        if let Some(handle) = self.launch(role, mode).await {
            self.watch(role, handle).await;
        }
    }

    async fn await_prerequisite(&self, role: Role, prerequisite: Role) -> Result<bool, StoreError> {
        self.publish(
            Event::new(EventKind::RoleWaiting)
                .with_role(role)
                .with_reason(prerequisite.key()),
        );

        if !self.settings.is_enabled(prerequisite) {
            return self.barrier(prerequisite).wait_for_operational(&self.token).await;
        }

        let mut marked = self.operational.subscribe();
        let ready = async move { marked.wait_for(|set| set.contains(prerequisite)).await.is_ok() };
        Ok(tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            ready = ready => ready,
        })
    }

    /// Returns the launch mode of the local web role, or `None` if cancelled.
    async fn elect_web(&self) -> Result<Option<LaunchMode>, StoreError> {
        if self.token.is_cancelled() {
            return Ok(None);
        }
        if self.env.app_state.try_lock_web_leader().await? {
            self.publish(Event::new(EventKind::LeaderElected).with_role(Role::Web));
            return Ok(Some(LaunchMode::Leader));
        }

        self.publish(Event::new(EventKind::FollowerWaiting).with_role(Role::Web));
        let leader_ready = self
            .barrier(Role::Web)
            .wait_for_operational(&self.token)
            .await?;
        Ok(leader_ready.then_some(LaunchMode::Follower))
    }

    async fn launch(&self, role: Role, mode: LaunchMode) -> Option<ProcessRef> {
        if self.token.is_cancelled() {
            self.release_leader_lock(mode).await;
            return None;
        }

        self.publish(Event::new(EventKind::RoleLaunching).with_role(role).with_mode(mode));
        let launched = match self.settings.command_for(role, mode) {
            Some(command) => self.env.launcher.launch(&command).await,
            None => Err(LaunchError::MissingCommand { role }),
        };

        match launched {
            Ok(handle) => {
                lock(&self.launched).push(Launched {
                    role,
                    mode,
                    handle: Arc::clone(&handle),
                });
                self.launched_count.send_modify(|n| *n += 1);
                self.publish(Event::new(EventKind::RoleLaunched).with_role(role).with_mode(mode));
                Some(handle)
            }
            Err(error) => {
                self.publish(
                    Event::new(EventKind::RoleLaunchFailed)
                        .with_role(role)
                        .with_reason(error.to_string()),
                );
                self.release_leader_lock(mode).await;
                self.trigger(StopReason::LaunchFailed(error));
                None
            }
        }
    }

    async fn release_leader_lock(&self, mode: LaunchMode) {
        if mode != LaunchMode::Leader {
            return;
        }
        if let Err(error) = self.env.app_state.release_web_leader().await {
            self.cleanup_failed(Role::Web, error);
        }
    }

    async fn watch(&self, role: Role, handle: ProcessRef) {
        let mut ticks = tokio::time::interval(self.env.cfg.watch_interval_clamped());
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut marked = false;

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return,
                _ = ticks.tick() => {}
            }

            if !marked && handle.is_operational().await {
                if let Err(error) = self.env.app_state.set_operational(role).await {
                    return self.store_failed(role, error);
                }
                marked = true;
                self.publish(Event::new(EventKind::RoleOperational).with_role(role));
                self.operational.send_modify(|set| {
                    set.insert(role);
                });
            }

            if handle.asked_for_restart().await {
                handle.acknowledge_ask_for_restart().await;
                if !self.token.is_cancelled() {
                    self.publish(Event::new(EventKind::RestartRequested).with_role(role));
                }
                return self.trigger(StopReason::Restart(role));
            }

            if !handle.is_alive() {
                self.publish(Event::new(EventKind::RoleDied).with_role(role));
                return self.trigger(StopReason::Died(role));
            }
        }
    }

    async fn cascade(&self, mut roles: JoinSet<()>) {
        self.token.cancel();
        while roles.join_next().await.is_some() {}

        let launched = std::mem::take(&mut *lock(&self.launched));
        for Launched { role, mode, handle } in launched.into_iter().rev() {
            self.env.stops.record(self.generation, role);
            self.publish(Event::new(EventKind::RoleStopping).with_role(role));

            handle.ask_for_stop().await;
            handle.wait_for(None).await;
            self.publish(Event::new(EventKind::RoleStopped).with_role(role));

            if let Err(error) = self.env.app_state.clear_operational(role).await {
                self.cleanup_failed(role, error);
            }
            self.release_leader_lock(mode).await;
        }
    }
}
