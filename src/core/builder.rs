use std::sync::Arc;

use crate::core::{AppReloader, Config, Scheduler, reloader::KeepSettings};
use crate::process::Launcher;
use crate::settings::Settings;
use crate::state::{AppStateRef, LocalAppState};
use crate::subscribers::Subscribe;

/// Builder for a [`Scheduler`].
///
/// Only the settings and the launcher are mandatory. Defaults:
/// - config: [`Config::default()`]
/// - app state: a fresh [`LocalAppState`]; cluster nodes pass a
///   [`ClusterAppState`](crate::ClusterAppState)
/// - reloader: keeps the current settings
/// - subscribers: none
pub struct SchedulerBuilder {
    settings: Settings,
    launcher: Arc<dyn Launcher>,
    cfg: Config,
    app_state: Option<AppStateRef>,
    reloader: Option<Arc<dyn AppReloader>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SchedulerBuilder {
    pub(crate) fn new(settings: Settings, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            settings,
            launcher,
            cfg: Config::default(),
            app_state: None,
            reloader: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the runtime configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the shared application state.
    pub fn with_app_state(mut self, app_state: AppStateRef) -> Self {
        self.app_state = Some(app_state);
        self
    }

    /// Sets the collaborator called once per restart.
    pub fn with_reloader(mut self, reloader: Arc<dyn AppReloader>) -> Self {
        self.reloader = Some(reloader);
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the scheduler.
    ///
    /// Must be called from within a tokio runtime (subscriber workers are
    /// spawned here).
    pub fn build(self) -> Arc<Scheduler> {
        let app_state = self
            .app_state
            .unwrap_or_else(|| Arc::new(LocalAppState::new()));
        let reloader = self.reloader.unwrap_or_else(|| Arc::new(KeepSettings));

        Arc::new(Scheduler::new_internal(
            self.cfg,
            self.settings,
            self.launcher,
            app_state,
            reloader,
            self.subscribers,
        ))
    }
}
