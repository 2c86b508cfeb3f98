//! In-memory launcher and helpers shared by the scheduler tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rolevisor::{
    AppReloader, Config, LaunchError, LaunchMode, Launcher, MemoryStore, ProcessHandle,
    ProcessRef, ReloadError, Role, RoleCommand, Settings, SharedStore, StoreError,
};
use tokio::sync::watch;

/// Upper bound of every wait in the tests.
pub const PATIENCE: Duration = Duration::from_secs(10);

/// Fast polling for tests.
pub fn fast_config() -> Config {
    Config {
        watch_interval: Duration::from_millis(5),
        barrier_poll: Duration::from_millis(5),
        barrier_log_ratio: 10,
        bus_capacity: 1024,
    }
}

/// Local settings with a dummy command for every role.
pub fn local_settings() -> Settings {
    with_commands(Settings::local())
}

/// Adds a dummy command for every role.
pub fn with_commands(settings: Settings) -> Settings {
    Role::ALL.into_iter().fold(settings, |s, role| {
        s.with_command(RoleCommand::new(role, format!("/fake/{}", role.key())))
    })
}

/// Polls `cond` until it holds; panics after [`PATIENCE`].
pub async fn eventually<F>(what: &str, mut cond: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + PATIENCE;
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Awaits `fut`; panics after [`PATIENCE`].
pub async fn within<T>(what: &str, fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(PATIENCE, fut)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}

/// Fake role process driven by the test.
pub struct FakeHandle {
    role: Role,
    mode: LaunchMode,
    alive: watch::Sender<bool>,
    operational: AtomicBool,
    restart: AtomicBool,
    stop_asked: AtomicBool,
}

impl FakeHandle {
    fn new(role: Role, mode: LaunchMode, operational: bool) -> Self {
        Self {
            role,
            mode,
            alive: watch::channel(true).0,
            operational: AtomicBool::new(operational),
            restart: AtomicBool::new(false),
            stop_asked: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> LaunchMode {
        self.mode
    }

    pub fn make_operational(&self) {
        self.operational.store(true, Ordering::SeqCst);
    }

    pub fn request_restart(&self) {
        self.restart.store(true, Ordering::SeqCst);
    }

    /// Simulates a crash.
    pub fn crash(&self) {
        self.alive.send_replace(false);
    }

    pub fn was_asked_to_stop(&self) -> bool {
        self.stop_asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessHandle for FakeHandle {
    fn role(&self) -> Role {
        self.role
    }

    fn is_alive(&self) -> bool {
        *self.alive.borrow()
    }

    async fn is_operational(&self) -> bool {
        self.operational.load(Ordering::SeqCst)
    }

    async fn asked_for_restart(&self) -> bool {
        self.restart.load(Ordering::SeqCst)
    }

    async fn acknowledge_ask_for_restart(&self) {
        self.restart.store(false, Ordering::SeqCst);
    }

    async fn ask_for_stop(&self) {
        self.stop_asked.store(true, Ordering::SeqCst);
        self.alive.send_replace(false);
    }

    fn destroy_forcibly(&self) {
        self.alive.send_replace(false);
    }

    async fn wait_for(&self, timeout: Option<Duration>) -> bool {
        let mut rx = self.alive.subscribe();
        let dead = async move { rx.wait_for(|alive| !alive).await.is_ok() };
        match timeout {
            Some(t) => tokio::time::timeout(t, dead).await.unwrap_or(false),
            None => dead.await,
        }
    }
}

/// Launcher recording every launch.
#[derive(Default)]
pub struct FakeLauncher {
    manual_operational: bool,
    failing: Mutex<HashSet<Role>>,
    launched: Mutex<Vec<Arc<FakeHandle>>>,
}

impl FakeLauncher {
    /// Launched handles report operational immediately.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Launched handles stay non-operational until the test says so.
    pub fn manual() -> Arc<Self> {
        Arc::new(Self {
            manual_operational: true,
            ..Self::default()
        })
    }

    pub fn fail_on(&self, role: Role) {
        self.failing.lock().unwrap().insert(role);
    }

    /// Every handle launched so far, in launch order.
    pub fn handles(&self) -> Vec<Arc<FakeHandle>> {
        self.launched.lock().unwrap().clone()
    }

    /// Roles launched so far, in launch order.
    pub fn launched_roles(&self) -> Vec<Role> {
        self.handles().iter().map(|h| h.role).collect()
    }

    /// Latest handle of `role`.
    pub fn latest(&self, role: Role) -> Option<Arc<FakeHandle>> {
        self.handles().into_iter().rev().find(|h| h.role == role)
    }

    pub fn launch_count(&self, role: Role) -> usize {
        self.handles().iter().filter(|h| h.role == role).count()
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self, command: &RoleCommand) -> Result<ProcessRef, LaunchError> {
        let role = command.role();
        if self.failing.lock().unwrap().contains(&role) {
            return Err(LaunchError::Rejected {
                role,
                reason: "refused by test".into(),
            });
        }
        let handle = Arc::new(FakeHandle::new(role, command.mode(), !self.manual_operational));
        self.launched.lock().unwrap().push(Arc::clone(&handle));
        Ok(handle)
    }
}

/// Reloader counting its calls; fails when told to.
#[derive(Default)]
pub struct CountingReloader {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl CountingReloader {
    pub fn failing() -> Arc<Self> {
        let reloader = Self::default();
        reloader.fail.store(true, Ordering::SeqCst);
        Arc::new(reloader)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppReloader for CountingReloader {
    async fn reload(&self, current: &Settings) -> Result<Settings, ReloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReloadError::Failed {
                reason: "configuration broken".into(),
            });
        }
        Ok(current.clone())
    }
}

/// [`MemoryStore`] whose next lock releases fail while armed.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing_releases: AtomicUsize,
}

impl FlakyStore {
    /// Fails the next `n` calls to `remove_if_equals`.
    pub fn fail_releases(&self, n: usize) {
        self.failing_releases.store(n, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl SharedStore for FlakyStore {
    async fn set_flag(&self, key: &str) -> Result<(), StoreError> {
        self.inner.set_flag(key).await
    }

    async fn remove_flag(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove_flag(key).await
    }

    async fn scan_flags(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.scan_flags(prefix).await
    }

    async fn put_if_absent(&self, key: &str, value: &str) -> Result<Option<String>, StoreError> {
        self.inner.put_if_absent(key, value).await
    }

    async fn remove_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let armed = self
            .failing_releases
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            return Err(StoreError::Unavailable {
                reason: "release dropped".into(),
            });
        }
        self.inner.remove_if_equals(key, value).await
    }
}
