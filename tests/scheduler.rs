mod support;

use std::sync::Arc;
use std::time::Duration;

use rolevisor::{
    AppState, ClusterAppState, EventKind, LaunchMode, LocalAppState, MemoryStore, Outcome, Role,
    RunState, RuntimeError, Scheduler, Settings, StoreError,
};
use support::*;

fn scheduler(settings: Settings, launcher: &Arc<FakeLauncher>) -> Arc<Scheduler> {
    Scheduler::builder(settings, launcher.clone())
        .with_config(fast_config())
        .build()
}

async fn wait_running(scheduler: &Scheduler) {
    let mut states = scheduler.state_changes();
    within("running", states.wait_for(|s| *s == RunState::Running))
        .await
        .expect("state channel closed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_roles_start_after_their_prerequisite_is_operational() {
    let launcher = FakeLauncher::manual();
    let scheduler = scheduler(local_settings(), &launcher);
    scheduler.schedule().unwrap();

    eventually("search launched", || launcher.launch_count(Role::Search) == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(launcher.launched_roles(), vec![Role::Search]);

    launcher.latest(Role::Search).unwrap().make_operational();
    eventually("web launched", || launcher.launch_count(Role::Web) == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(launcher.launched_roles(), vec![Role::Search, Role::Web]);

    launcher.latest(Role::Web).unwrap().make_operational();
    eventually("task processor launched", || launcher.launch_count(Role::TaskProcessor) == 1).await;
    wait_running(&scheduler).await;

    assert_eq!(launcher.latest(Role::Search).unwrap().mode(), LaunchMode::Standalone);
    assert_eq!(launcher.latest(Role::Web).unwrap().mode(), LaunchMode::Leader);
    scheduler.terminate().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_operational_events_precede_dependent_launches() {
    let launcher = FakeLauncher::new();
    let scheduler = scheduler(local_settings(), &launcher);
    let mut events = scheduler.events();
    scheduler.schedule().unwrap();
    wait_running(&scheduler).await;
    scheduler.terminate().await;

    let mut seen = Vec::new();
    while let Ok(ev) = events.try_recv() {
        seen.push(ev);
    }
    let seq_of = |kind: EventKind, role: Role| {
        seen.iter()
            .find(|e| e.kind == kind && e.role == Some(role))
            .map(|e| e.seq)
            .unwrap_or_else(|| panic!("missing {kind:?} for {role}"))
    };
    assert!(seq_of(EventKind::RoleOperational, Role::Search) < seq_of(EventKind::RoleLaunching, Role::Web));
    assert!(
        seq_of(EventKind::RoleOperational, Role::Web)
            < seq_of(EventKind::RoleLaunching, Role::TaskProcessor)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_terminate_stops_in_reverse_launch_order() {
    let launcher = FakeLauncher::new();
    let scheduler = scheduler(local_settings(), &launcher);
    scheduler.schedule().unwrap();
    wait_running(&scheduler).await;

    within("terminate", scheduler.terminate()).await;

    assert_eq!(scheduler.state(), RunState::Terminated);
    assert_eq!(
        scheduler.ordered_stops(),
        vec![Role::TaskProcessor, Role::Web, Role::Search]
    );
    assert!(launcher.handles().iter().all(|h| h.was_asked_to_stop()));
    assert_eq!(scheduler.await_termination().await, Outcome::Stopped);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_terminate_is_idempotent() {
    let launcher = FakeLauncher::new();
    let scheduler = scheduler(local_settings(), &launcher);
    scheduler.schedule().unwrap();
    wait_running(&scheduler).await;

    within("concurrent terminates", async {
        tokio::join!(scheduler.terminate(), scheduler.terminate())
    })
    .await;
    within("third terminate", scheduler.terminate()).await;

    assert_eq!(scheduler.ordered_stops().len(), 3);
    assert!(scheduler.stops().iter().all(|s| s.generation == 1));
    assert!(matches!(scheduler.schedule(), Err(RuntimeError::AlreadyScheduled)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_schedule_twice_is_rejected() {
    let launcher = FakeLauncher::new();
    let scheduler = scheduler(local_settings(), &launcher);
    scheduler.schedule().unwrap();

    let err = scheduler.schedule().unwrap_err();
    assert_eq!(err.as_label(), "runtime_already_scheduled");
    scheduler.terminate().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_settings_keep_scheduler_idle() {
    let launcher = FakeLauncher::new();
    let scheduler = scheduler(local_settings().disable(Role::Search), &launcher);

    let err = scheduler.schedule().unwrap_err();
    assert_eq!(err.as_label(), "runtime_invalid_settings");
    assert_eq!(scheduler.state(), RunState::Idle);
    assert!(launcher.handles().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_crash_cascades_to_every_other_role() {
    let launcher = FakeLauncher::new();
    let scheduler = scheduler(local_settings(), &launcher);
    scheduler.schedule().unwrap();
    wait_running(&scheduler).await;

    launcher.latest(Role::Web).unwrap().crash();
    let outcome = within("termination", scheduler.await_termination()).await;

    assert_eq!(outcome, Outcome::RoleDied { role: Role::Web });
    assert!(!outcome.is_success());
    assert_eq!(scheduler.state(), RunState::Terminated);
    assert_eq!(
        scheduler.ordered_stops(),
        vec![Role::TaskProcessor, Role::Web, Role::Search]
    );
    assert!(launcher.latest(Role::Search).unwrap().was_asked_to_stop());
    assert!(launcher.latest(Role::TaskProcessor).unwrap().was_asked_to_stop());
    assert_eq!(launcher.handles().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_simultaneous_deaths_cascade_once() {
    let launcher = FakeLauncher::new();
    let scheduler = scheduler(local_settings(), &launcher);
    let mut events = scheduler.events();
    scheduler.schedule().unwrap();
    wait_running(&scheduler).await;

    launcher.latest(Role::Search).unwrap().crash();
    launcher.latest(Role::TaskProcessor).unwrap().crash();
    let outcome = within("termination", scheduler.await_termination()).await;

    assert!(matches!(
        outcome,
        Outcome::RoleDied {
            role: Role::Search | Role::TaskProcessor
        }
    ));
    assert_eq!(
        scheduler.ordered_stops(),
        vec![Role::TaskProcessor, Role::Web, Role::Search]
    );

    let mut stopping = 0;
    let mut terminated = 0;
    while let Ok(ev) = events.try_recv() {
        match ev.kind {
            EventKind::RunStopping => stopping += 1,
            EventKind::RunTerminated => terminated += 1,
            _ => {}
        }
    }
    assert_eq!((stopping, terminated), (1, 1));
    assert_eq!(launcher.handles().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_launch_unwinds_started_roles() {
    let launcher = FakeLauncher::new();
    launcher.fail_on(Role::TaskProcessor);
    let scheduler = scheduler(local_settings(), &launcher);
    scheduler.schedule().unwrap();

    let outcome = within("termination", scheduler.await_termination()).await;

    assert_eq!(outcome.as_label(), "launch_failed");
    assert!(matches!(&outcome, Outcome::LaunchFailed(e) if e.role() == Role::TaskProcessor));
    assert_eq!(scheduler.ordered_stops(), vec![Role::Web, Role::Search]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_terminate_during_startup_never_launches_waiting_roles() {
    let launcher = FakeLauncher::manual();
    let scheduler = scheduler(local_settings(), &launcher);
    scheduler.schedule().unwrap();
    eventually("search launched", || launcher.launch_count(Role::Search) == 1).await;

    within("terminate", scheduler.terminate()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(launcher.launched_roles(), vec![Role::Search]);
    assert_eq!(scheduler.ordered_stops(), vec![Role::Search]);
    assert_eq!(scheduler.await_termination().await, Outcome::Stopped);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_terminate_before_schedule_launches_nothing() {
    let launcher = FakeLauncher::new();
    let scheduler = scheduler(local_settings(), &launcher);

    within("terminate", scheduler.terminate()).await;

    assert_eq!(scheduler.state(), RunState::Terminated);
    assert!(scheduler.ordered_stops().is_empty());
    assert!(launcher.handles().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_restart_runs_a_fresh_generation() {
    let launcher = FakeLauncher::new();
    let reloader = Arc::new(CountingReloader::default());
    let scheduler = Scheduler::builder(local_settings(), launcher.clone())
        .with_config(fast_config())
        .with_reloader(reloader.clone())
        .build();
    scheduler.schedule().unwrap();
    wait_running(&scheduler).await;

    let first_web = launcher.latest(Role::Web).unwrap();
    first_web.request_restart();
    eventually("second generation launched", || launcher.handles().len() == 6).await;
    wait_running(&scheduler).await;

    assert_eq!(reloader.calls(), 1);
    assert_eq!(
        launcher.launched_roles(),
        vec![
            Role::Search,
            Role::Web,
            Role::TaskProcessor,
            Role::Search,
            Role::Web,
            Role::TaskProcessor
        ]
    );
    assert!(!Arc::ptr_eq(&first_web, &launcher.latest(Role::Web).unwrap()));
    // The leader lock was released with the first web process.
    assert_eq!(launcher.latest(Role::Web).unwrap().mode(), LaunchMode::Leader);

    scheduler.terminate().await;
    let generations: Vec<u64> = scheduler.stops().iter().map(|s| s.generation).collect();
    assert_eq!(generations, vec![1, 1, 1, 2, 2, 2]);
    assert_eq!(reloader.calls(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_restart_request_during_shutdown_is_ignored() {
    let launcher = FakeLauncher::new();
    let reloader = Arc::new(CountingReloader::default());
    let scheduler = Scheduler::builder(local_settings(), launcher.clone())
        .with_config(fast_config())
        .with_reloader(reloader.clone())
        .build();
    scheduler.schedule().unwrap();
    wait_running(&scheduler).await;

    let terminating = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.terminate().await })
    };
    let mut states = scheduler.state_changes();
    within(
        "shutdown started",
        states.wait_for(|s| matches!(s, RunState::Stopping | RunState::Terminated)),
    )
    .await
    .expect("state channel closed");
    for handle in launcher.handles() {
        handle.request_restart();
    }

    within("terminate", terminating).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(scheduler.await_termination().await, Outcome::Stopped);
    assert_eq!(reloader.calls(), 0);
    assert_eq!(launcher.handles().len(), 3);
    assert_eq!(scheduler.state(), RunState::Terminated);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reload_failure_terminates_without_relaunch() {
    let launcher = FakeLauncher::new();
    let reloader = CountingReloader::failing();
    let scheduler = Scheduler::builder(local_settings(), launcher.clone())
        .with_config(fast_config())
        .with_reloader(reloader.clone())
        .build();
    scheduler.schedule().unwrap();
    wait_running(&scheduler).await;

    launcher.latest(Role::TaskProcessor).unwrap().request_restart();
    let outcome = within("termination", scheduler.await_termination()).await;

    assert_eq!(outcome.as_label(), "reload_failed");
    assert_eq!(reloader.calls(), 1);
    assert_eq!(launcher.handles().len(), 3);
    assert_eq!(
        scheduler.ordered_stops(),
        vec![Role::TaskProcessor, Role::Web, Role::Search]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_web_waits_for_external_leader_then_follows() {
    let launcher = FakeLauncher::new();
    let state = Arc::new(LocalAppState::new());
    assert!(state.try_lock_web_leader().await.unwrap());

    let scheduler = Scheduler::builder(local_settings(), launcher.clone())
        .with_config(fast_config())
        .with_app_state(state.clone())
        .build();
    scheduler.schedule().unwrap();

    eventually("search launched", || launcher.launch_count(Role::Search) == 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(launcher.launch_count(Role::Web), 0);

    state.set_operational(Role::Web).await.unwrap();
    eventually("web launched", || launcher.launch_count(Role::Web) == 1).await;
    assert_eq!(launcher.latest(Role::Web).unwrap().mode(), LaunchMode::Follower);

    wait_running(&scheduler).await;
    scheduler.terminate().await;

    // A follower never releases a lock it does not hold.
    assert!(!state.try_lock_web_leader().await.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_search_satisfies_local_web() {
    let store = Arc::new(MemoryStore::new());
    let search_node = ClusterAppState::new(store.clone(), "prod", "search-1");
    search_node.set_operational(Role::Search).await.unwrap();

    let launcher = FakeLauncher::new();
    let settings = with_commands(Settings::cluster("prod", "app-1").disable(Role::Search));
    let scheduler = Scheduler::builder(settings, launcher.clone())
        .with_config(fast_config())
        .with_app_state(Arc::new(ClusterAppState::new(store, "prod", "app-1")))
        .build();
    scheduler.schedule().unwrap();
    wait_running(&scheduler).await;

    assert_eq!(launcher.launched_roles(), vec![Role::Web, Role::TaskProcessor]);
    assert_eq!(launcher.launch_count(Role::Search), 0);

    scheduler.terminate().await;
    assert_eq!(scheduler.ordered_stops(), vec![Role::TaskProcessor, Role::Web]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_prerequisite_wait_is_cancellable() {
    let store = Arc::new(MemoryStore::new());
    let launcher = FakeLauncher::new();
    let settings = with_commands(Settings::cluster("prod", "app-1").disable(Role::Search));
    let scheduler = Scheduler::builder(settings, launcher.clone())
        .with_config(fast_config())
        .with_app_state(Arc::new(ClusterAppState::new(store, "prod", "app-1")))
        .build();
    scheduler.schedule().unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    within("terminate", scheduler.terminate()).await;

    assert!(launcher.handles().is_empty());
    assert!(scheduler.ordered_stops().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_store_outage_tears_the_run_down() {
    let store = Arc::new(MemoryStore::new());
    let launcher = FakeLauncher::new();
    let settings = with_commands(Settings::cluster("prod", "app-1").disable(Role::Search));
    let scheduler = Scheduler::builder(settings, launcher.clone())
        .with_config(fast_config())
        .with_app_state(Arc::new(ClusterAppState::new(store.clone(), "prod", "app-1")))
        .build();

    store.set_available(false);
    scheduler.schedule().unwrap();
    let outcome = within("termination", scheduler.await_termination()).await;

    assert!(matches!(
        outcome,
        Outcome::StoreFailed {
            role: Role::Web,
            error: StoreError::Unavailable { .. }
        }
    ));
    assert!(launcher.handles().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_two_nodes_elect_one_web_leader() {
    let store = Arc::new(MemoryStore::new());
    let node = |name: &str, launcher: &Arc<FakeLauncher>| {
        Scheduler::builder(with_commands(Settings::cluster("prod", name)), launcher.clone())
            .with_config(fast_config())
            .with_app_state(Arc::new(ClusterAppState::new(store.clone(), "prod", name)))
            .build()
    };
    let first_launcher = FakeLauncher::new();
    let second_launcher = FakeLauncher::new();
    let first = node("node-1", &first_launcher);
    let second = node("node-2", &second_launcher);

    first.schedule().unwrap();
    wait_running(&first).await;
    second.schedule().unwrap();
    wait_running(&second).await;

    assert_eq!(first_launcher.latest(Role::Web).unwrap().mode(), LaunchMode::Leader);
    assert_eq!(second_launcher.latest(Role::Web).unwrap().mode(), LaunchMode::Follower);

    first.terminate().await;
    second.terminate().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_leader_release_terminates_instead_of_restarting() {
    let store = Arc::new(FlakyStore::default());
    let launcher = FakeLauncher::new();
    let reloader = Arc::new(CountingReloader::default());
    let scheduler = Scheduler::builder(with_commands(Settings::cluster("prod", "a")), launcher.clone())
        .with_config(fast_config())
        .with_app_state(Arc::new(ClusterAppState::new(store.clone(), "prod", "a")))
        .with_reloader(reloader.clone())
        .build();
    scheduler.schedule().unwrap();
    wait_running(&scheduler).await;
    assert_eq!(launcher.latest(Role::Web).unwrap().mode(), LaunchMode::Leader);

    store.fail_releases(1);
    launcher.latest(Role::Web).unwrap().request_restart();
    let outcome = within("termination", scheduler.await_termination()).await;

    assert!(matches!(
        outcome,
        Outcome::StoreFailed {
            role: Role::Web,
            error: StoreError::Unavailable { .. }
        }
    ));
    assert_eq!(reloader.calls(), 0);
    assert_eq!(launcher.handles().len(), 3);
    assert_eq!(
        scheduler.ordered_stops(),
        vec![Role::TaskProcessor, Role::Web, Role::Search]
    );

    // The stale lock still names this node, which takes it back on its next start.
    let again = ClusterAppState::new(store.clone(), "prod", "a");
    assert!(again.try_lock_web_leader().await.unwrap());
    let other = ClusterAppState::new(store, "prod", "b");
    assert!(!other.try_lock_web_leader().await.unwrap());
}
