//! # Example: Local Stack
//!
//! Runs the three roles as `/bin/sh` scripts on one node. Each script declares
//! itself operational after a short warm-up, then waits for the stop marker.
//! The task processor asks for one application-wide restart, so the stack is
//! stopped, reloaded and started again once.
//!
//! ```text
//! RUST_LOG=info cargo run --example local_stack
//! ```
//! Stop it with Ctrl-C.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use rolevisor::{
    CommandLauncher, Config, LogWriter, Role, RoleCommand, Scheduler, Settings, Subscribe,
};

/// Script of one role: warm up, report operational, serve until asked to stop.
fn role_script(warmup: &str, ask_restart_once: bool) -> String {
    let restart = if ask_restart_once {
        r#"if [ ! -f "$ROLEVISOR_STATUS_DIR/../restarted" ]; then
  sleep 1
  touch "$ROLEVISOR_STATUS_DIR/../restarted" "$ROLEVISOR_STATUS_DIR/restart"
fi"#
    } else {
        ""
    };
    format!(
        r#"echo "[$ROLEVISOR_ROLE] starting ($ROLEVISOR_LAUNCH_MODE)"
sleep {warmup}
touch "$ROLEVISOR_STATUS_DIR/operational"
{restart}
while [ ! -f "$ROLEVISOR_STATUS_DIR/stop" ]; do sleep 0.1; done
echo "[$ROLEVISOR_ROLE] stopping""#
    )
}

fn command(role: Role, script: String) -> RoleCommand {
    RoleCommand::new(role, "/bin/sh").arg("-c").arg(script)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let status_root = tempfile::tempdir()?;
    let settings = Settings::local()
        .with_command(command(Role::Search, role_script("0.5", false)))
        .with_command(command(Role::Web, role_script("0.3", false)))
        .with_command(command(Role::TaskProcessor, role_script("0.2", true)));

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let scheduler = Scheduler::builder(settings, Arc::new(CommandLauncher::new(status_root.path())))
        .with_config(Config::default())
        .with_subscribers(subs)
        .build();

    let outcome = scheduler.run_until_signal().await?;
    println!("stopped: {} (stop order {:?})", outcome.as_label(), scheduler.ordered_stops());
    if !outcome.is_success() {
        anyhow::bail!("stack terminated abnormally: {outcome:?}");
    }
    Ok(())
}
