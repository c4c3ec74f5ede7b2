// Supervisor module
// Starts one worker process per CPU and reports how each one exits.
// Exited workers are logged, never restarted.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::task::JoinSet;

use super::signal::{start_signal_handler, SignalHandler};
use crate::config::Config;
use crate::error::ServerError;
use crate::logger;

/// Environment variable carrying the worker index into a worker process
pub const WORKER_ID_ENV: &str = "HELLO_API_WORKER_ID";

/// How long workers get to exit on their own after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Which part this process plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Supervisor,
    Worker(usize),
}

impl Role {
    /// Workers are started with `HELLO_API_WORKER_ID` set; everything else supervises
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_worker_id(std::env::var(WORKER_ID_ENV).ok().as_deref())
    }

    fn from_worker_id(worker_id: Option<&str>) -> Result<Self, ServerError> {
        match worker_id {
            None => Ok(Self::Supervisor),
            Some(id) => id
                .trim()
                .parse()
                .map(Self::Worker)
                .map_err(|_| ServerError::InvalidWorkerId(id.to_string())),
        }
    }
}

/// Start the workers and wait until all of them have exited
pub fn run(config: &Config) -> Result<(), ServerError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(supervise(config))
}

async fn supervise(config: &Config) -> Result<(), ServerError> {
    let count = config.worker_count();
    logger::log_supervisor_start(count, &config.profile());

    let signals = Arc::new(SignalHandler::new());
    start_signal_handler(Arc::clone(&signals), "supervisor")?;

    let exe = std::env::current_exe()?;
    let mut workers = JoinSet::new();

    for worker_id in 0..count {
        // kill_on_drop: if a later spawn fails, workers already started go down with us
        let child = Command::new(&exe)
            .args(std::env::args_os().skip(1))
            .env(WORKER_ID_ENV, worker_id.to_string())
            .kill_on_drop(true)
            .spawn()?;
        logger::log_worker_spawned(worker_id, child.id());

        let signals = Arc::clone(&signals);
        workers.spawn(async move { (worker_id, monitor(child, &signals).await) });
    }

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((worker_id, Ok(status))) => {
                let (description, success) = describe_exit(status);
                logger::log_worker_exit(worker_id, &description, success);
            }
            Ok((worker_id, Err(e))) => {
                logger::log_error(&format!("Failed to wait for worker {worker_id}: {e}"));
            }
            Err(e) => logger::log_error(&format!("Worker monitor task failed: {e}")),
        }
    }

    logger::log_info("[Supervisor] All workers have exited");
    Ok(())
}

/// Wait for a worker; on shutdown ask it to stop, give it a grace period, then kill it
async fn monitor(mut child: Child, signals: &SignalHandler) -> std::io::Result<ExitStatus> {
    tokio::select! {
        status = child.wait() => status,
        () = signals.wait_for_shutdown() => {
            terminate(&child);
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    child.start_kill()?;
                    child.wait().await
                }
            }
        }
    }
}

/// Send SIGTERM to a worker
///
/// A signal sent only to the supervisor pid never reaches the workers, so it
/// is forwarded here. A worker that already exited is ignored.
#[cfg(unix)]
fn terminate(child: &Child) {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => logger::log_warning(&format!("Failed to signal worker pid {pid}: {e}")),
    }
}

#[cfg(not(unix))]
fn terminate(_child: &Child) {}

/// Describe how a worker exited; the flag is true only for a clean exit
pub fn describe_exit(status: ExitStatus) -> (String, bool) {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return (format!("was killed by signal: {signal}"), false);
        }
    }

    match status.code() {
        Some(0) => ("exited successfully".to_string(), true),
        Some(code) => (format!("exited with error code: {code}"), false),
        None => ("exited with an unknown status".to_string(), false),
    }
}
