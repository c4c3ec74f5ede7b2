// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)
//
// Both the supervisor and each worker install their own handler.

use std::sync::Arc;
use tokio::sync::watch;

/// Signal handler state
pub struct SignalHandler {
    /// Flips to `true` once shutdown has been requested
    shutdown: watch::Sender<bool>,
}

impl SignalHandler {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { shutdown }
    }

    /// Request shutdown; every current and future waiter is released
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolve once shutdown has been requested
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown.subscribe();
        let _ = rx.wait_for(|&stop| stop).await;
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Start signal handlers (Unix only)
///
/// Registers SIGTERM and SIGINT and spawns a background task that turns
/// either into a shutdown request. Must be called inside a runtime.
#[cfg(unix)]
pub fn start_signal_handler(handler: Arc<SignalHandler>, role: &'static str) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        crate::logger::log_info(&format!(
            "[SIGNAL] {name} received by {role} (pid {}), shutting down",
            std::process::id()
        ));
        handler.request_shutdown();
    });
    Ok(())
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(handler: Arc<SignalHandler>, role: &'static str) -> std::io::Result<()> {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            crate::logger::log_info(&format!("[SIGNAL] Ctrl+C received by {role}, shutting down"));
            handler.request_shutdown();
        }
    });
    Ok(())
}
