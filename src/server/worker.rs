// Worker process module
// One worker = one single-threaded runtime serving the plain and TLS listeners

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use super::connection::accept_connection;
use super::listener::create_reusable_listener;
use super::signal::{start_signal_handler, SignalHandler};
use super::tls;
use crate::config::{AppState, Config};
use crate::error::ServerError;
use crate::handler::{dispatch, Router};
use crate::logger;

/// Run a worker until SIGINT/SIGTERM
///
/// TLS material and both listeners are set up before anything is served;
/// a failure in either is returned and ends the worker process.
pub fn run(config: &Config, worker_id: usize) -> Result<(), ServerError> {
    dispatch::install_panic_hook();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    // LocalSet so every connection can be a spawn_local task on this thread
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, serve(config, worker_id))
}

async fn serve(config: &Config, worker_id: usize) -> Result<(), ServerError> {
    let http_addr = config.http_socket_addr()?;
    let https_addr = config.https_socket_addr()?;

    let acceptor = tls::load_acceptor(&config.tls)?;
    let http_listener = create_reusable_listener(http_addr)?;
    let https_listener = create_reusable_listener(https_addr)?;

    let signals = Arc::new(SignalHandler::new());
    start_signal_handler(Arc::clone(&signals), "worker")?;

    let state = Arc::new(AppState::new(config, Router::new()));
    let connections = Arc::new(AtomicUsize::new(0));

    logger::log_worker_start(worker_id, &state.profile, &http_addr, &https_addr);
    logger::log_info(&format!(
        "[Worker {worker_id}] Routes: {}",
        state.router.paths().join(", ")
    ));

    tokio::select! {
        () = accept_loop(http_listener, None, Arc::clone(&state), Arc::clone(&connections)) => {}
        () = accept_loop(https_listener, Some(acceptor), Arc::clone(&state), Arc::clone(&connections)) => {}
        () = signals.wait_for_shutdown() => {
            logger::log_info(&format!("[Worker {worker_id}] Stopped accepting connections"));
        }
    }

    Ok(())
}

/// Accept connections forever; accept errors are logged and skipped
async fn accept_loop(
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    state: Arc<AppState>,
    connections: Arc<AtomicUsize>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                accept_connection(stream, peer_addr, &state, &connections, tls.as_ref());
            }
            Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
        }
    }
}
