// Connection handling module
// Accepts one TCP connection, optionally terminates TLS, and serves HTTP/1.1 on it

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept a connection, enforcing the connection limit, and serve it in a local task.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared worker state
/// * `conn_counter` - Active connection counter
/// * `tls` - Acceptor for the HTTPS listener, `None` for plain HTTP
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    tls: Option<&TlsAcceptor>,
) {
    // Increment counter first, then check limit
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    let scheme = if tls.is_some() { "https" } else { "http" };
    logger::log_connection_accepted(&peer_addr, scheme);

    if let Err(e) = stream.set_nodelay(true) {
        logger::log_warning(&format!("Failed to set TCP_NODELAY for {peer_addr}: {e}"));
    }

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
        tls.cloned(),
    );
}

/// Handle a single connection in a spawned local task.
///
/// The whole exchange (TLS handshake included) runs under the configured
/// timeout. When the timeout fires the connection is dropped; any response
/// already committed by the dispatcher is simply never sent.
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
    tls: Option<TlsAcceptor>,
) {
    tokio::task::spawn_local(async move {
        let timeout_duration = connection_timeout(&state);

        let exchange = async {
            match tls {
                Some(acceptor) => match acceptor.accept(stream).await {
                    Ok(tls_stream) => serve(TokioIo::new(tls_stream), &state).await,
                    Err(e) => {
                        logger::log_warning(&format!("TLS handshake with {peer_addr} failed: {e}"));
                        Ok(())
                    }
                },
                None => serve(TokioIo::new(stream), &state).await,
            }
        };

        match tokio::time::timeout(timeout_duration, exchange).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Serve HTTP/1.1 requests on an established (plain or TLS) stream
async fn serve<I>(io: TokioIo<I>, state: &Arc<AppState>) -> Result<(), hyper::Error>
where
    I: AsyncRead + AsyncWrite + Unpin,
{
    let mut builder = http1::Builder::new();
    builder.keep_alive(state.config.performance.keep_alive);

    let state = Arc::clone(state);
    builder
        .serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, Arc::clone(&state))),
        )
        .await
}

fn connection_timeout(state: &AppState) -> Duration {
    Duration::from_secs(std::cmp::max(
        state.config.performance.read_timeout,
        state.config.performance.write_timeout,
    ))
}
