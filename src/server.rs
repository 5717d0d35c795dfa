//! Acceptor / admission controller.
//!
//! Configures the listening socket with an explicit backlog, then
//! accepts into a semaphore-gated spawn loop rather than a fixed
//! worker-pool-plus-queue: a pooled queue earns its keep on a
//! keep-alive, multi-request-per-connection server by amortizing
//! per-connection buffers across requests, and this proxy's connections
//! are single-shot, so there is no buffer to amortize across
//! connections.

use crate::{cache::LruCache, config::Config, worker::AdmissionGate};
use socket2::{Domain, Protocol, Socket, Type};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;

/// Binds the listening socket and runs the accept loop until the
/// process is killed (there is no graceful shutdown).
///
/// Returns only on a startup failure — bind or listen errors are
/// returned to the caller, which exits nonzero.
pub async fn run(config: Config) -> std::io::Result<()> {
    let listener = bind_listener(config.port, config.max_clients)?;
    tracing::info!(port = config.port, max_clients = config.max_clients, "proxy listening");
    serve(listener, config).await
}

/// Runs the accept loop against an already-bound `listener`. Split out
/// from [`run`] so tests can bind an ephemeral port (port 0) and learn
/// the assigned port via `local_addr()` before driving connections at
/// it, the same way the unit tests below exercise `bind_listener`.
pub async fn serve(listener: TcpListener, config: Config) -> std::io::Result<()> {
    let cache = Arc::new(LruCache::new(config.cache_capacity_bytes));
    let gate = AdmissionGate::new(config.max_clients);

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                // A per-accept failure is transient: logged, loop continues.
                tracing::warn!(error = %err, "accept failed, continuing");
                continue;
            }
        };

        tracing::debug!(%peer, "accepted connection");

        let cache = Arc::clone(&cache);
        let gate = gate.clone();
        let max_header_size = config.max_header_size;

        tokio::spawn(async move {
            let permit = gate.acquire().await;
            crate::worker::handle_connection(socket, cache, max_header_size, permit).await;
        });
    }
}

/// Opens a TCP listening socket on `0.0.0.0:<port>` with `SO_REUSEADDR`
/// and a backlog equal to `max_clients`.
///
/// Uses `socket2` for the reuse-address and backlog configuration tokio's
/// own `TcpListener::bind` does not expose, then hands the raw socket to
/// tokio for the actual async accept loop.
pub fn bind_listener(port: u16, backlog: usize) -> std::io::Result<TcpListener> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog as i32)?;

    TcpListener::from_std(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_listener_accepts_connections_on_an_ephemeral_port() {
        let listener = bind_listener(0, 16).unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move { listener.accept().await });
        let client = tokio::net::TcpStream::connect(addr).await;
        assert!(client.is_ok());
        assert!(accept.await.unwrap().is_ok());
    }
}
