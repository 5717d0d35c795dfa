//! Per-client worker: S0-S5 connection lifecycle as one `async fn`,
//! early returns standing in for the state transitions.

use crate::{cache::LruCache, errors::ProxyError, http::request, http::types::Method, io_util, relay};
use std::sync::Arc;
use tokio::{net::TcpStream, sync::Semaphore};

/// Counting semaphore bounding concurrently admitted clients.
#[derive(Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
}

impl AdmissionGate {
    pub fn new(max_clients: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_clients)),
        }
    }

    /// Blocks until a permit is free. The returned guard releases it on drop.
    pub async fn acquire(&self) -> tokio::sync::OwnedSemaphorePermit {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore is never closed")
    }
}

/// S0-S5: admission (already held via `_permit`), header receive, cache
/// lookup, parse & dispatch, error response, teardown.
pub async fn handle_connection(
    mut client: TcpStream,
    cache: Arc<LruCache>,
    max_header_size: usize,
    _permit: tokio::sync::OwnedSemaphorePermit,
) {
    let header_bytes = match receive_headers(&mut client, max_header_size).await {
        HeaderReceive::Complete(buf) => buf,
        HeaderReceive::TooLarge | HeaderReceive::ClosedWithBytes => {
            respond_error(&mut client, ProxyError::ClientProtocolError).await;
            teardown(client).await;
            return;
        }
        HeaderReceive::ClosedEmpty => {
            // S5: silent close, no bytes were ever sent by the peer.
            teardown(client).await;
            return;
        }
    };

    // S2 Lookup.
    if let Some(cached) = cache.get(&header_bytes) {
        let _ = io_util::send_all(&mut client, &cached).await;
        teardown(client).await;
        return;
    }

    // S3 Parse & dispatch.
    let parsed = match request::parse(&header_bytes) {
        Ok(parsed) => parsed,
        Err(_) => {
            respond_error(&mut client, ProxyError::ClientProtocolError).await;
            teardown(client).await;
            return;
        }
    };

    if parsed.method != Method::Get {
        respond_error(&mut client, ProxyError::MethodUnsupported).await;
        teardown(client).await;
        return;
    }

    match relay::run(&mut client, &parsed).await {
        Ok(response) => {
            cache.put(header_bytes, response);
        }
        Err(ProxyError::RelayInterrupted) => {
            // Bytes may already have reached the client; nothing more to
            // send and nothing to cache.
        }
        Err(_) => {
            // No client bytes were sent before the failure (connect or
            // pre-response send failed): surface 500.
            respond_error(&mut client, ProxyError::UpstreamUnreachable).await;
        }
    }

    teardown(client).await;
}

enum HeaderReceive {
    Complete(Vec<u8>),
    TooLarge,
    ClosedWithBytes,
    ClosedEmpty,
}

/// S1: reads until `\r\n\r\n`, `max_header_size` is exceeded, or the peer closes.
async fn receive_headers(client: &mut TcpStream, max_header_size: usize) -> HeaderReceive {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    loop {
        if contains_terminator(&buf) {
            return HeaderReceive::Complete(buf);
        }

        if buf.len() >= max_header_size {
            return HeaderReceive::TooLarge;
        }

        match io_util::recv_once(client, &mut chunk).await {
            Ok(0) => {
                return if buf.is_empty() {
                    HeaderReceive::ClosedEmpty
                } else {
                    HeaderReceive::ClosedWithBytes
                };
            }
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(_) => {
                return if buf.is_empty() {
                    HeaderReceive::ClosedEmpty
                } else {
                    HeaderReceive::ClosedWithBytes
                };
            }
        }
    }
}

fn contains_terminator(buf: &[u8]) -> bool {
    memchr::memmem::find(buf, b"\r\n\r\n").is_some()
}

/// S4: best-effort error response; write failures are swallowed.
async fn respond_error(client: &mut TcpStream, error: ProxyError) {
    // Version is unknown once parsing failed or was skipped.
    let response = error.as_http(crate::http::types::Version::Http11);
    let _ = io_util::send_all(client, &response).await;
}

/// S5: shuts down both directions and drops the socket.
async fn teardown(mut client: TcpStream) {
    use tokio::io::AsyncWriteExt;
    let _ = client.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = TcpStream::connect(addr);
        let (accepted, client) = tokio::join!(listener.accept(), connect);
        (accepted.unwrap().0, client.unwrap())
    }

    #[tokio::test]
    async fn admission_gate_releases_permit_on_drop() {
        let gate = AdmissionGate::new(1);
        {
            let _permit = gate.acquire().await;
            assert_eq!(gate.semaphore.available_permits(), 0);
        }
        assert_eq!(gate.semaphore.available_permits(), 1);
    }

    #[tokio::test]
    async fn malformed_request_yields_400() {
        let (server_sock, mut client_sock) = connected_pair().await;
        let cache = Arc::new(LruCache::new(1024));
        let gate = AdmissionGate::new(1);
        let permit = gate.acquire().await;

        let worker = tokio::spawn(handle_connection(server_sock, cache, 65536, permit));

        io_util::send_all(&mut client_sock, b"NOT_HTTP\r\n\r\n").await.unwrap();

        let mut buf = vec![0u8; 256];
        let n = io_util::recv_once(&mut client_sock, &mut buf).await.unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));

        worker.await.unwrap();
    }

    #[tokio::test]
    async fn non_get_method_yields_501() {
        let (server_sock, mut client_sock) = connected_pair().await;
        let cache = Arc::new(LruCache::new(1024));
        let gate = AdmissionGate::new(1);
        let permit = gate.acquire().await;

        let worker = tokio::spawn(handle_connection(server_sock, cache, 65536, permit));

        io_util::send_all(&mut client_sock, b"POST / HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .unwrap();

        let mut buf = vec![0u8; 256];
        let n = io_util::recv_once(&mut client_sock, &mut buf).await.unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.starts_with("HTTP/1.1 501 Not Implemented\r\n"));

        worker.await.unwrap();
    }

    #[tokio::test]
    async fn header_overflow_yields_400_without_upstream_attempt() {
        let (server_sock, mut client_sock) = connected_pair().await;
        let cache = Arc::new(LruCache::new(1024));
        let gate = AdmissionGate::new(1);
        let permit = gate.acquire().await;

        let worker = tokio::spawn(handle_connection(server_sock, cache, 64, permit));

        io_util::send_all(&mut client_sock, &vec![b'a'; 1000]).await.unwrap();

        let mut buf = vec![0u8; 256];
        let n = io_util::recv_once(&mut client_sock, &mut buf).await.unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));

        worker.await.unwrap();
    }

    #[tokio::test]
    async fn warm_hit_serves_from_cache_without_reparsing() {
        let (server_sock, mut client_sock) = connected_pair().await;
        let cache = Arc::new(LruCache::new(1024));
        let request_bytes = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n".to_vec();
        cache.put(request_bytes.clone(), b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi".to_vec());

        let gate = AdmissionGate::new(1);
        let permit = gate.acquire().await;
        let worker = tokio::spawn(handle_connection(server_sock, cache, 65536, permit));

        io_util::send_all(&mut client_sock, &request_bytes).await.unwrap();

        let mut buf = vec![0u8; 256];
        let n = io_util::recv_once(&mut client_sock, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");

        worker.await.unwrap();
    }
}
