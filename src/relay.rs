//! Request rewriter & relay.
//!
//! Rebuilds the outbound request from the client's parsed request,
//! opens the upstream connection, sends the rewritten request, and
//! relays the response back to the client while accumulating it for
//! the cache.

use crate::{config::RELAY_CHUNK_SIZE, errors::ProxyError, http::request::ParsedRequest, http::types::{self, Method}, io_util, upstream};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Runs the full rewrite-connect-relay sequence for one request and
/// returns the accumulated response bytes.
///
/// `client` is written to as the response streams in. A response is
/// only ever returned on a clean upstream EOF; an upstream
/// read error mid-stream surfaces as `Err(ProxyError::RelayInterrupted)`
/// instead, so the caller never needs a separate cacheability flag — it
/// simply inserts the returned bytes into the cache on `Ok`, and does
/// not on `Err`.
pub async fn run<C>(client: &mut C, request: &ParsedRequest<'_>) -> Result<Vec<u8>, ProxyError>
where
    C: AsyncWrite + Unpin,
{
    debug_assert_eq!(request.method, Method::Get, "relay only ever handles GET");

    let outbound = build_outbound_request(request);

    let port = match request.port {
        Some(digits) => types::slice_to_u16(digits).unwrap_or(0),
        None => 80,
    };
    let host = simdutf8::basic::from_utf8(request.host).map_err(|_| ProxyError::UpstreamUnreachable)?;

    let mut upstream_sock = upstream::connect(host, port).await?;

    io_util::send_all(&mut upstream_sock, &outbound)
        .await
        .map_err(|_| ProxyError::UpstreamUnreachable)?;

    let response = relay_loop(&mut upstream_sock, client).await;

    let _ = upstream_sock.shutdown().await;

    response
}

/// Builds the outbound request line, carries over every header except
/// `Host`/`Connection` (case-insensitive), and appends the rewritten
/// `Host:`/`Connection: close` pair.
fn build_outbound_request(request: &ParsedRequest<'_>) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);

    out.extend_from_slice(b"GET ");
    out.extend_from_slice(request.path);
    out.extend_from_slice(match request.version {
        crate::http::types::Version::Http11 => b" HTTP/1.1\r\n",
        crate::http::types::Version::Http10 => b" HTTP/1.0\r\n",
    });

    for (name, value) in &request.headers {
        if types::eq_ignore_case(name, b"host") || types::eq_ignore_case(name, b"connection") {
            continue;
        }
        out.extend_from_slice(name);
        out.extend_from_slice(b": ");
        out.extend_from_slice(value);
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(b"Host: ");
    out.extend_from_slice(request.host);
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(b"Connection: close\r\n\r\n");

    out
}

/// Reads from `upstream` in fixed 4 KiB chunks, forwarding each to
/// `client` and appending it to the response buffer, until `upstream`
/// reaches EOF or errors. A client-side send failure stops forwarding
/// to the client but keeps draining upstream to EOF, so the response is
/// still cached even once the client is gone. Only an upstream read
/// failure disqualifies the response from being cached.
async fn relay_loop<U, C>(upstream: &mut U, client: &mut C) -> Result<Vec<u8>, ProxyError>
where
    U: AsyncRead + Unpin,
    C: AsyncWrite + Unpin,
{
    let mut response = Vec::new();
    let mut chunk = vec![0u8; RELAY_CHUNK_SIZE];
    let mut client_alive = true;

    loop {
        let n = match io_util::recv_once(upstream, &mut chunk).await {
            Ok(0) => return Ok(response),
            Ok(n) => n,
            Err(_) => return Err(ProxyError::RelayInterrupted),
        };

        response.extend_from_slice(&chunk[..n]);

        if client_alive && io_util::send_all(client, &chunk[..n]).await.is_err() {
            client_alive = false;
        }
    }
}
