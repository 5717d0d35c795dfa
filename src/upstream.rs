//! Upstream connector.

use crate::errors::ProxyError;
use tokio::net::{lookup_host, TcpStream};

/// Resolves `host` and connects to `port`. No connect timeout; the OS default governs.
pub async fn connect(host: &str, port: u16) -> Result<TcpStream, ProxyError> {
    let mut addrs = lookup_host((host, port))
        .await
        .map_err(|_| ProxyError::UpstreamUnreachable)?;

    let addr = addrs.next().ok_or(ProxyError::UpstreamUnreachable)?;

    TcpStream::connect(addr)
        .await
        .map_err(|_| ProxyError::UpstreamUnreachable)
}
