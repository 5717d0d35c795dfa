//! relay_proxy — forward HTTP/1.x caching proxy for microservice fan-out
//!
//! Accepts client connections, parses their request line and headers,
//! forwards `GET` requests to origin servers, relays the response back
//! to the client, and caches full responses keyed by the raw request so
//! that subsequent identical requests are served from memory without an
//! upstream round trip.
//!
//! # Scope
//!
//! HTTPS (no CONNECT tunneling, no TLS), non-`GET` methods (rejected
//! with 501), HTTP/2+, persistent upstream connections, cache validation
//! headers (`Cache-Control`, `ETag`, `Vary`), disk persistence, IPv6,
//! connection pooling, and graceful shutdown are all out of scope.
//!
//! # Quick start
//!
//! ```no_run
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     relay_proxy::server::run(relay_proxy::config::Config::default()).await
//! }
//! ```

pub mod cache;
pub mod config;
pub mod errors;
pub mod http {
    pub mod request;
    pub mod types;
}
pub mod io_util;
pub mod relay;
pub mod server;
pub mod upstream;
pub mod worker;
