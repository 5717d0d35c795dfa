//! Process-wide tunables for the proxy.
//!
//! A plain `Default`-able struct carrying the handful of fixed constants
//! this proxy runs with, instead of scattering magic numbers through the
//! acceptor and worker.

/// Default TCP port the proxy listens on when no CLI argument is given.
pub const DEFAULT_PORT: u16 = 8080;

/// Maximum number of concurrently admitted client connections.
pub const MAX_CLIENTS: usize = 400;

/// Hard ceiling on accumulated header bytes before a request is rejected.
pub const MAX_HEADER_SIZE: usize = 64 * 1024;

/// Total byte budget (key + value, summed over all entries) for the cache.
pub const CACHE_CAPACITY_BYTES: usize = 200 * 1024 * 1024;

/// Size of the chunk used to relay bytes between client and upstream sockets.
pub const RELAY_CHUNK_SIZE: usize = 4 * 1024;

/// Runtime configuration for a single proxy instance.
///
/// Only `port` is ever overridden, by the single optional CLI argument;
/// the rest are process-wide constants exposed here so tests can run
/// several independent proxy instances with smaller cache capacities and
/// client limits.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_clients: usize,
    pub max_header_size: usize,
    pub cache_capacity_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_clients: MAX_CLIENTS,
            max_header_size: MAX_HEADER_SIZE,
            cache_capacity_bytes: CACHE_CAPACITY_BYTES,
        }
    }
}

impl Config {
    /// Parses the single optional CLI `port` argument.
    ///
    /// Any other field keeps its default; only the port is ever supplied
    /// on the command line.
    pub fn from_args<I: Iterator<Item = String>>(mut args: I) -> Result<Self, String> {
        let _program_name = args.next();
        let mut config = Self::default();

        if let Some(arg) = args.next() {
            config.port = arg
                .parse()
                .map_err(|_| format!("invalid port argument: {arg}"))?;
        }

        Ok(config)
    }
}
