//! Configuration consumed by the connection handler.
//!
//! [`ProxyConnectionBuilder`](crate::ProxyConnectionBuilder) validates and
//! produces these values; they can also be constructed directly.

use std::time::Duration;

use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

/// Default proxy address used when none is supplied.
pub const DEFAULT_ADDRESS: &str = "localhost:2878";
/// Default bound on how long `connect` waits for the dial to complete.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default bound on a single blocking socket write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default capacity of the per-session write buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;
/// Default interval between background flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Settings for one logical link to a proxy.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Target in `host:port` form.
    pub address: String,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub buffer_capacity: usize,
    /// Minimum spacing between summarised send-failure warnings.
    pub warn_interval: Duration,
}

impl ConnectionConfig {
    /// Configuration targeting `address` with default timings.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Override the dial timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the socket write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Override the write buffer capacity.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}
