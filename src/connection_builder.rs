//! Builder for [`ProxyConnectionHandler`].
//!
//! Collects the proxy address, timeouts, buffer size, and flush cadence,
//! validates them, and produces a ready handler. A custom [`FlushTicker`] may
//! be supplied instead of a flush interval when the caller wants to drive
//! flushes itself.

use std::time::Duration;

use crate::{
    connection::{ConnectionConfig, DEFAULT_FLUSH_INTERVAL, ProxyConnectionHandler},
    error::BuildError,
    ticker::FlushTicker,
};

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(BuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for constructing [`ProxyConnectionHandler`] instances.
#[derive(Clone, Debug, Default)]
pub struct ProxyConnectionBuilder {
    address: Option<String>,
    connect_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    buffer_capacity: Option<usize>,
    flush_interval_ms: Option<u64>,
    warn_interval_ms: Option<u64>,
    ticker: Option<FlushTicker>,
}

impl ProxyConnectionBuilder {
    /// Create a builder with no address configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Target the proxy at `address` (`host:port`).
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Target the proxy at `host` on `port`.
    ///
    /// Bare IPv6 literals are bracketed automatically.
    pub fn with_host_port(mut self, host: impl AsRef<str>, port: u16) -> Self {
        let host = host.as_ref().trim();
        self.address = Some(if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        });
        self
    }

    option_setter!(
        #[doc = "Bound the dial in milliseconds."]
        with_connect_timeout_ms,
        connect_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Bound each blocking socket write in milliseconds."]
        with_write_timeout_ms,
        write_timeout_ms,
        u64
    );
    option_setter!(with_buffer_capacity, buffer_capacity, usize);
    option_setter!(
        #[doc = "Flush on a wall-clock interval, in milliseconds."]
        with_flush_interval_ms,
        flush_interval_ms,
        u64
    );
    option_setter!(with_warn_interval_ms, warn_interval_ms, u64);

    /// Drive flushes from `ticker` instead of a wall-clock interval.
    pub fn with_ticker(mut self, ticker: FlushTicker) -> Self {
        self.ticker = Some(ticker);
        self
    }

    fn validate(&self) -> Result<(), BuildError> {
        self.validate_address()?;
        self.validate_numbers()?;
        if self.ticker.is_some() && self.flush_interval_ms.is_some() {
            return Err(BuildError::InvalidConfig(
                "flush_interval_ms and ticker are mutually exclusive".into(),
            ));
        }
        Ok(())
    }

    fn validate_address(&self) -> Result<(), BuildError> {
        let Some(address) = self.address.as_deref() else {
            return Err(BuildError::InvalidConfig(
                "proxy connection requires an address".into(),
            ));
        };
        let Some((host, port)) = address.rsplit_once(':') else {
            return Err(BuildError::InvalidConfig(format!(
                "address '{address}' must be in host:port form"
            )));
        };
        if host.trim().is_empty() {
            return Err(BuildError::InvalidConfig(
                "address host must not be empty".into(),
            ));
        }
        port.parse::<u16>().map_err(|_| {
            BuildError::InvalidConfig(format!("address port '{port}' is not a valid port"))
        })?;
        Ok(())
    }

    fn validate_numbers(&self) -> Result<(), BuildError> {
        if let Some(timeout) = self.connect_timeout_ms {
            ensure_positive!(timeout, "connect_timeout_ms")?;
        }
        if let Some(timeout) = self.write_timeout_ms {
            ensure_positive!(timeout, "write_timeout_ms")?;
        }
        if let Some(capacity) = self.buffer_capacity {
            ensure_positive!(capacity, "buffer_capacity")?;
        }
        if let Some(interval) = self.flush_interval_ms {
            ensure_positive!(interval, "flush_interval_ms")?;
        }
        if let Some(interval) = self.warn_interval_ms {
            ensure_positive!(interval, "warn_interval_ms")?;
        }
        Ok(())
    }

    /// Validate the settings and produce the handler configuration.
    pub fn build_config(&self) -> Result<ConnectionConfig, BuildError> {
        self.validate()?;
        let mut config = ConnectionConfig::new(self.address.clone().unwrap_or_default());
        if let Some(timeout) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(timeout);
        }
        if let Some(timeout) = self.write_timeout_ms {
            config.write_timeout = Duration::from_millis(timeout);
        }
        if let Some(capacity) = self.buffer_capacity {
            config.buffer_capacity = capacity;
        }
        if let Some(interval) = self.warn_interval_ms {
            config.warn_interval = Duration::from_millis(interval);
        }
        Ok(config)
    }

    fn into_ticker(self) -> FlushTicker {
        match (self.ticker, self.flush_interval_ms) {
            (Some(ticker), _) => ticker,
            (None, Some(ms)) => FlushTicker::every(Duration::from_millis(ms)),
            (None, None) => FlushTicker::every(DEFAULT_FLUSH_INTERVAL),
        }
    }

    /// Build the handler without starting or connecting it.
    ///
    /// Consumes the builder so that a ticker supplied through
    /// [`with_ticker`](Self::with_ticker) is owned by the handler alone and
    /// stops when the handler closes.
    pub fn build(self) -> Result<ProxyConnectionHandler, BuildError> {
        let config = self.build_config()?;
        Ok(ProxyConnectionHandler::new(config, self.into_ticker()))
    }

    /// Build the handler and start its flush worker.
    pub fn build_started(self) -> Result<ProxyConnectionHandler, BuildError> {
        let handler = self.build()?;
        handler.start()?;
        Ok(handler)
    }
}
