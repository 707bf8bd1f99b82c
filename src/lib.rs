//! Resilient TCP link for streaming metric lines to a telemetry proxy.
//!
//! The crate's centre is [`ProxyConnectionHandler`]: it dials the proxy,
//! buffers newline-delimited metric text, flushes on a timer, and drops the
//! connection when the socket breaks so the caller can reconnect.
//!
//! ```no_run
//! use proxy_link::ProxyConnectionBuilder;
//!
//! let handler = ProxyConnectionBuilder::new()
//!     .with_host_port("localhost", 2878)
//!     .with_flush_interval_ms(1_000)
//!     .build_started()?;
//! handler.connect()?;
//! handler.send_data("test.metric 1 1700000000 source=a\n")?;
//! handler.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod connection;
pub mod connection_builder;
pub mod error;
pub mod handler;
pub mod rate_limited_warner;
pub mod resilient_writer;
pub mod ticker;

pub use connection::{ConnectionConfig, HandlerState, ProxyConnectionHandler};
pub use connection_builder::ProxyConnectionBuilder;
pub use error::{BuildError, ProxyError};
pub use handler::ConnectionHandler;
pub use resilient_writer::ResilientWriter;
pub use ticker::{FlushTicker, TickTrigger};
