//! TCP connection handling for the proxy link.
//!
//! [`ProxyConnectionHandler`] owns one connection to the proxy at a time. The
//! socket sits behind a `BufWriter` over a
//! [`ResilientWriter`](crate::ResilientWriter), a background thread flushes
//! that buffer on every tick of an injected
//! [`FlushTicker`](crate::FlushTicker), and a failed flush drops the
//! connection so the caller can dial again.

mod config;
mod handler;
mod session;
mod transport;
mod worker;


pub use config::{
    ConnectionConfig, DEFAULT_ADDRESS, DEFAULT_BUFFER_CAPACITY, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_WRITE_TIMEOUT,
};
pub use handler::{HandlerState, ProxyConnectionHandler};
