//! Error types surfaced by the connection handler and its builder.

use std::io;

use thiserror::Error;

/// Failures reported by [`ProxyConnectionHandler`](crate::ProxyConnectionHandler).
///
/// Every variant is recoverable: the worst outcome is a disconnected handler
/// waiting for the caller to issue another `connect`.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The proxy could not be dialled within the connection timeout.
    #[error("unable to connect to proxy at address: {address}, err: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },
    /// Buffered bytes could not be delivered; the session has been dropped.
    #[error("failed to flush data to proxy at address: {address}, err: {source}")]
    Flush {
        address: String,
        #[source]
        source: io::Error,
    },
    /// `send_data` was called while no connection is held.
    #[error("failed to send data: invalid proxy connection")]
    NotConnected,
    /// Writing into the session buffer failed. The session is kept.
    #[error("failed to send data: {0}")]
    Write(#[source] io::Error),
    /// The write path panicked; the session has been dropped.
    #[error("failed to send data: unexpected fault: {0}")]
    Fault(String),
    /// The background flush thread could not be spawned.
    #[error("failed to start flush worker: {0}")]
    Worker(#[source] io::Error),
    /// The handler has been closed and cannot be reused.
    #[error("proxy connection handler is closed")]
    Closed,
}

/// Errors that may occur while building a handler.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid user supplied configuration.
    #[error("invalid connection configuration: {0}")]
    InvalidConfig(String),
    /// The handler was built but could not be started.
    #[error(transparent)]
    Proxy(#[from] ProxyError),
}
