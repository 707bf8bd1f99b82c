use crate::error::ProxyError;

/// Trait implemented by connection handlers.
///
/// This is the seam the sender layer programs against: it hands over
/// already formatted, newline-terminated metric text and never looks at the
/// socket directly. Implementations are `Send + Sync` so one handler can be
/// shared by every producing thread.
pub trait ConnectionHandler: Send + Sync {
    /// Spawn the background flush loop.
    fn start(&self) -> Result<(), ProxyError>;

    /// Establish the connection to the proxy.
    fn connect(&self) -> Result<(), ProxyError>;

    /// Whether a connection is currently held.
    fn connected(&self) -> bool;

    /// Force buffered bytes onto the wire.
    fn flush(&self) -> Result<(), ProxyError>;

    /// Queue metric text for delivery.
    fn send_data(&self, lines: &str) -> Result<(), ProxyError>;

    /// Number of failed send attempts so far.
    fn failure_count(&self) -> u64;

    /// Flush and release every resource. Single use.
    fn close(&self);
}
