//! Fixtures pairing a [`ProxySink`] with a handler driven by a manual ticker.

use std::time::Duration;

use proxy_link::{ConnectionConfig, FlushTicker, ProxyConnectionHandler, TickTrigger};
use rstest::fixture;

use super::proxy_sink::ProxySink;

/// A running sink plus a connected handler flushed only on demand.
#[allow(dead_code)]
pub struct Harness {
    pub sink: ProxySink,
    pub trigger: TickTrigger,
    pub handler: ProxyConnectionHandler,
}

/// Return a started and connected handler writing into a fresh sink.
#[allow(dead_code)]
#[fixture]
pub fn harness() -> Harness {
    let sink = ProxySink::spawn();
    let (trigger, ticker) = FlushTicker::manual();
    let config = ConnectionConfig::new(sink.addr().to_string())
        .with_connect_timeout(Duration::from_secs(2));
    let handler = ProxyConnectionHandler::new(config, ticker);
    handler.start().expect("start handler");
    handler.connect().expect("connect handler");
    Harness {
        sink,
        trigger,
        handler,
    }
}
