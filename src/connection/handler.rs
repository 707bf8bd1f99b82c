//! Connection handler holding one long-lived link to a proxy.

use std::{
    any::Any,
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::{
    error::ProxyError, handler::ConnectionHandler, rate_limited_warner::RateLimitedWarner,
    ticker::FlushTicker,
};

use super::{
    config::ConnectionConfig,
    session::ActiveSession,
    transport,
    worker::{FlushWorker, spawn_flush_worker},
};

/// Observable lifecycle stage of a [`ProxyConnectionHandler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerState {
    /// Neither started nor connected.
    Uninitialized,
    /// The flush worker runs but no connection was ever made.
    Started,
    /// A session is held.
    Connected,
    /// A session was held and has since been dropped.
    Disconnected,
    /// `close` has run; the handler cannot be reused.
    Closed,
}

/// State shared between callers and the flush worker.
struct Link {
    config: ConnectionConfig,
    session: RwLock<Option<ActiveSession>>,
    sessions_opened: AtomicU64,
    failures: AtomicU64,
    warner: RateLimitedWarner,
    #[cfg(any(test, feature = "test-util"))]
    inject_fault: AtomicBool,
}

impl Link {
    fn new(config: ConnectionConfig) -> Self {
        Self {
            warner: RateLimitedWarner::new(config.warn_interval),
            config,
            session: RwLock::new(None),
            sessions_opened: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            #[cfg(any(test, feature = "test-util"))]
            inject_fault: AtomicBool::new(false),
        }
    }

    fn address(&self) -> &str {
        &self.config.address
    }

    fn connect(&self) -> Result<(), ProxyError> {
        let mut slot = self.session.write();
        if let Some(previous) = slot.take() {
            if let Err(err) = previous.flush() {
                warn!(
                    "flush before reconnecting to {} failed: {err}",
                    self.address()
                );
            }
            previous.close();
        }

        let stream = transport::dial(self.address(), self.config.connect_timeout)
            .map_err(|source| self.connect_error(source))?;
        let id = self.sessions_opened.fetch_add(1, Ordering::AcqRel) + 1;
        let session = ActiveSession::open(id, stream, &self.config)
            .map_err(|source| self.connect_error(source))?;
        info!("connected to proxy at address: {}", self.address());
        *slot = Some(session);
        Ok(())
    }

    fn connect_error(&self, source: io::Error) -> ProxyError {
        ProxyError::Connect {
            address: self.config.address.clone(),
            source,
        }
    }

    fn connected(&self) -> bool {
        self.session.read().is_some()
    }

    fn flush(&self) -> Result<(), ProxyError> {
        let (id, source) = {
            let guard = self.session.read();
            let Some(session) = guard.as_ref() else {
                return Ok(());
            };
            match session.flush() {
                Ok(()) => return Ok(()),
                Err(source) => (session.id(), source),
            }
        };
        self.reset(id);
        Err(ProxyError::Flush {
            address: self.config.address.clone(),
            source,
        })
    }

    fn send_data(&self, lines: &str) -> Result<(), ProxyError> {
        let outcome = {
            let guard = self.session.read();
            let Some(session) = guard.as_ref() else {
                let err = ProxyError::NotConnected;
                self.note_send_failure(&err);
                return Err(err);
            };
            let id = session.id();
            panic::catch_unwind(AssertUnwindSafe(|| self.write_lines(session, lines)))
                .map_err(|payload| (id, panic_message(&*payload)))
        };

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                let err = ProxyError::Write(source);
                self.note_send_failure(&err);
                Err(err)
            }
            Err((id, message)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    "error sending data to proxy at {}: {message}",
                    self.address()
                );
                self.reset(id);
                Err(ProxyError::Fault(message))
            }
        }
    }

    fn write_lines(&self, session: &ActiveSession, lines: &str) -> io::Result<()> {
        self.trip_injected_fault();
        session.write_all(lines.as_bytes())
    }

    #[cfg(any(test, feature = "test-util"))]
    fn trip_injected_fault(&self) {
        if self.inject_fault.swap(false, Ordering::AcqRel) {
            panic!("injected send fault");
        }
    }

    #[cfg(not(any(test, feature = "test-util")))]
    fn trip_injected_fault(&self) {}

    fn note_send_failure(&self, err: &ProxyError) {
        self.warner.record();
        self.warner.warn_if_due(|count| {
            warn!(
                "{count} sends to proxy at {} failed; latest: {err}",
                self.address()
            );
        });
    }

    /// Drop session `id` if it is still the current one.
    fn reset(&self, id: u64) {
        let mut slot = self.session.write();
        if slot.as_ref().is_some_and(|session| session.id() == id) {
            warn!("resetting proxy connection to {}", self.address());
            if let Some(session) = slot.take() {
                session.close();
            }
        } else {
            debug!("session {id} to {} already replaced", self.address());
        }
    }

    fn release(&self) {
        if let Some(session) = self.session.write().take() {
            session.close();
        }
    }
}

/// Holds a single TCP connection to a proxy and streams metric text over it.
///
/// Writes accumulate in a per-connection buffer that a background thread
/// flushes on every tick of the supplied [`FlushTicker`]. A failed flush drops
/// the connection; the handler never reconnects on its own, callers decide
/// when to call [`connect`](Self::connect) again.
///
/// The handler is `Send + Sync` and is meant to be shared behind an `Arc`.
/// [`close`](Self::close) is terminal: once closed the handler cannot be
/// started or connected again.
pub struct ProxyConnectionHandler {
    link: Arc<Link>,
    ticker: Mutex<Option<FlushTicker>>,
    worker: Mutex<Option<FlushWorker>>,
    closed: AtomicBool,
}

impl ProxyConnectionHandler {
    /// Construct a handler from `config`, flushing on every tick of `ticker`.
    pub fn new(config: ConnectionConfig, ticker: FlushTicker) -> Self {
        Self {
            link: Arc::new(Link::new(config)),
            ticker: Mutex::new(Some(ticker)),
            worker: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Construct a handler for `address` using default settings.
    pub fn with_address(address: impl Into<String>, ticker: FlushTicker) -> Self {
        Self::new(ConnectionConfig::new(address), ticker)
    }

    /// The `host:port` this handler dials.
    pub fn address(&self) -> &str {
        self.link.address()
    }

    /// Spawn the background flush worker.
    ///
    /// Starting an already started handler logs a warning and does nothing.
    pub fn start(&self) -> Result<(), ProxyError> {
        let mut worker = self.worker.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(ProxyError::Closed);
        }
        if worker.is_some() {
            warn!("flush worker for {} already running", self.address());
            return Ok(());
        }
        let Some(ticks) = self.ticker.lock().as_ref().map(FlushTicker::receiver) else {
            return Err(ProxyError::Closed);
        };
        let link = Arc::clone(&self.link);
        let spawned = spawn_flush_worker(ticks, move || link.flush())
            .map_err(ProxyError::Worker)?;
        *worker = Some(spawned);
        Ok(())
    }

    /// Dial the proxy, replacing any existing connection.
    ///
    /// A connection that is still held is flushed on a best-effort basis and
    /// shut down first. On failure the handler is left disconnected; there is
    /// no retry.
    pub fn connect(&self) -> Result<(), ProxyError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProxyError::Closed);
        }
        self.link.connect()
    }

    /// Whether a connection is currently held.
    pub fn connected(&self) -> bool {
        self.link.connected()
    }

    /// Push buffered bytes to the socket.
    ///
    /// On error the connection is dropped before the error is returned, so
    /// later sends fail with [`ProxyError::NotConnected`] until the next
    /// successful [`connect`](Self::connect). Without a connection this is a
    /// no-op.
    pub fn flush(&self) -> Result<(), ProxyError> {
        self.link.flush()
    }

    /// Buffer already formatted metric text for delivery.
    ///
    /// Write errors are counted in [`failure_count`](Self::failure_count) but
    /// leave the connection in place; the next flush finds out whether the
    /// socket is still usable. A panic inside the write path is contained,
    /// counted, and drops the connection.
    pub fn send_data(&self, lines: &str) -> Result<(), ProxyError> {
        self.link.send_data(lines)
    }

    /// Cumulative number of sends that failed while connected.
    pub fn failure_count(&self) -> u64 {
        self.link.failures.load(Ordering::Relaxed)
    }

    /// Current lifecycle stage.
    pub fn state(&self) -> HandlerState {
        if self.closed.load(Ordering::Acquire) {
            HandlerState::Closed
        } else if self.connected() {
            HandlerState::Connected
        } else if self.link.sessions_opened.load(Ordering::Acquire) > 0 {
            HandlerState::Disconnected
        } else if self.worker.lock().is_some() {
            HandlerState::Started
        } else {
            HandlerState::Uninitialized
        }
    }

    /// Flush one last time, stop the worker and the ticker, release the socket.
    ///
    /// Single use: the handler must not be used after closing. Calling `close`
    /// again only logs at debug level.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!(
                "proxy connection handler for {} already closed",
                self.address()
            );
            return;
        }
        if let Err(err) = self.link.flush() {
            warn!("{err}");
        }
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.stop();
        }
        drop(self.ticker.lock().take());
        self.link.release();
        self.link.warner.flush(|count| {
            warn!(
                "{count} sends to proxy at {} failed before close",
                self.address()
            );
        });
    }

    /// Make the next `send_data` panic inside the write path.
    #[cfg(any(test, feature = "test-util"))]
    pub fn inject_send_fault(&self) {
        self.link.inject_fault.store(true, Ordering::Release);
    }
}

impl ConnectionHandler for ProxyConnectionHandler {
    fn start(&self) -> Result<(), ProxyError> {
        ProxyConnectionHandler::start(self)
    }

    fn connect(&self) -> Result<(), ProxyError> {
        ProxyConnectionHandler::connect(self)
    }

    fn connected(&self) -> bool {
        ProxyConnectionHandler::connected(self)
    }

    fn flush(&self) -> Result<(), ProxyError> {
        ProxyConnectionHandler::flush(self)
    }

    fn send_data(&self, lines: &str) -> Result<(), ProxyError> {
        ProxyConnectionHandler::send_data(self, lines)
    }

    fn failure_count(&self) -> u64 {
        ProxyConnectionHandler::failure_count(self)
    }

    fn close(&self) {
        ProxyConnectionHandler::close(self)
    }
}

impl Drop for ProxyConnectionHandler {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ProxyConnectionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConnectionHandler")
            .field("address", &self.address())
            .field("state", &self.state())
            .field("failures", &self.failure_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_owned()
    }
}
