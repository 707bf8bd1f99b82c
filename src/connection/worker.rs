//! Background thread flushing the session buffer on every tick.

use std::{
    io,
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam_channel::{Receiver, Sender, bounded, select};
use log::{debug, warn};

use crate::error::ProxyError;

/// Handle to a running flush thread.
pub(crate) struct FlushWorker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Spawn a thread calling `flush` whenever `ticks` fires.
///
/// Flush errors are logged and the loop carries on. The loop exits when
/// [`FlushWorker::stop`] is called or the ticker is dropped.
pub(crate) fn spawn_flush_worker<F>(ticks: Receiver<Instant>, flush: F) -> io::Result<FlushWorker>
where
    F: Fn() -> Result<(), ProxyError> + Send + 'static,
{
    let (stop_tx, stop_rx) = bounded(1);
    let handle = thread::Builder::new()
        .name("proxy-flush".into())
        .spawn(move || flush_loop(&ticks, &stop_rx, flush))?;
    Ok(FlushWorker {
        stop: stop_tx,
        handle,
    })
}

fn flush_loop<F>(ticks: &Receiver<Instant>, stop: &Receiver<()>, flush: F)
where
    F: Fn() -> Result<(), ProxyError>,
{
    loop {
        select! {
            recv(ticks) -> tick => {
                if tick.is_err() {
                    debug!("flush ticker stopped; exiting flush worker");
                    return;
                }
                if let Err(err) = flush() {
                    warn!("{err}");
                }
            }
            recv(stop) -> _ => return,
        }
    }
}

impl FlushWorker {
    /// Signal the thread to exit and wait for it.
    pub(crate) fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            warn!("proxy flush worker panicked");
        }
    }
}
