//! A live connection: the socket and the buffer in front of it.
//!
//! Socket and writer only ever exist together, so they are held as a single
//! value that the handler sets and clears atomically.

use std::{
    io::{self, BufWriter, Write},
    net::{Shutdown, TcpStream},
};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::resilient_writer::ResilientWriter;

use super::config::ConnectionConfig;

type SessionWriter = BufWriter<ResilientWriter<TcpStream>>;

pub(crate) struct ActiveSession {
    id: u64,
    stream: TcpStream,
    writer: Mutex<SessionWriter>,
}

impl ActiveSession {
    /// Wrap a freshly dialled stream.
    pub(crate) fn open(id: u64, stream: TcpStream, config: &ConnectionConfig) -> io::Result<Self> {
        stream.set_write_timeout(Some(config.write_timeout))?;
        let sink = stream.try_clone()?;
        Ok(Self {
            id,
            stream,
            writer: Mutex::new(BufWriter::with_capacity(
                config.buffer_capacity,
                ResilientWriter::new(sink),
            )),
        })
    }

    /// Identifies this session among all sessions opened by one handler.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Append `data` to the buffer, spilling to the socket when it fills.
    pub(crate) fn write_all(&self, data: &[u8]) -> io::Result<()> {
        self.writer.lock().write_all(data)
    }

    pub(crate) fn flush(&self) -> io::Result<()> {
        self.writer.lock().flush()
    }

    /// Release the socket, discarding anything still buffered.
    pub(crate) fn close(self) {
        let (_, unflushed) = self.writer.into_inner().into_parts();
        match unflushed {
            Ok(bytes) if !bytes.is_empty() => {
                warn!(
                    "discarding {} buffered bytes for session {}",
                    bytes.len(),
                    self.id
                );
            }
            Ok(_) => {}
            Err(_) => warn!(
                "discarding buffer of session {} after a panicked write",
                self.id
            ),
        }
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            debug!("proxy socket shutdown for session {}: {err}", self.id);
        }
    }
}
