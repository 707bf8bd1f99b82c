//! All-or-nothing writes over sinks that may accept partial buffers.
//!
//! A socket `write` can return after transmitting only part of the buffer.
//! [`ResilientWriter`] keeps writing the remaining suffix until the whole
//! buffer is accepted or the sink reports an error, so the `BufWriter`
//! stacked on top only ever sees complete success or failure.

use std::io::{self, Write};

use log::warn;

/// `Write` adapter that retries short writes until the buffer is consumed.
#[derive(Debug)]
pub struct ResilientWriter<W> {
    inner: W,
}

impl<W: Write> ResilientWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Borrow the wrapped sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the wrapped sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Unwrap the sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ResilientWriter<W> {
    /// Write the whole of `buf` or fail.
    ///
    /// Any error from the sink aborts the call, even if part of `buf` was
    /// already transmitted. A sink that accepts zero bytes is reported as
    /// [`io::ErrorKind::WriteZero`].
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut remaining = buf;
        while !remaining.is_empty() {
            let n = self.inner.write(remaining)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "proxy sink accepted zero bytes",
                ));
            }
            remaining = &remaining[n.min(remaining.len())..];
            if !remaining.is_empty() {
                warn!("short write to proxy: n={n}, remaining={}", remaining.len());
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
