//! Response Sinks
//!
//! A [`ResponseSink`] is the only way a command reaches the client: it
//! buffers reply values, flushes them, and closes the connection when a
//! reply cannot be delivered. The command layer never builds wire bytes
//! itself.

use crate::protocol::RespValue;
use async_trait::async_trait;
use bytes::BytesMut;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{trace, warn};

/// A reply could not be written or flushed. Terminal for the connection.
#[derive(Debug, Error)]
#[error("failed to write reply: {0}")]
pub struct ReplyError(#[from] pub io::Error);

/// Output side of a client connection.
#[async_trait]
pub trait ResponseSink: Send {
    /// Buffers a reply value.
    fn write_value(&mut self, value: &RespValue) -> io::Result<()>;

    fn write_integer(&mut self, n: i64) -> io::Result<()> {
        self.write_value(&RespValue::integer(n))
    }

    fn write_error_text(&mut self, msg: &str) -> io::Result<()> {
        self.write_value(&RespValue::error(msg))
    }

    /// Sends everything buffered so far.
    async fn flush(&mut self) -> io::Result<()>;

    /// Closes the connection after a failed write.
    async fn close_on_error(&mut self, err: &io::Error);
}

/// Writes `value` and flushes it, closing the sink if either step fails.
pub async fn send_reply(sink: &mut dyn ResponseSink, value: &RespValue) -> Result<(), ReplyError> {
    let result = match sink.write_value(value) {
        Ok(()) => sink.flush().await,
        Err(e) => Err(e),
    };
    close_if_failed(sink, result).await
}

/// Closes `sink` if `result` is an error and converts it into a [`ReplyError`].
pub async fn close_if_failed(
    sink: &mut dyn ResponseSink,
    result: io::Result<()>,
) -> Result<(), ReplyError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            sink.close_on_error(&e).await;
            Err(ReplyError(e))
        }
    }
}

/// Sink over an async byte stream (normally the write half of a socket).
pub struct ConnectionWriter<W> {
    stream: BufWriter<W>,
    out: BytesMut,
    closed: bool,
    bytes_written: usize,
}

impl<W: AsyncWrite + Unpin + Send> ConnectionWriter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            stream: BufWriter::new(stream),
            out: BytesMut::with_capacity(4096),
            closed: false,
            bytes_written: 0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes flushed since the last call, for connection statistics.
    pub fn take_bytes_written(&mut self) -> usize {
        std::mem::take(&mut self.bytes_written)
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ResponseSink for ConnectionWriter<W> {
    fn write_value(&mut self, value: &RespValue) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "connection closed"));
        }
        value.write_to(&mut self.out);
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "connection closed"));
        }
        let pending = self.out.split();
        self.stream.write_all(&pending).await?;
        self.stream.flush().await?;
        self.bytes_written += pending.len();
        trace!(bytes = pending.len(), "Sent response");
        Ok(())
    }

    async fn close_on_error(&mut self, err: &io::Error) {
        warn!(error = %err, "Closing connection after failed reply");
        self.closed = true;
        self.out.clear();
        // Shut down the raw stream; flushing the buffer would fail again.
        let _ = self.stream.get_mut().shutdown().await;
    }
}

/// In-memory sink that records every flushed reply.
///
/// Useful for driving command listeners without a socket.
#[derive(Debug, Default)]
pub struct BufferedSink {
    pending: Vec<RespValue>,
    /// Replies that have been flushed, in order
    pub replies: Vec<RespValue>,
    /// Number of flush calls
    pub flushes: usize,
    /// Set once `close_on_error` has been called
    pub closed: bool,
    /// Makes every flush fail, to exercise the close path
    pub fail_flush: bool,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose flushes always fail.
    pub fn failing() -> Self {
        Self {
            fail_flush: true,
            ..Self::default()
        }
    }

    /// The last flushed reply, if any.
    pub fn last(&self) -> Option<&RespValue> {
        self.replies.last()
    }
}

#[async_trait]
impl ResponseSink for BufferedSink {
    fn write_value(&mut self, value: &RespValue) -> io::Result<()> {
        self.pending.push(value.clone());
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        if self.fail_flush {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "flush failed"));
        }
        self.flushes += 1;
        self.replies.append(&mut self.pending);
        Ok(())
    }

    async fn close_on_error(&mut self, _err: &io::Error) {
        self.closed = true;
        self.pending.clear();
    }
}
