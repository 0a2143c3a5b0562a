//! A single server connection.
//!
//! [`Connection`] owns the byte stream, a [`FrameBuffer`] and the liveness
//! flag. Reads come in three flavours:
//! - [`Connection::ready`] waits until a line is buffered or bytes arrive;
//!   used inside the event loop's `select!`.
//! - [`Connection::try_next_message`] never waits; used to drain.
//! - [`Connection::wait_next_message`] waits with a receive timeout; used by
//!   the handshake.
//!
//! Any transport or framing failure clears the liveness flag. The owner then
//! replaces the connection.

use std::time::Duration;

use bytes::BytesMut;
use futures_util::FutureExt;
use tmi_proto::{Command, FrameBuffer, MAX_COMMAND_LEN, Message};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::error::ConnectionError;

/// Receive timeout used when none is configured.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(20);

/// A duplex byte stream a [`Connection`] can run over.
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ByteStream for T {}

/// One live connection to the chat server.
pub struct Connection {
    stream: Box<dyn ByteStream>,
    frames: FrameBuffer,
    connected: bool,
    receive_timeout: Duration,
}

impl Connection {
    /// Wrap an already established stream.
    pub fn new<S: ByteStream + 'static>(stream: S) -> Self {
        Self::from_boxed(Box::new(stream))
    }

    /// Wrap a stream returned by a [`Connector`](super::Connector).
    pub fn from_boxed(stream: Box<dyn ByteStream>) -> Self {
        Self {
            stream,
            frames: FrameBuffer::new(),
            connected: true,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }

    /// Set the per-read timeout used by [`wait_next_message`](Self::wait_next_message).
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Replace the frame buffer, e.g. to use a smaller capacity.
    pub fn with_frame_buffer(mut self, frames: FrameBuffer) -> Self {
        self.frames = frames;
        self
    }

    /// Whether the connection is still believed to be alive.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Send one line.
    ///
    /// Anything from the first CR or LF on is dropped so a caller cannot
    /// smuggle a second command, the line is cut to fit the protocol limit,
    /// and CRLF is appended.
    pub async fn send(&mut self, line: &str) -> Result<(), ConnectionError> {
        if !self.connected {
            return Err(ConnectionError::Closed);
        }

        let wire = frame_outbound(line);
        let result = async {
            self.stream.write_all(&wire).await?;
            self.stream.flush().await
        }
        .await;

        if let Err(e) = result {
            warn!(error = %e, "Send failed, marking connection down");
            self.connected = false;
            return Err(ConnectionError::Io(e));
        }
        Ok(())
    }

    /// Send a [`Command`]. Only the verb is logged.
    pub async fn send_command(&mut self, command: &Command) -> Result<(), ConnectionError> {
        debug!(verb = command.verb(), "Sending command");
        self.send(&command.to_string()).await
    }

    /// Wait until a message may be available: a complete line is already
    /// buffered, or the stream delivered more bytes.
    ///
    /// Cancel-safe: dropping the future loses no data. While disconnected
    /// this never resolves, so a `select!` arm built on it stays idle.
    pub async fn ready(&mut self) -> Result<(), ConnectionError> {
        if !self.connected {
            return std::future::pending().await;
        }
        if self.frames.has_line() {
            return Ok(());
        }
        self.fill().await.map(|_| ())
    }

    /// Return the next complete message without waiting.
    ///
    /// Buffered lines come first. Otherwise one read is attempted; if it
    /// would block, nothing changes and `Ok(None)` is returned. End of stream
    /// also yields `Ok(None)` and clears the liveness flag. Lines that fail to
    /// decode are skipped.
    pub fn try_next_message(&mut self) -> Result<Option<Message>, ConnectionError> {
        if let Some(msg) = self.next_buffered_message()? {
            return Ok(Some(msg));
        }
        if !self.connected {
            return Ok(None);
        }

        match self.fill().now_or_never() {
            None | Some(Ok(0)) => Ok(None),
            Some(Ok(_)) => self.next_buffered_message(),
            Some(Err(e)) => Err(e),
        }
    }

    /// Wait for the next complete message.
    ///
    /// Every read is bounded by the receive timeout. Decode failures, the
    /// timeout, end of stream and I/O errors are all returned as errors.
    pub async fn wait_next_message(&mut self) -> Result<Message, ConnectionError> {
        loop {
            if let Some(line) = self.next_line()? {
                trace!(line = %line, "Received line");
                return line.parse::<Message>().map_err(ConnectionError::from);
            }
            if !self.connected {
                return Err(ConnectionError::Closed);
            }

            match tokio::time::timeout(self.receive_timeout, self.fill()).await {
                Err(_) => return Err(ConnectionError::Timeout(self.receive_timeout)),
                Ok(Ok(0)) => return Err(ConnectionError::Closed),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(e),
            }
        }
    }

    /// Best-effort shutdown of the stream.
    pub async fn close(&mut self) {
        self.connected = false;
        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "Shutdown failed");
        }
    }

    /// Read once into the frame buffer, returning the byte count.
    ///
    /// Reads no more than the buffer has room for.
    async fn fill(&mut self) -> Result<usize, ConnectionError> {
        let mut chunk = BytesMut::zeroed(self.frames.spare().max(1));
        let n = match self.stream.read(&mut chunk).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Read failed, marking connection down");
                self.connected = false;
                return Err(ConnectionError::Io(e));
            }
        };

        if n == 0 {
            debug!("Server closed the connection");
            self.connected = false;
            return Ok(0);
        }

        if let Err(e) = self.frames.push(&chunk[..n]) {
            warn!(error = %e, "Framing overflow, marking connection down");
            self.connected = false;
            self.frames.clear();
            return Err(ConnectionError::Protocol(e));
        }
        Ok(n)
    }

    fn next_line(&mut self) -> Result<Option<String>, ConnectionError> {
        self.frames.take_line().map_err(|e| {
            warn!(error = %e, "Oversized line, marking connection down");
            self.connected = false;
            self.frames.clear();
            ConnectionError::Protocol(e)
        })
    }

    fn next_buffered_message(&mut self) -> Result<Option<Message>, ConnectionError> {
        while let Some(line) = self.next_line()? {
            match Message::parse(&line) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => debug!(error = %e, line = %line, "Skipping undecodable line"),
            }
        }
        Ok(None)
    }
}

/// Build the bytes written for `line`: cut at CR/LF, capped, CRLF-terminated.
fn frame_outbound(line: &str) -> Vec<u8> {
    let line = match line.find(['\r', '\n']) {
        Some(pos) => &line[..pos],
        None => line,
    };

    let limit = MAX_COMMAND_LEN - 2;
    let mut end = line.len().min(limit);
    while !line.is_char_boundary(end) {
        end -= 1;
    }

    let mut wire = Vec::with_capacity(end + 2);
    wire.extend_from_slice(&line.as_bytes()[..end]);
    wire.extend_from_slice(b"\r\n");
    wire
}
