//! Delivery of decoded messages and intake of outbound chat lines.
//!
//! - [`Sink`]: where every decoded message is written, one line each.
//! - [`InputFeed`]: a stream of lines to post to the channel.
//! - [`format`]: TSV and JSON renderings of a message.
//!
//! Three modes are wired up: standard streams ([`stdio`]), named pipes
//! ([`pipe`]) and session bus signals ([`bus`]).

pub mod bus;
pub mod format;
#[cfg(unix)]
pub mod pipe;
pub mod stdio;

use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

/// Longest accepted input line. A longer one is reported and ends the feed.
pub const MAX_INPUT_LINE: usize = 4096;

/// Destination for delivered messages.
#[async_trait]
pub trait Sink: Send {
    /// Write one serialized message.
    async fn emit(&mut self, line: &str) -> io::Result<()>;
}

/// Lines to post to the channel.
pub type InputFeed = Pin<Box<dyn Stream<Item = Result<String, LinesCodecError>> + Send>>;

/// Split `reader` into lines.
pub fn input_feed<R>(reader: R) -> InputFeed
where
    R: AsyncRead + Send + 'static,
{
    Box::pin(FramedRead::new(
        reader,
        LinesCodec::new_with_max_length(MAX_INPUT_LINE),
    ))
}

/// A [`Sink`] over any writer: each message becomes one `\n`-terminated line,
/// flushed immediately.
#[derive(Debug)]
pub struct LineSink<W> {
    writer: W,
}

impl<W> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Sink for LineSink<W> {
    async fn emit(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_line_sink_terminates_lines() {
        let mut sink = LineSink::new(Vec::new());
        sink.emit("a\tb").await.unwrap();
        sink.emit("c").await.unwrap();
        assert_eq!(sink.into_inner(), b"a\tb\nc\n");
    }

    #[tokio::test]
    async fn test_input_feed_splits_lines() {
        let mut feed = input_feed(&b"hello\r\nworld\n\nlast"[..]);

        assert_eq!(feed.next().await.unwrap().unwrap(), "hello");
        assert_eq!(feed.next().await.unwrap().unwrap(), "world");
        assert_eq!(feed.next().await.unwrap().unwrap(), "");
        assert_eq!(feed.next().await.unwrap().unwrap(), "last");
        assert!(feed.next().await.is_none());
    }

    #[tokio::test]
    async fn test_input_feed_reports_long_line() {
        let mut long = vec![b'x'; MAX_INPUT_LINE + 1];
        long.push(b'\n');
        let mut feed = input_feed(std::io::Cursor::new(long));

        assert!(matches!(
            feed.next().await,
            Some(Err(LinesCodecError::MaxLineLengthExceeded))
        ));
    }
}
