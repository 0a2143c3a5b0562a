//! Standard streams: messages to stdout, chat lines from stdin.
//!
//! Stdin is read on a dedicated OS thread. A read parked on the runtime's
//! blocking pool would hold the runtime open at shutdown until the next line
//! arrived.

use std::io::{self, BufRead, BufReader};

use futures_util::stream;
use tokio::io::Stdout;
use tokio::sync::mpsc;
use tokio_util::codec::LinesCodecError;
use tracing::debug;

use super::{InputFeed, LineSink, MAX_INPUT_LINE};

/// Lines buffered between the reader thread and the event loop.
const FEED_DEPTH: usize = 64;

/// Sink writing to standard output.
pub type StdoutSink = LineSink<Stdout>;

impl StdoutSink {
    pub fn stdout() -> Self {
        LineSink::new(tokio::io::stdout())
    }
}

/// Chat lines typed on standard input.
pub fn stdin_feed() -> io::Result<InputFeed> {
    thread_feed(BufReader::new(io::stdin()))
}

/// Split a blocking reader into lines on its own thread.
///
/// The thread stops at end of input, on the first error, or once the feed is
/// dropped. A line longer than [`MAX_INPUT_LINE`] is reported and ends the
/// feed.
pub fn thread_feed<R>(reader: R) -> io::Result<InputFeed>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(FEED_DEPTH);
    std::thread::Builder::new()
        .name("stdin-reader".to_owned())
        .spawn(move || read_lines(reader, tx))?;

    Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })))
}

fn read_lines<R: BufRead>(mut reader: R, tx: mpsc::Sender<Result<String, LinesCodecError>>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let item = match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => decode_line(&mut buf),
            Err(e) => Err(LinesCodecError::Io(e)),
        };
        let last = item.is_err();
        if tx.blocking_send(item).is_err() {
            debug!("Input feed dropped, stopping reader");
            break;
        }
        if last {
            break;
        }
    }
}

fn decode_line(buf: &mut Vec<u8>) -> Result<String, LinesCodecError> {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() > MAX_INPUT_LINE {
        return Err(LinesCodecError::MaxLineLengthExceeded);
    }
    String::from_utf8(std::mem::take(buf))
        .map_err(|e| LinesCodecError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}
