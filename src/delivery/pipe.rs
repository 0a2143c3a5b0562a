//! Named pipes: messages to one FIFO, chat lines from another.

use std::io;
use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::net::unix::pipe;
use tracing::info;

use super::{InputFeed, LineSink, input_feed};

/// Sink writing to a named pipe.
pub type PipeSink = LineSink<File>;

impl PipeSink {
    /// Open `path` for writing.
    ///
    /// The open blocks until a reader has the pipe open; `tokio::fs` runs it
    /// on the blocking pool so the runtime keeps going meanwhile.
    pub async fn open(path: &Path) -> io::Result<Self> {
        info!(path = %path.display(), "Waiting for a reader on output pipe");
        let file = OpenOptions::new().write(true).open(path).await?;
        Ok(LineSink::new(file))
    }
}

/// Chat lines written into the named pipe at `path`.
///
/// On Linux the pipe is held open for writing as well, so the feed survives
/// writers coming and going.
pub fn pipe_feed(path: &Path) -> io::Result<InputFeed> {
    let mut options = pipe::OpenOptions::new();
    #[cfg(target_os = "linux")]
    options.read_write(true);
    let receiver = options.open_receiver(path)?;
    Ok(input_feed(receiver))
}
