//! Scripted chat server.
//!
//! Plays the server side of a connection line by line so tests can assert
//! on exactly what the client sends.

use std::time::Duration;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio::time::timeout;

pub const WELCOME: &str = ":tmi.twitch.tv 001 relaybot :Welcome, GLHF!\r\n";
pub const CAP_ACK: &str = ":tmi.twitch.tv CAP * ACK :twitch.tv/tags twitch.tv/commands\r\n";
pub const END_OF_NAMES: &str = ":relaybot.tmi.twitch.tv 366 relaybot #bar :End of /NAMES list\r\n";

/// Server end of one client connection.
pub struct MockServer<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
}

#[allow(dead_code)]
impl<S: AsyncRead + AsyncWrite> MockServer<S> {
    pub fn new(stream: S) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Write raw bytes. Line terminators are the caller's business.
    pub async fn send_raw(&mut self, data: &str) -> anyhow::Result<()> {
        self.writer.write_all(data.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive one line from the client, without its terminator.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive one line with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("client closed the connection");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Whether the client has closed its end.
    pub async fn is_closed(&mut self) -> bool {
        let mut line = String::new();
        matches!(
            timeout(Duration::from_secs(5), self.reader.read_line(&mut line)).await,
            Ok(Ok(0)) | Ok(Err(_))
        )
    }

    /// Separate reading from writing, e.g. to write from another task.
    pub fn into_split(self) -> (BufReader<ReadHalf<S>>, WriteHalf<S>) {
        (self.reader, self.writer)
    }

    /// Answer login up to the JOIN. Returns the four lines the client sent.
    pub async fn accept_login(&mut self) -> anyhow::Result<Vec<String>> {
        let mut received = vec![self.recv().await?, self.recv().await?];
        self.send_raw(WELCOME).await?;
        received.push(self.recv().await?);
        self.send_raw(CAP_ACK).await?;
        received.push(self.recv().await?);
        Ok(received)
    }

    /// Run a full handshake. `trailer` is written in the same chunk as the
    /// end of the names list.
    pub async fn complete_handshake(&mut self, trailer: &str) -> anyhow::Result<Vec<String>> {
        let received = self.accept_login().await?;
        self.send_raw(&format!("{END_OF_NAMES}{trailer}")).await?;
        Ok(received)
    }
}
