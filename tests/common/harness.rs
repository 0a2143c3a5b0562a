//! In-memory collaborators for driving the event loop.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tmi_relay::config::Config;
use tmi_relay::delivery::Sink;
use tmi_relay::network::{ByteStream, Connector};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf, duplex};
use tokio::sync::mpsc;

use super::MockServer;

/// Hands out one queued in-memory stream per connect. Refuses once the queue
/// is empty.
pub struct DuplexConnector {
    streams: Mutex<VecDeque<Box<dyn ByteStream>>>,
    attempts: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl DuplexConnector {
    /// A connector with `n` queued streams and the servers on their far ends.
    pub fn with_servers(n: usize) -> (Self, Vec<MockServer<DuplexStream>>) {
        let (connector, servers, _) = Self::with_breakable_servers(n);
        (connector, servers)
    }

    /// Like [`with_servers`](Self::with_servers), plus one switch per
    /// stream that makes every later client write fail.
    pub fn with_breakable_servers(
        n: usize,
    ) -> (Self, Vec<MockServer<DuplexStream>>, Vec<Arc<AtomicBool>>) {
        let mut streams: VecDeque<Box<dyn ByteStream>> = VecDeque::with_capacity(n);
        let mut servers = Vec::with_capacity(n);
        let mut switches = Vec::with_capacity(n);
        for _ in 0..n {
            let (client, server) = duplex(16 * 1024);
            let broken = Arc::new(AtomicBool::new(false));
            streams.push_back(Box::new(BreakableStream {
                inner: client,
                broken: Arc::clone(&broken),
            }));
            servers.push(MockServer::new(server));
            switches.push(broken);
        }
        let connector = Self {
            streams: Mutex::new(streams),
            attempts: Arc::new(AtomicUsize::new(0)),
        };
        (connector, servers, switches)
    }

    /// Shared count of connect calls.
    pub fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait]
impl Connector for DuplexConnector {
    async fn connect(&self, _host: &str, _port: u16) -> io::Result<Box<dyn ByteStream>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.streams.lock().unwrap().pop_front();
        next.ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused))
    }
}

/// Client end whose writes fail with `BrokenPipe` once `broken` is set.
/// Reads are untouched.
struct BreakableStream {
    inner: DuplexStream,
    broken: Arc<AtomicBool>,
}

impl AsyncRead for BreakableStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for BreakableStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.broken.load(Ordering::SeqCst) {
            return Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Sink forwarding every delivered line to a channel.
pub struct ChannelSink(mpsc::UnboundedSender<String>);

#[allow(dead_code)]
impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

#[async_trait]
impl Sink for ChannelSink {
    async fn emit(&mut self, line: &str) -> io::Result<()> {
        self.0
            .send(line.to_string())
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))
    }
}

/// Configuration for tests: short timeouts and a fast, small retry budget.
#[allow(dead_code)]
pub fn test_config() -> Config {
    toml::from_str(
        r##"
        [server]
        host = "irc.test"
        port = 6667

        [identity]
        user = "relaybot"
        password = "oauth:secret"
        channel = "bar"

        [handshake]
        timeout_secs = 5
        receive_timeout_secs = 5

        [reconnect]
        initial_delay_ms = 1
        max_delay_secs = 1
        max_attempts = 2

        [[responders]]
        trigger = "!ping"
        reply = "pong"
        "##,
    )
    .unwrap()
}
