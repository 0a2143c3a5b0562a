//! Transport setup.

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

use super::ByteStream;

/// Opens the byte stream a [`Connection`](super::Connection) runs over.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `host:port`.
    async fn connect(&self, host: &str, port: u16) -> std::io::Result<Box<dyn ByteStream>>;
}

/// Plaintext TCP with keepalive enabled.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector;

impl TcpConnector {
    fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
        let sock = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(Duration::from_secs(120))
            .with_interval(Duration::from_secs(30));

        sock.set_tcp_keepalive(&keepalive)
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &str, port: u16) -> std::io::Result<Box<dyn ByteStream>> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Self::enable_keepalive(&stream)?;
        debug!(host = %host, port = port, peer = ?stream.peer_addr().ok(), "TCP connected");
        Ok(Box::new(stream))
    }
}
