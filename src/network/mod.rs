//! Network module.
//!
//! Contains the Connection, the Connector that opens it, the registration
//! handshake, reconnect backoff and the EventLoop that ties them together.

mod connection;
mod connector;
pub mod event_loop;
pub mod handshake;
mod reconnect;

pub use connection::{ByteStream, Connection};
pub use connector::{Connector, TcpConnector};
pub use event_loop::EventLoop;
pub use handshake::{HandshakeConfig, HandshakeState};
pub use reconnect::{Backoff, ReconnectPolicy};
