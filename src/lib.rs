//! tmi-relay - persistent Twitch chat client.
//!
//! Keeps one connection to a Twitch chat server, joins one channel, answers
//! keepalives, runs chat command responders and relays every decoded message
//! to a local sink. Lines read from the input feeds are posted to the channel.

pub mod config;
pub mod delivery;
pub mod error;
pub mod network;
pub mod responders;
pub mod telemetry;

pub use error::{ClientError, ConnectionError, HandshakeError};
pub use network::{Connection, EventLoop};
