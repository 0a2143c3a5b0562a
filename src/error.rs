//! Error hierarchy for the relay.
//!
//! Three layers, each wrapping the one below:
//! - [`ConnectionError`]: transport and framing failures on one connection.
//! - [`HandshakeError`]: a connection attempt that never became ready.
//! - [`ClientError`]: conditions that end the event loop.

use std::time::Duration;

use thiserror::Error;
use tmi_proto::ProtocolError;

use crate::network::HandshakeState;

// ============================================================================
// Connection Errors
// ============================================================================

/// Errors raised by a single [`Connection`](crate::network::Connection).
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("transport failure: {0}")]
    Io(#[from] std::io::Error),

    /// Framing overflow or an undecodable line.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("connection closed")]
    Closed,

    #[error("nothing received for {0:?}")]
    Timeout(Duration),
}

impl ConnectionError {
    /// Get a static error code string for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "transport_failure",
            Self::Protocol(ProtocolError::LineTooLong { .. }) => "framing_overflow",
            Self::Protocol(_) => "decode_failure",
            Self::Closed => "closed",
            Self::Timeout(_) => "timeout",
        }
    }
}

// ============================================================================
// Handshake Errors
// ============================================================================

/// Failure to bring a fresh connection to the ready state.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("connection failed during handshake: {0}")]
    Connection(#[from] ConnectionError),

    #[error("handshake timed out while in {state:?}")]
    TimedOut { state: HandshakeState },

    /// The server refused the credentials. Retrying cannot help.
    #[error("login rejected: {0}")]
    Rejected(String),

    #[error("server error: {0}")]
    Server(String),
}

// ============================================================================
// Client Errors
// ============================================================================

/// Fatal conditions that stop the event loop.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },
}

impl ClientError {
    /// Whether another connection attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connect { .. } => true,
            Self::Handshake(HandshakeError::Rejected(_)) => false,
            Self::Handshake(_) => true,
            Self::ReconnectExhausted { .. } => false,
        }
    }
}
