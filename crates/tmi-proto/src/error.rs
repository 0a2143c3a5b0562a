//! Error types for framing and decoding.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// A frame grew past the buffer capacity before its delimiter arrived.
    ///
    /// The connection that produced it cannot be resynchronised and has to be
    /// dropped.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong {
        /// Bytes accumulated for the offending frame.
        actual: usize,
        /// Buffer capacity.
        limit: usize,
    },

    /// Failed to decode a line into a [`Message`](crate::Message).
    #[error("invalid message: {string:?}")]
    InvalidMessage {
        /// The raw line.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered when decoding a line.
///
/// Short or oddly shaped lines are not errors; they decode into a partially
/// populated message. Only a line with nothing in it is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// The line was empty or whitespace only.
    #[error("empty message")]
    EmptyMessage,
}
