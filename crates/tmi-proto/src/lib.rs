//! # tmi-proto
//!
//! I/O-free building blocks for talking to a Twitch chat server (TMI), the
//! IRC dialect that adds capability-negotiated message tags.
//!
//! - [`FrameBuffer`]: accumulates raw bytes and slices out complete lines,
//!   refusing lines longer than its capacity.
//! - [`Message`]: a decoded inbound line (tags, sender, command, recipient, body).
//! - [`Command`]: an outbound command that renders to its wire form.
//!
//! ## Decoding
//!
//! ```rust
//! use tmi_proto::Message;
//!
//! let raw = "@badge-info=;display-name=Foo :foo!foo@foo.tmi.twitch.tv PRIVMSG #bar :hi";
//! let msg = Message::parse(raw).expect("non-empty line");
//!
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.recipient.as_deref(), Some("#bar"));
//! assert_eq!(msg.body.as_deref(), Some("hi"));
//! assert_eq!(msg.tag("display-name").as_deref(), Some("Foo"));
//! ```
//!
//! ## Framing
//!
//! ```rust
//! use tmi_proto::FrameBuffer;
//!
//! let mut frames = FrameBuffer::new();
//! frames.push(b"PING :tmi.twi").unwrap();
//! assert!(frames.take_line().unwrap().is_none());
//!
//! frames.push(b"tch.tv\r\n").unwrap();
//! assert_eq!(frames.take_line().unwrap().as_deref(), Some("PING :tmi.twitch.tv"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod frame;
pub mod message;

pub use self::command::Command;
pub use self::error::{MessageParseError, ProtocolError};
pub use self::frame::FrameBuffer;
pub use self::message::Message;

/// Maximum length of one inbound frame, delimiter included.
pub const MAX_LINE_LEN: usize = 2048;

/// Maximum length of one outbound command, CRLF included.
pub const MAX_COMMAND_LEN: usize = 1024;

/// Capabilities requested right after the welcome reply.
pub const DEFAULT_CAPABILITIES: &[&str] = &["twitch.tv/tags", "twitch.tv/commands"];

/// Numeric replies the client waits on. Numerics stay opaque strings and are
/// compared by exact equality.
pub mod numeric {
    /// RPL_WELCOME
    pub const RPL_WELCOME: &str = "001";
    /// RPL_ENDOFMOTD, the legacy end-of-registration marker.
    pub const RPL_ENDOFMOTD: &str = "376";
    /// RPL_ENDOFNAMES, sent once a JOIN has completed.
    pub const RPL_ENDOFNAMES: &str = "366";
}
