//! Outbound commands.
//!
//! [`Command`] covers the handful of verbs a Twitch client sends. `Display`
//! renders the wire form without the line terminator; the connection appends
//! it.

use std::fmt::{self, Display, Formatter};

/// A command the client sends to the server.
#[derive(Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Command {
    /// `PASS password`
    Pass(String),
    /// `NICK nickname`
    Nick(String),
    /// `USER username 0 * :realname`
    User {
        /// Username parameter.
        username: String,
        /// Free-form real name.
        realname: String,
    },
    /// `CAP REQ :cap1 cap2 ...`
    CapReq(Vec<String>),
    /// `JOIN #channel`
    Join(String),
    /// `PRIVMSG target :text`
    Privmsg {
        /// Channel or nickname.
        target: String,
        /// Message text.
        text: String,
    },
    /// `PING [token]`, a client-side keepalive.
    Ping(String),
    /// `PONG [token]`, echoing the token of the PING being answered.
    Pong(String),
    /// `QUIT [:reason]`
    Quit(Option<String>),
    /// A pre-formatted line sent as is.
    Raw(String),
}

/// Prefix `name` with exactly one `#`.
pub fn channel_name(name: &str) -> String {
    format!("#{}", name.trim_start_matches('#'))
}

impl Command {
    /// `JOIN` for `channel`, with or without its leading `#`.
    pub fn join(channel: &str) -> Self {
        Command::Join(channel_name(channel))
    }

    /// `PRIVMSG` to a channel, with or without its leading `#`.
    pub fn privmsg(channel: &str, text: impl Into<String>) -> Self {
        Command::Privmsg {
            target: channel_name(channel),
            text: text.into(),
        }
    }

    /// Capability request for `caps`.
    pub fn cap_req<I, S>(caps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Command::CapReq(caps.into_iter().map(Into::into).collect())
    }

    /// The verb this command is sent as.
    pub fn verb(&self) -> &str {
        match self {
            Command::Pass(_) => "PASS",
            Command::Nick(_) => "NICK",
            Command::User { .. } => "USER",
            Command::CapReq(_) => "CAP",
            Command::Join(_) => "JOIN",
            Command::Privmsg { .. } => "PRIVMSG",
            Command::Ping(_) => "PING",
            Command::Pong(_) => "PONG",
            Command::Quit(_) => "QUIT",
            Command::Raw(line) => line.split(' ').next().unwrap_or_default(),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Command::Pass(p) => write!(f, "PASS {}", p),
            Command::Nick(n) => write!(f, "NICK {}", n),
            Command::User { username, realname } => {
                write!(f, "USER {} 0 * :{}", username, realname)
            }
            Command::CapReq(caps) => write!(f, "CAP REQ :{}", caps.join(" ")),
            Command::Join(c) => write!(f, "JOIN {}", c),
            Command::Privmsg { target, text } => write!(f, "PRIVMSG {} :{}", target, text),
            Command::Ping(token) if token.is_empty() => f.write_str("PING"),
            Command::Ping(token) => write!(f, "PING {}", token),
            Command::Pong(token) if token.is_empty() => f.write_str("PONG"),
            Command::Pong(token) => write!(f, "PONG {}", token),
            Command::Quit(Some(reason)) => write!(f, "QUIT :{}", reason),
            Command::Quit(None) => f.write_str("QUIT"),
            Command::Raw(line) => f.write_str(line),
        }
    }
}

// Written by hand so the password never reaches a log line.
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Command::Pass(_) => f.debug_tuple("Pass").field(&"<redacted>").finish(),
            Command::Nick(n) => f.debug_tuple("Nick").field(n).finish(),
            Command::User { username, realname } => f
                .debug_struct("User")
                .field("username", username)
                .field("realname", realname)
                .finish(),
            Command::CapReq(caps) => f.debug_tuple("CapReq").field(caps).finish(),
            Command::Join(c) => f.debug_tuple("Join").field(c).finish(),
            Command::Privmsg { target, text } => f
                .debug_struct("Privmsg")
                .field("target", target)
                .field("text", text)
                .finish(),
            Command::Ping(token) => f.debug_tuple("Ping").field(token).finish(),
            Command::Pong(token) => f.debug_tuple("Pong").field(token).finish(),
            Command::Quit(reason) => f.debug_tuple("Quit").field(reason).finish(),
            Command::Raw(line) => f.debug_tuple("Raw").field(line).finish(),
        }
    }
}
