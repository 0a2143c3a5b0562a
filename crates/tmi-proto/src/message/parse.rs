//! Line decoder.
//!
//! Twitch lines are tokenised positionally on single spaces. Nothing is
//! validated: a short line leaves the trailing fields empty instead of
//! failing, since server output varies and the client ignores what it does
//! not understand.

use std::str::FromStr;

use super::Message;
use crate::error::{MessageParseError, ProtocolError};

/// Cursor over space-separated tokens, in the manner of `strsep`.
struct Tokens<'a> {
    rest: Option<&'a str>,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: Some(line) }
    }

    fn next_token(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        match rest.split_once(' ') {
            Some((token, tail)) => {
                self.rest = Some(tail);
                Some(token)
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }

    fn remainder(&mut self) -> Option<&'a str> {
        self.rest.take()
    }
}

fn non_empty(token: Option<&str>) -> Option<&str> {
    token.filter(|t| !t.is_empty())
}

/// If the command token is `PING`, return everything after it.
///
/// The command token is the first token, or the one following a leading tag
/// block.
fn ping_remainder(line: &str) -> Option<&str> {
    let after_tags = if line.starts_with('@') {
        line.split_once(' ')?.1
    } else {
        line
    };

    match after_tags.split_once(' ') {
        Some(("PING", rest)) => Some(rest),
        None if after_tags == "PING" => Some(""),
        _ => None,
    }
}

impl Message {
    /// Decode one line. A trailing `\r\n` is tolerated.
    ///
    /// Only a blank line is an error; every other input produces a message,
    /// possibly with empty fields.
    pub fn parse(line: &str) -> Result<Message, MessageParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        if let Some(token) = ping_remainder(line) {
            return Ok(Message::ping(token));
        }

        let mut tokens = Tokens::new(line);

        let tags = if line.starts_with('@') {
            non_empty(tokens.next_token()).map(str::to_string)
        } else {
            None
        };

        let sender = non_empty(tokens.next_token().map(|s| s.strip_prefix(':').unwrap_or(s)))
            .map(str::to_string);
        let command = tokens.next_token().unwrap_or_default().to_string();
        let recipient = non_empty(tokens.next_token()).map(str::to_string);
        let body = tokens
            .remainder()
            .map(|b| b.strip_prefix(':').unwrap_or(b).to_string());

        Ok(Message {
            tags,
            sender,
            command,
            recipient,
            body,
        })
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        Message::parse(s).map_err(|cause| ProtocolError::InvalidMessage {
            string: s.to_string(),
            cause,
        })
    }
}
