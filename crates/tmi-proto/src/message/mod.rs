//! Decoded inbound messages.

mod parse;
mod serialize;
/// IRCv3 tag utilities.
pub mod tags;

use self::tags::unescape_tag_value;

/// One decoded protocol line.
///
/// Fields map onto the positional layout Twitch uses:
/// `[@tags] [:sender] command [recipient] [:body]`.
///
/// A `PING` line is the exception: only `command` and `sender` are populated,
/// and `sender` carries the exact remainder of the line so the reply can echo
/// it verbatim.
///
/// # Example
///
/// ```
/// use tmi_proto::Message;
///
/// let ping = Message::parse("PING :tmi.twitch.tv").unwrap();
/// assert!(ping.is_ping());
/// assert_eq!(ping.sender.as_deref(), Some(":tmi.twitch.tv"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    /// Raw tag block including its leading `@`.
    pub tags: Option<String>,
    /// Origin prefix without its leading `:`, or the ping token.
    pub sender: Option<String>,
    /// Verb or three-digit numeric. Empty when the line carried none.
    pub command: String,
    /// First parameter, usually a channel.
    pub recipient: Option<String>,
    /// Trailing text with one leading `:` removed.
    pub body: Option<String>,
}

impl Message {
    /// Build the `PING` shape: command plus the token to echo.
    pub fn ping(token: impl Into<String>) -> Self {
        Self {
            command: "PING".to_string(),
            sender: Some(token.into()),
            ..Self::default()
        }
    }

    /// Whether this is a server keepalive PING.
    pub fn is_ping(&self) -> bool {
        self.command == "PING"
    }

    /// Whether this is a chat message.
    pub fn is_privmsg(&self) -> bool {
        self.command == "PRIVMSG"
    }

    /// Nickname part of a `nick!user@host` sender.
    pub fn source_nick(&self) -> Option<&str> {
        if self.is_ping() {
            return None;
        }
        self.sender
            .as_deref()
            .and_then(|s| s.split_once('!'))
            .map(|(nick, _)| nick)
            .filter(|nick| !nick.is_empty())
    }

    /// Best name to address the sender by: the `display-name` tag, falling
    /// back to the nickname.
    pub fn display_name(&self) -> Option<String> {
        self.tag("display-name")
            .filter(|name| !name.is_empty())
            .or_else(|| self.source_nick().map(str::to_string))
    }

    /// Iterate raw `(key, value)` pairs of the tag block.
    ///
    /// Values are returned as they appear on the wire. A key without `=`
    /// yields an empty value.
    pub fn tags_iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags
            .as_deref()
            .map(|raw| raw.strip_prefix('@').unwrap_or(raw))
            .unwrap_or("")
            .split(';')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
    }

    /// Look up a tag by exact key, unescaping its value.
    pub fn tag(&self, key: &str) -> Option<String> {
        self.tags_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| unescape_tag_value(v))
    }

    /// Whether the tag `key` exists and its value contains `needle`.
    ///
    /// Handy for badge checks such as `tag_contains("badges", "moderator")`.
    pub fn tag_contains(&self, key: &str, needle: &str) -> bool {
        self.tag(key).is_some_and(|value| value.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged() -> Message {
        Message::parse(
            "@badge-info=;badges=moderator/1,subscriber/12;display-name=Foo;flag;system-msg=hello\\sthere :foo!foo@foo.tmi.twitch.tv PRIVMSG #bar :hi",
        )
        .unwrap()
    }

    #[test]
    fn test_tag_lookup_is_exact() {
        let msg = tagged();
        assert_eq!(msg.tag("badges").as_deref(), Some("moderator/1,subscriber/12"));
        assert_eq!(msg.tag("badge-info").as_deref(), Some(""));
        assert_eq!(msg.tag("badge"), None);
        assert_eq!(msg.tag("flag").as_deref(), Some(""));
    }

    #[test]
    fn test_tag_value_is_unescaped() {
        assert_eq!(tagged().tag("system-msg").as_deref(), Some("hello there"));
    }

    #[test]
    fn test_tag_contains() {
        let msg = tagged();
        assert!(msg.tag_contains("badges", "moderator"));
        assert!(!msg.tag_contains("badges", "broadcaster"));
        assert!(!msg.tag_contains("missing", ""));
    }

    #[test]
    fn test_tags_iter_without_tags() {
        let msg = Message::parse(":tmi.twitch.tv 001 bot :Welcome").unwrap();
        assert_eq!(msg.tags_iter().count(), 0);
    }

    #[test]
    fn test_source_nick_and_display_name() {
        let msg = tagged();
        assert_eq!(msg.source_nick(), Some("foo"));
        assert_eq!(msg.display_name().as_deref(), Some("Foo"));

        let untagged = Message::parse(":baz!baz@baz.tmi.twitch.tv PRIVMSG #bar :yo").unwrap();
        assert_eq!(untagged.display_name().as_deref(), Some("baz"));

        let server = Message::parse(":tmi.twitch.tv 001 bot :Welcome").unwrap();
        assert_eq!(server.source_nick(), None);
    }

    #[test]
    fn test_ping_has_no_source_nick() {
        let ping = Message::ping("a!b@c");
        assert_eq!(ping.source_nick(), None);
    }
}
