//! Serialization of delivered messages.

use serde::Serialize;
use tmi_proto::Message;

use crate::config::OutputFormat;

/// Render `msg` in the configured format, without a trailing newline.
pub fn render(format: OutputFormat, msg: &Message) -> String {
    match format {
        OutputFormat::Tsv => format_tsv(msg),
        OutputFormat::Json => format_json(msg),
    }
}

/// `tags \t sender [\t command] \t body`.
///
/// Missing fields are written empty; the command column is left out when
/// the line carried no command.
pub fn format_tsv(msg: &Message) -> String {
    let mut out = String::new();
    out.push_str(msg.tags.as_deref().unwrap_or_default());
    out.push('\t');
    out.push_str(msg.sender.as_deref().unwrap_or_default());
    if !msg.command.is_empty() {
        out.push('\t');
        out.push_str(&msg.command);
    }
    out.push('\t');
    out.push_str(msg.body.as_deref().unwrap_or_default());
    out
}

#[derive(Serialize)]
struct JsonMessage<'a> {
    tags: &'a str,
    sender: &'a str,
    command: &'a str,
    message: &'a str,
}

/// `{"tags":..,"sender":..,"command":..,"message":..}` with missing fields
/// as empty strings.
pub fn format_json(msg: &Message) -> String {
    let record = JsonMessage {
        tags: msg.tags.as_deref().unwrap_or_default(),
        sender: msg.sender.as_deref().unwrap_or_default(),
        command: &msg.command,
        message: msg.body.as_deref().unwrap_or_default(),
    };
    // A struct of string fields always serializes.
    serde_json::to_string(&record).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged() -> Message {
        Message::parse("@badge-info=;display-name=Foo :foo!foo@foo.tmi.twitch.tv PRIVMSG #bar :hi")
            .unwrap()
    }

    #[test]
    fn test_tsv() {
        assert_eq!(
            format_tsv(&tagged()),
            "@badge-info=;display-name=Foo\tfoo!foo@foo.tmi.twitch.tv\tPRIVMSG\thi"
        );
    }

    #[test]
    fn test_tsv_missing_fields() {
        let msg = Message::parse(":tmi.twitch.tv RECONNECT").unwrap();
        assert_eq!(format_tsv(&msg), "\ttmi.twitch.tv\tRECONNECT\t");

        let lonely = Message::parse("@only-tags").unwrap();
        assert_eq!(format_tsv(&lonely), "@only-tags\t\t");
    }

    #[test]
    fn test_json() {
        let json: serde_json::Value = serde_json::from_str(&format_json(&tagged())).unwrap();
        assert_eq!(json["tags"], "@badge-info=;display-name=Foo");
        assert_eq!(json["sender"], "foo!foo@foo.tmi.twitch.tv");
        assert_eq!(json["command"], "PRIVMSG");
        assert_eq!(json["message"], "hi");
    }

    #[test]
    fn test_json_escapes() {
        let msg = Message::parse(r#":a!a@a PRIVMSG #c :say "hi" \o/"#).unwrap();
        let line = format_json(&msg);
        assert!(line.contains(r#""message":"say \"hi\" \\o/""#));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_render_dispatches_on_format() {
        let msg = tagged();
        assert_eq!(render(OutputFormat::Tsv, &msg), format_tsv(&msg));
        assert_eq!(render(OutputFormat::Json, &msg), format_json(&msg));
    }
}
