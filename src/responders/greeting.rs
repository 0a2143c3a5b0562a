//! `$hi` greets the sender by name.

use async_trait::async_trait;
use tmi_proto::{Command, Message};

use super::{Responder, ResponderResult};
use crate::network::Connection;

const TRIGGER: &str = "$hi";

/// Replies `hi, <display name>` to `$hi`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Greeting;

#[async_trait]
impl Responder for Greeting {
    fn name(&self) -> &str {
        "greeting"
    }

    fn matches(&self, msg: &Message) -> bool {
        msg.is_privmsg() && msg.body.as_deref() == Some(TRIGGER)
    }

    async fn handle(&self, conn: &mut Connection, msg: &Message) -> ResponderResult {
        let (Some(target), Some(name)) = (msg.recipient.clone(), msg.display_name()) else {
            return Ok(());
        };
        conn.send_command(&Command::Privmsg {
            target,
            text: format!("hi, {name}"),
        })
        .await
    }
}
