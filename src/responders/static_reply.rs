//! Configured trigger/reply pairs.

use async_trait::async_trait;
use tmi_proto::{Command, Message};

use super::{Responder, ResponderResult};
use crate::network::Connection;

/// Answers a fixed trigger with fixed text.
#[derive(Debug, Clone)]
pub struct StaticReply {
    trigger: String,
    reply: String,
}

impl StaticReply {
    pub fn new(trigger: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl Responder for StaticReply {
    fn name(&self) -> &str {
        &self.trigger
    }

    fn matches(&self, msg: &Message) -> bool {
        msg.is_privmsg() && msg.body.as_deref() == Some(self.trigger.as_str())
    }

    async fn handle(&self, conn: &mut Connection, msg: &Message) -> ResponderResult {
        let Some(target) = msg.recipient.clone() else {
            return Ok(());
        };
        conn.send_command(&Command::Privmsg {
            target,
            text: self.reply.clone(),
        })
        .await
    }
}
