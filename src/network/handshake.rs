//! Registration handshake.
//!
//! [`HandshakeMachine`] is sans-IO: it consumes decoded messages and produces
//! actions (commands to send, completion, or an error). [`perform`] drives it
//! over a [`Connection`] and bounds the whole exchange with a timeout.
//!
//! ```text
//! Connected    --start()--> PASS, NICK[, USER]   --> AwaitWelcome
//! AwaitWelcome --welcome--> CAP REQ              --> AwaitCapAck
//! AwaitCapAck  --CAP------> JOIN #channel        --> AwaitJoinEnd
//! AwaitJoinEnd --366------>                          Ready
//! ```
//!
//! Anything that does not advance the current state is dropped, apart from
//! `PING` (answered), `ERROR` and a login-failure `NOTICE` (both fatal).

use std::time::Duration;

use tmi_proto::{Command, Message, numeric};
use tracing::{Instrument, debug, info};

use super::Connection;
use crate::config::Config;
use crate::error::HandshakeError;
use crate::telemetry::spans;

/// Notice bodies Twitch uses to refuse a login.
const LOGIN_FAILURES: &[&str] = &["Login authentication failed", "Improperly formatted auth"];

/// Current state of the registration handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HandshakeState {
    /// Stream open, nothing sent yet.
    #[default]
    Connected,
    /// Sent credentials, awaiting the welcome reply.
    AwaitWelcome,
    /// Sent CAP REQ, awaiting the acknowledgement.
    AwaitCapAck,
    /// Sent JOIN, awaiting the end of the names list.
    AwaitJoinEnd,
    /// Joined; the connection can be used.
    Ready,
}

/// Configuration for the handshake state machine.
#[derive(Clone)]
pub struct HandshakeConfig {
    /// Login name.
    pub user: String,
    /// OAuth token.
    pub password: String,
    /// Channel, with or without its leading `#`.
    pub channel: String,
    /// Capabilities to request.
    pub capabilities: Vec<String>,
    /// Numerics accepted as the welcome reply.
    pub welcome_codes: Vec<String>,
    /// Send `USER` after `NICK`.
    pub send_user: bool,
    /// Bound on the whole handshake.
    pub timeout: Duration,
}

impl std::fmt::Debug for HandshakeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeConfig")
            .field("user", &self.user)
            .field("channel", &self.channel)
            .field("capabilities", &self.capabilities)
            .field("welcome_codes", &self.welcome_codes)
            .field("send_user", &self.send_user)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HandshakeConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            user: config.identity.user.clone(),
            password: config.identity.password.clone(),
            channel: config.identity.channel.clone(),
            capabilities: config.handshake.capabilities.clone(),
            welcome_codes: config.handshake.welcome_codes.clone(),
            send_user: config.handshake.send_user,
            timeout: config.handshake.timeout(),
        }
    }
}

/// Actions produced by the handshake state machine.
///
/// The caller is responsible for sending the commands to the server.
#[derive(Debug)]
pub enum HandshakeAction {
    /// Send this command to the server.
    Send(Box<Command>),
    /// Handshake is complete, proceed to normal operation.
    Complete,
    /// The server refused the connection.
    Error(HandshakeError),
}

/// Sans-IO state machine for the Twitch registration handshake.
#[derive(Clone, Debug)]
pub struct HandshakeMachine {
    config: HandshakeConfig,
    state: HandshakeState,
}

impl HandshakeMachine {
    #[must_use]
    pub fn new(config: HandshakeConfig) -> Self {
        Self {
            config,
            state: HandshakeState::Connected,
        }
    }

    /// Get the current handshake state.
    #[must_use]
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Start the handshake. Returns the credentials to send.
    #[must_use]
    pub fn start(&mut self) -> Vec<HandshakeAction> {
        self.state = HandshakeState::AwaitWelcome;

        let mut actions = vec![
            send(Command::Pass(self.config.password.clone())),
            send(Command::Nick(self.config.user.clone())),
        ];
        if self.config.send_user {
            actions.push(send(Command::User {
                username: self.config.user.clone(),
                realname: self.config.user.clone(),
            }));
        }
        actions
    }

    /// Feed a decoded message to the state machine.
    ///
    /// Returns actions to perform (commands to send, completion, or errors).
    #[must_use]
    pub fn feed(&mut self, msg: &Message) -> Vec<HandshakeAction> {
        if msg.is_ping() {
            let token = msg.sender.clone().unwrap_or_default();
            return vec![send(Command::Pong(token))];
        }

        if is_error(msg) {
            let reason = msg.body.clone().unwrap_or_else(|| msg.to_string());
            return vec![HandshakeAction::Error(HandshakeError::Server(reason))];
        }

        if msg.command == "NOTICE"
            && let Some(body) = msg.body.as_deref()
            && LOGIN_FAILURES.iter().any(|f| body.contains(f))
        {
            return vec![HandshakeAction::Error(HandshakeError::Rejected(
                body.to_string(),
            ))];
        }

        match self.state {
            HandshakeState::AwaitWelcome if self.is_welcome(msg) => {
                self.state = HandshakeState::AwaitCapAck;
                vec![send(Command::cap_req(self.config.capabilities.iter().cloned()))]
            }
            HandshakeState::AwaitCapAck if msg.command == "CAP" => {
                self.state = HandshakeState::AwaitJoinEnd;
                vec![send(Command::join(&self.config.channel))]
            }
            HandshakeState::AwaitJoinEnd if msg.command == numeric::RPL_ENDOFNAMES => {
                self.state = HandshakeState::Ready;
                vec![HandshakeAction::Complete]
            }
            _ => vec![],
        }
    }

    fn is_welcome(&self, msg: &Message) -> bool {
        self.config.welcome_codes.iter().any(|code| *code == msg.command)
    }
}

/// `ERROR` arrives without a prefix, so positional decoding files the verb
/// under `sender`.
fn is_error(msg: &Message) -> bool {
    msg.command == "ERROR" || msg.sender.as_deref() == Some("ERROR")
}

fn send(command: Command) -> HandshakeAction {
    HandshakeAction::Send(Box::new(command))
}

/// Run the handshake on a fresh connection.
///
/// Fails with [`HandshakeError::TimedOut`] if the server has not completed
/// the exchange within `config.timeout`.
pub async fn perform(conn: &mut Connection, config: &HandshakeConfig) -> Result<(), HandshakeError> {
    let span = spans::handshake(&config.user, &config.channel);
    async {
        let mut machine = HandshakeMachine::new(config.clone());
        let outcome = tokio::time::timeout(config.timeout, drive(conn, &mut machine)).await;

        match outcome {
            Ok(Ok(())) => {
                info!("Handshake complete");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(HandshakeError::TimedOut {
                state: machine.state(),
            }),
        }
    }
    .instrument(span)
    .await
}

async fn drive(conn: &mut Connection, machine: &mut HandshakeMachine) -> Result<(), HandshakeError> {
    if apply(conn, machine.start()).await? {
        return Ok(());
    }

    loop {
        let msg = conn.wait_next_message().await?;
        debug!(command = %msg.command, state = ?machine.state(), "Handshake message");
        if apply(conn, machine.feed(&msg)).await? {
            return Ok(());
        }
    }
}

/// Execute actions in order. Returns `true` once the handshake completed.
async fn apply(conn: &mut Connection, actions: Vec<HandshakeAction>) -> Result<bool, HandshakeError> {
    let mut complete = false;
    for action in actions {
        match action {
            HandshakeAction::Send(command) => conn.send_command(&command).await?,
            HandshakeAction::Complete => complete = true,
            HandshakeAction::Error(e) => return Err(e),
        }
    }
    Ok(complete)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> HandshakeConfig {
        HandshakeConfig {
            user: "relaybot".to_string(),
            password: "oauth:secret".to_string(),
            channel: "bar".to_string(),
            capabilities: vec![
                "twitch.tv/tags".to_string(),
                "twitch.tv/commands".to_string(),
            ],
            welcome_codes: vec!["001".to_string(), "376".to_string()],
            send_user: false,
            timeout: Duration::from_secs(30),
        }
    }

    fn sent(actions: &[HandshakeAction]) -> Vec<String> {
        actions
            .iter()
            .filter_map(|a| match a {
                HandshakeAction::Send(cmd) => Some(cmd.to_string()),
                _ => None,
            })
            .collect()
    }

    fn parse(line: &str) -> Message {
        Message::parse(line).unwrap()
    }

    #[test]
    fn test_start_sends_credentials() {
        let mut machine = HandshakeMachine::new(make_config());
        let actions = machine.start();

        assert_eq!(machine.state(), HandshakeState::AwaitWelcome);
        assert_eq!(sent(&actions), vec!["PASS oauth:secret", "NICK relaybot"]);
    }

    #[test]
    fn test_start_with_user() {
        let mut machine = HandshakeMachine::new(HandshakeConfig {
            send_user: true,
            ..make_config()
        });
        let actions = machine.start();
        assert_eq!(sent(&actions)[2], "USER relaybot 0 * :relaybot");
    }

    #[test]
    fn test_full_sequence() {
        let mut machine = HandshakeMachine::new(make_config());
        let _ = machine.start();

        let actions = machine.feed(&parse(":tmi.twitch.tv 001 relaybot :Welcome, GLHF!"));
        assert_eq!(sent(&actions), vec!["CAP REQ :twitch.tv/tags twitch.tv/commands"]);
        assert_eq!(machine.state(), HandshakeState::AwaitCapAck);

        let actions = machine.feed(&parse(":tmi.twitch.tv CAP * ACK :twitch.tv/tags twitch.tv/commands"));
        assert_eq!(sent(&actions), vec!["JOIN #bar"]);
        assert_eq!(machine.state(), HandshakeState::AwaitJoinEnd);

        let actions = machine.feed(&parse(":relaybot.tmi.twitch.tv 366 relaybot #bar :End of /NAMES list"));
        assert!(matches!(actions.as_slice(), [HandshakeAction::Complete]));
        assert_eq!(machine.state(), HandshakeState::Ready);
    }

    #[test]
    fn test_unrelated_messages_are_dropped() {
        let mut machine = HandshakeMachine::new(make_config());
        let _ = machine.start();

        for line in [
            ":tmi.twitch.tv 002 relaybot :Your host is tmi.twitch.tv",
            ":tmi.twitch.tv 372 relaybot :>",
            ":tmi.twitch.tv CAP * ACK :twitch.tv/tags",
            ":tmi.twitch.tv 366 relaybot #bar :End of /NAMES list",
        ] {
            assert!(machine.feed(&parse(line)).is_empty());
            assert_eq!(machine.state(), HandshakeState::AwaitWelcome);
        }

        let actions = machine.feed(&parse(":tmi.twitch.tv 376 relaybot :>"));
        assert_eq!(actions.len(), 1);
        assert_eq!(machine.state(), HandshakeState::AwaitCapAck);
    }

    #[test]
    fn test_ping_is_answered_without_advancing() {
        let mut machine = HandshakeMachine::new(make_config());
        let _ = machine.start();

        let actions = machine.feed(&parse("PING :tmi.twitch.tv"));
        assert_eq!(sent(&actions), vec!["PONG :tmi.twitch.tv"]);
        assert_eq!(machine.state(), HandshakeState::AwaitWelcome);
    }

    #[test]
    fn test_login_failure_is_rejected() {
        let mut machine = HandshakeMachine::new(make_config());
        let _ = machine.start();

        let actions = machine.feed(&parse(":tmi.twitch.tv NOTICE * :Login authentication failed"));
        assert!(matches!(
            actions.as_slice(),
            [HandshakeAction::Error(HandshakeError::Rejected(_))]
        ));
    }

    #[test]
    fn test_server_error() {
        let mut machine = HandshakeMachine::new(make_config());
        let _ = machine.start();

        let actions = machine.feed(&parse("ERROR :Closing Link"));
        assert!(!actions.is_empty());
        match actions.as_slice() {
            [HandshakeAction::Error(HandshakeError::Server(reason))] => {
                assert!(reason.contains("Closing Link"));
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn test_debug_omits_password() {
        let debug = format!("{:?}", make_config());
        assert!(!debug.contains("oauth:secret"));
    }
}
