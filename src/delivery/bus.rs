//! Session bus: messages and chat lines as D-Bus signals.
//!
//! Every delivered message is emitted as a `Message` signal on [`INTERFACE`]
//! at [`PATH`] with the rendered line as its only argument. A `Send` signal on
//! the same interface, from any peer, carries one chat line to post.

use std::io;

use async_trait::async_trait;
use futures_util::{StreamExt, future};
use tokio_util::codec::LinesCodecError;
use tracing::{info, warn};
use zbus::message::Type as MessageType;
use zbus::names::BusName;
use zbus::{Connection, MatchRule, Message, MessageStream};

use super::{InputFeed, MAX_INPUT_LINE, Sink};

/// Object path signals are emitted from.
pub const PATH: &str = "/org/tmirelay/Relay";
/// Interface of both signals.
pub const INTERFACE: &str = "org.tmirelay.Relay";
/// Outbound signal carrying one delivered message.
pub const MESSAGE_SIGNAL: &str = "Message";
/// Inbound signal carrying one chat line.
pub const SEND_SIGNAL: &str = "Send";

/// Connect to the session bus and claim `name`.
pub async fn connect(name: &str) -> zbus::Result<Connection> {
    let conn = Connection::session().await?;
    conn.request_name(name).await?;
    info!(name, "Claimed session bus name");
    Ok(conn)
}

/// Sink broadcasting each message as a signal.
#[derive(Debug, Clone)]
pub struct BusSink {
    conn: Connection,
}

impl BusSink {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Sink for BusSink {
    async fn emit(&mut self, line: &str) -> io::Result<()> {
        self.conn
            .emit_signal(
                None::<BusName<'_>>,
                PATH,
                INTERFACE,
                MESSAGE_SIGNAL,
                &(line,),
            )
            .await
            .map_err(io::Error::other)
    }
}

/// Chat lines arriving as `Send` signals.
pub async fn bus_feed(conn: &Connection) -> zbus::Result<InputFeed> {
    let rule = MatchRule::builder()
        .msg_type(MessageType::Signal)
        .interface(INTERFACE)?
        .member(SEND_SIGNAL)?
        .build();
    let stream = MessageStream::for_match_rule(rule, conn, None).await?;
    Ok(Box::pin(
        stream.filter_map(|msg| future::ready(chat_line(msg))),
    ))
}

/// The chat line carried by one signal. Signals without a string argument
/// are skipped.
fn chat_line(msg: zbus::Result<Message>) -> Option<Result<String, LinesCodecError>> {
    let msg = match msg {
        Ok(msg) => msg,
        Err(e) => return Some(Err(LinesCodecError::Io(io::Error::other(e)))),
    };
    match msg.body().deserialize::<String>() {
        Ok(line) if line.len() > MAX_INPUT_LINE => {
            Some(Err(LinesCodecError::MaxLineLengthExceeded))
        }
        Ok(line) => Some(Ok(line)),
        Err(e) => {
            warn!(error = %e, "Ignoring Send signal without a string argument");
            None
        }
    }
}
