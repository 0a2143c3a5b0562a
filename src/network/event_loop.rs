//! The relay's main loop.
//!
//! One task owns the [`Connection`]. Each iteration waits, in priority order,
//! on shutdown, the connection, the input feeds and a heartbeat tick. A
//! readable connection is drained completely before anything else runs, and
//! each drain is followed by at most one waiting input line, so neither side
//! starves the other.
//!
//! Losing the connection, a framing overflow or a server `RECONNECT` all lead
//! to the same place: the old connection is dropped and a new one is dialled
//! under the [`ReconnectPolicy`]. The backoff survives across outages until a
//! connection stays up long enough, so a server that keeps hanging up is
//! dialled with growing delays.

use std::time::Duration;

use futures_util::{FutureExt, StreamExt};
use futures_util::stream::SelectAll;
use tmi_proto::{Command, Message};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::codec::LinesCodecError;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, trace, warn};

use super::handshake::{self, HandshakeConfig};
use super::{Backoff, Connection, Connector, ReconnectPolicy};
use crate::config::{Config, OutputFormat};
use crate::delivery::{InputFeed, Sink, format};
use crate::error::{ClientError, ConnectionError};
use crate::responders::Registry;
use crate::telemetry::spans;

/// Token sent with heartbeat PINGs.
const KEEPALIVE_TOKEN: &str = ":tmi.twitch.tv";

enum SelectResult {
    /// Cancellation requested
    Shutdown,
    /// Connection has something to drain, or failed
    Readable(Result<(), ConnectionError>),
    /// A line from an input feed
    Input(Result<String, LinesCodecError>),
    /// Heartbeat
    Tick,
}

/// Everything needed to bring up a ready connection.
struct Dialer {
    connector: Box<dyn Connector>,
    host: String,
    port: u16,
    handshake: HandshakeConfig,
    receive_timeout: Duration,
    policy: ReconnectPolicy,
}

impl Dialer {
    /// Connect and handshake, retrying under the policy.
    ///
    /// `backoff` carries failures over from earlier outages. Returns
    /// `Ok(None)` if `shutdown` fires first. Only the backoff sleeps are
    /// interrupted; an attempt in progress runs to completion.
    async fn establish(
        &self,
        backoff: &mut Backoff,
        shutdown: &CancellationToken,
    ) -> Result<Option<Connection>, ClientError> {
        let addr = format!("{}:{}", self.host, self.port);

        loop {
            if shutdown.is_cancelled() {
                return Ok(None);
            }

            let attempt = backoff.failures() + 1;
            let span = spans::connection(&addr, attempt);
            match self.connect_once(&addr).instrument(span).await {
                Ok(conn) => return Ok(Some(conn)),
                Err(e) if !e.is_retryable() => {
                    error!(error = %e, "Connection attempt failed permanently");
                    return Err(e);
                }
                Err(e) => warn!(error = %e, attempt, "Connection attempt failed"),
            }

            if !self.back_off(backoff, shutdown).await? {
                return Ok(None);
            }
        }
    }

    /// Record a failure and sleep out the delay it earns.
    ///
    /// Returns `Ok(false)` if `shutdown` fired during the sleep.
    async fn back_off(
        &self,
        backoff: &mut Backoff,
        shutdown: &CancellationToken,
    ) -> Result<bool, ClientError> {
        let Some(delay) = backoff.next_delay() else {
            error!(attempts = backoff.failures(), "Giving up on reconnecting");
            return Err(ClientError::ReconnectExhausted {
                attempts: backoff.failures(),
            });
        };
        info!(delay = ?delay, failures = backoff.failures(), "Backing off");

        tokio::select! {
            _ = shutdown.cancelled() => Ok(false),
            _ = tokio::time::sleep(delay) => Ok(true),
        }
    }

    async fn connect_once(&self, addr: &str) -> Result<Connection, ClientError> {
        let stream = self
            .connector
            .connect(&self.host, self.port)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        info!("Connected");

        let mut conn = Connection::from_boxed(stream).with_receive_timeout(self.receive_timeout);
        handshake::perform(&mut conn, &self.handshake).await?;
        Ok(conn)
    }
}

/// Single-task client loop: receive, dispatch, deliver, reconnect.
pub struct EventLoop {
    dialer: Dialer,
    channel: String,
    tick: Duration,
    format: OutputFormat,
    registry: Registry,
    sink: Box<dyn Sink>,
    inputs: SelectAll<InputFeed>,
    shutdown: CancellationToken,
}

impl EventLoop {
    /// Assemble a loop from configuration and its collaborators.
    ///
    /// Nothing connects until [`run`](Self::run).
    pub fn new(
        config: &Config,
        connector: Box<dyn Connector>,
        registry: Registry,
        sink: Box<dyn Sink>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            dialer: Dialer {
                connector,
                host: config.server.host.clone(),
                port: config.server.port,
                handshake: HandshakeConfig::from_config(config),
                receive_timeout: config.handshake.receive_timeout(),
                policy: ReconnectPolicy::from(&config.reconnect),
            },
            channel: config.identity.channel.clone(),
            tick: config.event_loop.tick(),
            format: config.delivery.format,
            registry,
            sink,
            inputs: SelectAll::new(),
            shutdown,
        }
    }

    /// Add a source of chat lines to post to the channel.
    pub fn with_input(mut self, feed: InputFeed) -> Self {
        self.inputs.push(feed);
        self
    }

    /// Run until cancelled or a fatal error.
    ///
    /// Returns `Ok(())` after a requested shutdown. A rejected login or an
    /// exhausted reconnect budget ends the loop with the error.
    pub async fn run(mut self) -> Result<(), ClientError> {
        let mut backoff = self.dialer.policy.backoff();
        let Some(mut conn) = self.dialer.establish(&mut backoff, &self.shutdown).await? else {
            return Ok(());
        };
        let mut connected_at = Instant::now();

        let mut ticker = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let select_result = tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => SelectResult::Shutdown,

                result = conn.ready() => SelectResult::Readable(result),

                Some(line) = self.inputs.next(), if !self.inputs.is_empty() => {
                    SelectResult::Input(line)
                }

                _ = ticker.tick() => SelectResult::Tick,
            };

            let mut reconnect = false;
            match select_result {
                SelectResult::Shutdown => {
                    info!("Shutdown requested, closing connection");
                    if conn.is_connected() {
                        let _ = conn.send_command(&Command::Quit(None)).await;
                    }
                    conn.close().await;
                    return Ok(());
                }
                SelectResult::Readable(Ok(())) => {
                    reconnect = self.drain(&mut conn).await;
                    // Take one waiting input line so a busy channel cannot starve input
                    if let Some(Some(line)) = self.inputs.next().now_or_never() {
                        self.handle_input(&mut conn, line).await;
                    }
                }
                SelectResult::Readable(Err(e)) => {
                    warn!(error = %e, code = e.error_code(), "Connection failed");
                }
                SelectResult::Input(line) => self.handle_input(&mut conn, line).await,
                SelectResult::Tick => self.heartbeat(&mut conn).await,
            }

            if reconnect || !conn.is_connected() {
                conn.close().await;

                let uptime = connected_at.elapsed();
                if !backoff.settle(uptime) {
                    warn!(uptime = ?uptime, "Connection lost before it was stable");
                    if !self.dialer.back_off(&mut backoff, &self.shutdown).await? {
                        return Ok(());
                    }
                }

                info!(requested = reconnect, "Reconnecting");
                match self.dialer.establish(&mut backoff, &self.shutdown).await? {
                    Some(fresh) => {
                        conn = fresh;
                        connected_at = Instant::now();
                    }
                    None => return Ok(()),
                }
            }
        }
    }

    /// Ping the server. A write that fails clears the liveness flag and
    /// the reconnect check that follows picks it up.
    async fn heartbeat(&mut self, conn: &mut Connection) {
        debug!(connected = conn.is_connected(), "Heartbeat");
        if !conn.is_connected() {
            return;
        }
        if let Err(e) = conn
            .send_command(&Command::Ping(KEEPALIVE_TOKEN.to_string()))
            .await
        {
            warn!(error = %e, "Heartbeat failed");
        }
    }

    async fn handle_input(&mut self, conn: &mut Connection, line: Result<String, LinesCodecError>) {
        match line {
            Ok(line) => self.post(conn, line).await,
            Err(e) => warn!(error = %e, "Input feed failed"),
        }
    }

    /// Handle every message that is available right now.
    ///
    /// Returns `true` if the server asked us to reconnect.
    async fn drain(&mut self, conn: &mut Connection) -> bool {
        let mut reconnect = false;
        loop {
            match conn.try_next_message() {
                Ok(Some(msg)) => reconnect |= self.handle_message(conn, msg).await,
                Ok(None) => return reconnect,
                Err(e) => {
                    warn!(error = %e, code = e.error_code(), "Receive failed");
                    return reconnect;
                }
            }
        }
    }

    async fn handle_message(&mut self, conn: &mut Connection, msg: Message) -> bool {
        if msg.is_ping() {
            let token = msg.sender.unwrap_or_default();
            if let Err(e) = conn.send_command(&Command::Pong(token)).await {
                warn!(error = %e, "Failed to answer PING");
            }
            return false;
        }

        // Reply to our own heartbeat
        if msg.command == "PONG" {
            trace!("Heartbeat answered");
            return false;
        }

        self.deliver(&msg).await;

        match msg.command.as_str() {
            "PRIVMSG" => {
                self.registry.dispatch(conn, &msg).await;
                false
            }
            "RECONNECT" => {
                info!("Server requested a reconnect");
                true
            }
            _ => false,
        }
    }

    async fn deliver(&mut self, msg: &Message) {
        let line = format::render(self.format, msg);
        if let Err(e) = self.sink.emit(&line).await {
            warn!(error = %e, "Delivery failed");
        }
    }

    /// Post one input line to the channel. Blank lines are skipped.
    async fn post(&mut self, conn: &mut Connection, line: String) {
        if line.trim().is_empty() {
            return;
        }
        if !conn.is_connected() {
            warn!("Dropping input line while disconnected");
            return;
        }
        if let Err(e) = conn
            .send_command(&Command::privmsg(&self.channel, line))
            .await
        {
            warn!(error = %e, "Failed to post input line");
        }
    }
}
