//! tmi-relay - relay a Twitch channel to local pipes.

use std::time::Duration;

use anyhow::Context;
use tmi_relay::config::{self, Config, DeliveryMode};
use tmi_relay::delivery::{InputFeed, Sink, bus, stdio};
use tmi_relay::network::{EventLoop, TcpConnector};
use tmi_relay::responders::Registry;
use tmi_relay::telemetry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// How long blocking work may hold up exit once the relay has stopped.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<()> {
    telemetry::init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;
    let result = runtime.block_on(run());
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tmi-relay.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        server = %config.server_addr(),
        user = %config.identity.user,
        channel = %config.identity.channel,
        mode = ?config.delivery.mode,
        format = ?config.delivery.format,
        "Starting tmi-relay"
    );

    let (sink, input) = open_delivery(&config).await?;
    let registry = Registry::from_config(&config.responders);
    info!(responders = registry.len(), "Responders registered");

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let event_loop = EventLoop::new(&config, Box::new(TcpConnector), registry, sink, shutdown)
        .with_input(input);

    event_loop.run().await.map_err(|e| {
        error!(error = %e, "Relay stopped");
        e
    })?;

    info!("Shutdown complete");
    Ok(())
}

async fn open_delivery(config: &Config) -> anyhow::Result<(Box<dyn Sink>, InputFeed)> {
    match config.delivery.mode {
        DeliveryMode::Stdio => {
            let input = stdio::stdin_feed().context("starting stdin reader")?;
            Ok((Box::new(stdio::StdoutSink::stdout()), input))
        }
        DeliveryMode::Bus => {
            let name = &config.delivery.bus_name;
            let conn = bus::connect(name)
                .await
                .with_context(|| format!("claiming {name} on the session bus"))?;
            let input = bus::bus_feed(&conn)
                .await
                .context("subscribing to Send signals")?;
            Ok((Box::new(bus::BusSink::new(conn)), input))
        }
        #[cfg(unix)]
        DeliveryMode::Pipe => {
            use tmi_relay::delivery::pipe::{PipeSink, pipe_feed};

            // validate() guarantees both paths in pipe mode
            let (Some(input_path), Some(output_path)) =
                (&config.delivery.input_pipe, &config.delivery.output_pipe)
            else {
                anyhow::bail!("pipe mode needs delivery.input_pipe and delivery.output_pipe");
            };
            let input = pipe_feed(input_path)
                .with_context(|| format!("opening input pipe {}", input_path.display()))?;
            let sink = PipeSink::open(output_path)
                .await
                .with_context(|| format!("opening output pipe {}", output_path.display()))?;
            Ok((Box::new(sink), input))
        }
        #[cfg(not(unix))]
        DeliveryMode::Pipe => anyhow::bail!("pipe mode needs a unix platform"),
    }
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C"),
                        _ = term.recv() => info!("Received SIGTERM"),
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl-C");
        }
        shutdown.cancel();
    });
}
