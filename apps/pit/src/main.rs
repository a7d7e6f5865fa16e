use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use pit::client::{EventSources, GridClient};
use pit::config::{Cli, Config, LOG_POLL_PERIOD};
use pit::state::ClientState;
use pit::transport::websocket::{self, ReconnectPolicy};
use pit::{client, identity, logs};

/// Tracing goes to the log file when one is configured, to stderr in
/// headless mode, and nowhere at all while the TUI owns the terminal.
fn init_tracing(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if let Some(path) = &config.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        builder.with_writer(writer).with_ansi(false).init();
        Ok(Some(guard))
    } else if config.headless {
        builder.with_writer(std::io::stderr).init();
        Ok(None)
    } else {
        builder.with_writer(std::io::sink).init();
        Ok(None)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::try_from(cli)?;
    let _log_guard = init_tracing(&config)?;

    let me = config.user_id.clone().unwrap_or_else(identity::generate);
    info!(
        user_id = %me,
        server = %config.server_url,
        logs = %config.logs_url,
        "starting pit client"
    );

    let policy = ReconnectPolicy::with_enabled(config.reconnect);
    let (handle, channel_rx, _channel_task) = websocket::spawn(config.server_url.clone(), policy);
    let (poll_rx, _poll_task) = logs::spawn_poller(config.logs_url.clone(), LOG_POLL_PERIOD);

    let keys = if config.headless {
        // No terminal to read from; the branch stays quiet forever.
        let (_tx, rx) = mpsc::unbounded_channel();
        rx
    } else {
        client::spawn_input_thread()
    };

    let state = ClientState::new(me, &config.symbols);
    let grid_client = GridClient::new(state, handle, config.headless);
    let sources = EventSources {
        channel: channel_rx,
        keys,
        polls: poll_rx,
    };

    if config.headless {
        tokio::select! {
            result = grid_client.run(sources) => result?,
            _ = tokio::signal::ctrl_c() => info!("shutting down"),
        }
    } else {
        grid_client.run(sources).await?;
    }
    Ok(())
}
