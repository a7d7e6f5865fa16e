use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use url::Url;

/// Fixed cadence of the value-log poller.
pub const LOG_POLL_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(
    name = "pit",
    author,
    version,
    about = "Terminal client for the live trading parameter grid"
)]
pub struct Cli {
    /// WebSocket endpoint of the floor server.
    #[arg(long, env = "PIT_SERVER_URL", default_value = "ws://127.0.0.1:8000/ws")]
    server_url: String,

    /// HTTP endpoint serving the value log.
    #[arg(long, env = "PIT_LOGS_URL", default_value = "http://127.0.0.1:8000/logs")]
    logs_url: String,

    /// Comma-separated symbols shown in the grid, in default row order.
    #[arg(long, env = "PIT_SYMBOLS", default_value = "ESM5,NQM5,TYM5,TUM5")]
    symbols: String,

    /// Fixed user id instead of a generated one. Useful for scripted runs.
    #[arg(long, env = "PIT_USER_ID")]
    user_id: Option<String>,

    /// Give up after a dropped connection instead of redialing.
    #[arg(long, env = "PIT_NO_RECONNECT", default_value_t = false)]
    no_reconnect: bool,

    /// Run without the terminal UI; state changes go to the log only.
    #[arg(long, default_value_t = false)]
    headless: bool,

    /// Append tracing output to this file. Required to see logs in TUI mode.
    #[arg(long, env = "PIT_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: String,
    pub logs_url: String,
    pub symbols: Vec<String>,
    pub user_id: Option<String>,
    pub reconnect: bool,
    pub headless: bool,
    pub log_file: Option<PathBuf>,
}

impl TryFrom<Cli> for Config {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let server = Url::parse(&cli.server_url)
            .with_context(|| format!("invalid server url: {}", cli.server_url))?;
        if !matches!(server.scheme(), "ws" | "wss") {
            bail!("server url must use ws:// or wss://, got {}", cli.server_url);
        }

        let logs = Url::parse(&cli.logs_url)
            .with_context(|| format!("invalid logs url: {}", cli.logs_url))?;
        if !matches!(logs.scheme(), "http" | "https") {
            bail!("logs url must use http:// or https://, got {}", cli.logs_url);
        }

        let symbols = parse_symbols(&cli.symbols)?;

        if let Some(user_id) = &cli.user_id {
            if user_id.trim().is_empty() {
                bail!("--user-id must not be empty");
            }
        }

        Ok(Config {
            server_url: cli.server_url,
            logs_url: cli.logs_url,
            symbols,
            user_id: cli.user_id,
            reconnect: !cli.no_reconnect,
            headless: cli.headless,
            log_file: cli.log_file,
        })
    }
}

fn parse_symbols(raw: &str) -> Result<Vec<String>> {
    let symbols: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if symbols.is_empty() {
        bail!("--symbols must name at least one instrument");
    }
    for (idx, symbol) in symbols.iter().enumerate() {
        if symbols[..idx].contains(symbol) {
            bail!("--symbols lists {symbol} twice");
        }
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(args: &[&str]) -> Result<Config> {
        let mut argv = vec!["pit"];
        argv.extend_from_slice(args);
        Config::try_from(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn defaults_point_at_the_local_floor() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_url, "ws://127.0.0.1:8000/ws");
        assert_eq!(config.logs_url, "http://127.0.0.1:8000/logs");
        assert_eq!(config.symbols, vec!["ESM5", "NQM5", "TYM5", "TUM5"]);
        assert!(config.reconnect);
        assert!(!config.headless);
    }

    #[test]
    fn symbols_are_split_and_trimmed() {
        let config = config_from(&["--symbols", " CLM5 , GCM5 "]).unwrap();
        assert_eq!(config.symbols, vec!["CLM5", "GCM5"]);
    }

    #[test]
    fn duplicate_symbols_are_rejected() {
        assert!(config_from(&["--symbols", "ESM5,ESM5"]).is_err());
    }

    #[test]
    fn non_websocket_server_url_is_rejected() {
        assert!(config_from(&["--server-url", "http://127.0.0.1:8000/ws"]).is_err());
    }

    #[test]
    fn no_reconnect_flag_disables_redialing() {
        let config = config_from(&["--no-reconnect"]).unwrap();
        assert!(!config.reconnect);
    }
}
