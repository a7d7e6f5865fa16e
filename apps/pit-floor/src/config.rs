use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "pit-floor",
    author,
    version,
    about = "Dev floor server: value engine, grid broadcast hub, and value log"
)]
pub struct Cli {
    /// Address to bind the HTTP/WebSocket listener to.
    #[arg(long, env = "PIT_FLOOR_LISTEN_ADDR", default_value = "127.0.0.1:8000")]
    listen_addr: String,

    /// Comma-separated symbols the engine quotes.
    #[arg(long, env = "PIT_FLOOR_SYMBOLS", default_value = "ESM5,NQM5,TYM5,TUM5")]
    symbols: String,

    /// Milliseconds between engine ticks.
    #[arg(long, env = "PIT_FLOOR_TICK_MS", default_value_t = 1000)]
    tick_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub symbols: Vec<String>,
    pub tick_ms: u64,
}

impl TryFrom<Cli> for Config {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let listen_addr: SocketAddr = cli
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen address: {}", cli.listen_addr))?;
        let symbols: Vec<String> = cli
            .symbols
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
        if cli.tick_ms == 0 {
            bail!("--tick-ms must be positive");
        }
        Ok(Config {
            listen_addr,
            symbols,
            tick_ms: cli.tick_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(args: &[&str]) -> Result<Config> {
        let mut argv = vec!["pit-floor"];
        argv.extend_from_slice(args);
        Config::try_from(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn defaults_parse() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.listen_addr.port(), 8000);
        assert_eq!(config.symbols.len(), 4);
        assert_eq!(config.tick_ms, 1000);
    }

    #[test]
    fn bad_listen_addr_is_rejected() {
        assert!(config_from(&["--listen-addr", "not-an-addr"]).is_err());
    }

    #[test]
    fn duplicate_symbols_are_rejected() {
        assert!(config_from(&["--symbols", "ESM5,ESM5"]).is_err());
    }
}
