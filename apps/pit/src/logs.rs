//! Value log: a 1 Hz poll of the floor's `/logs` endpoint plus the local
//! filter state for the log panel.
//!
//! The poller replaces the whole entry list on every successful fetch. A
//! failed fetch clears it and surfaces a degraded banner instead; the next
//! good poll recovers on its own.

use std::time::Duration;

use pit_proto::{LogEntry, LogPage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Banner shown while the log endpoint is unreachable.
pub const UNAVAILABLE: &str = "Logging service not available";

/// Outcome of one poll: the full entry list, or a degraded-state message.
pub type PollResult = Result<Vec<LogEntry>, String>;

#[derive(Debug, Default)]
pub struct LogView {
    entries: Vec<LogEntry>,
    error: Option<String>,
    symbol_filter: Option<String>,
    field_filter: Option<String>,
    hide_overrides: bool,
}

impl LogView {
    /// Fold in one poll outcome.
    pub fn apply(&mut self, outcome: PollResult) {
        match outcome {
            Ok(entries) => {
                self.entries = entries;
                self.error = None;
            }
            Err(message) => {
                self.entries.clear();
                self.error = Some(message);
            }
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Entries passing the current filters, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter().filter(move |entry| {
            self.symbol_filter
                .as_deref()
                .map(|s| entry.symbol == s)
                .unwrap_or(true)
                && self
                    .field_filter
                    .as_deref()
                    .map(|f| entry.field == f)
                    .unwrap_or(true)
                && (!self.hide_overrides || !entry.is_override)
        })
    }

    pub fn symbol_filter(&self) -> Option<&str> {
        self.symbol_filter.as_deref()
    }

    pub fn field_filter(&self) -> Option<&str> {
        self.field_filter.as_deref()
    }

    pub fn hides_overrides(&self) -> bool {
        self.hide_overrides
    }

    /// Advance the symbol filter: everything, then each symbol seen in the
    /// current entries, then back to everything.
    pub fn cycle_symbol(&mut self) {
        self.symbol_filter = cycle(
            self.symbol_filter.take(),
            distinct(self.entries.iter().map(|e| e.symbol.as_str())),
        );
    }

    pub fn cycle_field(&mut self) {
        self.field_filter = cycle(
            self.field_filter.take(),
            distinct(self.entries.iter().map(|e| e.field.as_str())),
        );
    }

    pub fn toggle_override_filter(&mut self) {
        self.hide_overrides = !self.hide_overrides;
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.iter().any(|s: &String| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}

fn cycle(current: Option<String>, options: Vec<String>) -> Option<String> {
    match current {
        None => options.into_iter().next(),
        Some(value) => {
            let next = options.iter().position(|o| *o == value).map(|i| i + 1)?;
            options.into_iter().nth(next)
        }
    }
}

/// Spawn the poller. One fetch per `period`, result per tick on the
/// returned receiver; stops when the receiver is dropped.
pub fn spawn_poller(url: String, period: Duration) -> (mpsc::UnboundedReceiver<PollResult>, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        let client = reqwest::Client::new();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let outcome = poll_once(&client, &url).await;
            if tx.send(outcome).is_err() {
                return;
            }
        }
    });
    (rx, task)
}

async fn poll_once(client: &reqwest::Client, url: &str) -> PollResult {
    match fetch_page(client, url).await {
        Ok(page) => Ok(page.logs),
        Err(err) => {
            debug!(error = %err, "log poll failed");
            Err(UNAVAILABLE.to_string())
        }
    }
}

async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<LogPage, reqwest::Error> {
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<LogPage>()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pit_proto::CellValue;

    fn entry(symbol: &str, field: &str, is_override: bool) -> LogEntry {
        LogEntry {
            timestamp: "2025-05-12T09:30:00".to_string(),
            symbol: symbol.to_string(),
            field: field.to_string(),
            value: CellValue::Number(1.0),
            is_override,
            user_id: is_override.then(|| "user_42".to_string()),
        }
    }

    #[test]
    fn failure_clears_entries_and_sets_banner() {
        let mut view = LogView::default();
        view.apply(Ok(vec![entry("ESM5", "bid_edge", false)]));
        assert_eq!(view.entries().count(), 1);

        for _ in 0..3 {
            view.apply(Err(UNAVAILABLE.to_string()));
            assert_eq!(view.error(), Some(UNAVAILABLE));
            assert_eq!(view.entries().count(), 0);
        }

        // The next good poll recovers without intervention.
        view.apply(Ok(vec![entry("ESM5", "bid_edge", false)]));
        assert!(view.error().is_none());
        assert_eq!(view.entries().count(), 1);
    }

    #[test]
    fn filters_compose() {
        let mut view = LogView::default();
        view.apply(Ok(vec![
            entry("ESM5", "bid_edge", false),
            entry("ESM5", "ask_edge", true),
            entry("NQM5", "bid_edge", false),
        ]));

        view.cycle_symbol();
        assert_eq!(view.symbol_filter(), Some("ESM5"));
        assert_eq!(view.entries().count(), 2);

        view.toggle_override_filter();
        assert_eq!(view.entries().count(), 1);
        assert_eq!(view.entries().next().unwrap().field, "bid_edge");
    }

    #[test]
    fn symbol_filter_cycles_back_to_everything() {
        let mut view = LogView::default();
        view.apply(Ok(vec![
            entry("ESM5", "bid_edge", false),
            entry("NQM5", "bid_edge", false),
        ]));

        view.cycle_symbol();
        assert_eq!(view.symbol_filter(), Some("ESM5"));
        view.cycle_symbol();
        assert_eq!(view.symbol_filter(), Some("NQM5"));
        view.cycle_symbol();
        assert_eq!(view.symbol_filter(), None);
    }

    #[test]
    fn stale_filter_resets_on_next_cycle() {
        let mut view = LogView::default();
        view.apply(Ok(vec![entry("ESM5", "bid_edge", false)]));
        view.cycle_symbol();
        assert_eq!(view.symbol_filter(), Some("ESM5"));

        // Entry set changed; the old selection no longer exists.
        view.apply(Ok(vec![entry("NQM5", "bid_edge", false)]));
        view.cycle_symbol();
        assert_eq!(view.symbol_filter(), None);
    }
}
