//! Shared floor state: the grid books, per-user orders, master switches,
//! the bounded value log, and the peer registry.
//!
//! All mutation happens under one lock and every change is answered with a
//! full-grid broadcast; clients never see a partial diff.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use dashmap::DashMap;
use pit_proto::fields::{self, NUMERIC_FIELDS, TOGGLE_FIELDS};
use pit_proto::{
    encode_server_message, Cell, CellData, CellEdit, CellValue, LogEntry, LogPage, OverrideEntry,
    ServerMessage, Toggle, UserId,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Rows kept in the in-memory value log.
const LOG_CAP: usize = 512;

/// Starting baselines, matching the engine's walk ranges poorly on
/// purpose: the first few ticks visibly pull the edges up toward the mean.
const INITIAL_EDGE: f64 = -10.0;
const INITIAL_QTY: f64 = 0.0;

pub struct FloorState {
    shared: Mutex<Shared>,
    peers: DashMap<Uuid, mpsc::UnboundedSender<String>>,
}

struct Shared {
    symbols: Vec<String>,
    books: HashMap<String, HashMap<String, Cell>>,
    column_orders: HashMap<UserId, Vec<String>>,
    symbol_orders: HashMap<UserId, Vec<String>>,
    master_maker: Toggle,
    master_taker: Toggle,
    logs: VecDeque<LogEntry>,
}

impl FloorState {
    pub fn new(symbols: &[String]) -> Self {
        let books = symbols
            .iter()
            .map(|symbol| (symbol.clone(), new_book()))
            .collect();
        FloorState {
            shared: Mutex::new(Shared {
                symbols: symbols.to_vec(),
                books,
                column_orders: HashMap::new(),
                symbol_orders: HashMap::new(),
                master_maker: Toggle::On,
                master_taker: Toggle::On,
                logs: VecDeque::new(),
            }),
            peers: DashMap::new(),
        }
    }

    pub fn register_peer(&self, peer_id: Uuid, tx: mpsc::UnboundedSender<String>) {
        self.peers.insert(peer_id, tx);
    }

    pub fn unregister_peer(&self, peer_id: &Uuid) {
        self.peers.remove(peer_id);
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Encode once, fan out to every connected peer. Peers whose send half
    /// is gone are dropped from the registry.
    pub fn broadcast(&self, msg: &ServerMessage) {
        let frame = match encode_server_message(msg) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "failed to encode broadcast");
                return;
            }
        };
        let mut dead = Vec::new();
        for entry in self.peers.iter() {
            if entry.value().send(frame.clone()).is_err() {
                dead.push(*entry.key());
            }
        }
        for peer_id in dead {
            debug!(%peer_id, "dropping unreachable peer");
            self.peers.remove(&peer_id);
        }
    }

    /// The frame every freshly accepted peer receives.
    pub fn initial_data(&self) -> ServerMessage {
        let shared = self.lock();
        ServerMessage::InitialData {
            cell_data: snapshot(&shared),
            column_orders: shared.column_orders.clone(),
            symbol_orders: shared.symbol_orders.clone(),
        }
    }

    pub fn cell_update(&self) -> ServerMessage {
        ServerMessage::CellUpdate {
            cell_data: snapshot(&self.lock()),
        }
    }

    /// Fold in one edit intent. A null value removes the sender's override
    /// (and freshly recomputes the baseline once the last override goes);
    /// a well-typed value records the override and moves the baseline with
    /// it; a mistyped value clears the sender's override instead.
    pub fn apply_edit(&self, edit: &CellEdit) {
        let mut shared = self.lock();
        let Some(cell) = shared
            .books
            .get_mut(&edit.symbol)
            .and_then(|book| book.get_mut(&edit.cell_id))
        else {
            debug!(symbol = %edit.symbol, field = %edit.cell_id, "edit for unknown cell");
            return;
        };

        let is_toggle = TOGGLE_FIELDS.contains(&edit.cell_id.as_str());
        match &edit.value {
            None => {
                cell.overrides.remove(&edit.user_id);
                if cell.overrides.is_empty() && !is_toggle {
                    let current = numeric(cell.value.as_ref());
                    let mut rng = rand::thread_rng();
                    cell.value = Some(CellValue::Number(crate::engine::next_value(
                        &mut rng,
                        &edit.cell_id,
                        current,
                    )));
                }
            }
            Some(value) => {
                let well_typed = match value {
                    CellValue::Toggle(_) => is_toggle,
                    CellValue::Number(_) => !is_toggle,
                };
                if well_typed {
                    cell.overrides.insert(
                        edit.user_id.clone(),
                        OverrideEntry {
                            value: value.clone(),
                            timestamp: Some(now()),
                        },
                    );
                    cell.value = Some(value.clone());
                } else {
                    warn!(
                        symbol = %edit.symbol,
                        field = %edit.cell_id,
                        "mistyped edit value; clearing override"
                    );
                    cell.overrides.remove(&edit.user_id);
                }
            }
        }
    }

    /// Store a user's column order. No validation here: the client filters
    /// on receipt, the floor just relays.
    pub fn set_column_order(&self, user_id: UserId, order: Vec<String>) -> ServerMessage {
        let mut shared = self.lock();
        shared.column_orders.insert(user_id.clone(), order.clone());
        ServerMessage::ColumnOrderUpdate { user_id, order }
    }

    pub fn set_symbol_order(&self, user_id: UserId, order: Vec<String>) -> ServerMessage {
        let mut shared = self.lock();
        shared.symbol_orders.insert(user_id.clone(), order.clone());
        ServerMessage::SymbolOrderUpdate { user_id, order }
    }

    /// Update whichever master flags the intent carries; the broadcast
    /// always answers with both.
    pub fn set_master(&self, maker: Option<Toggle>, taker: Option<Toggle>) -> ServerMessage {
        let mut shared = self.lock();
        if let Some(value) = maker {
            shared.master_maker = value;
        }
        if let Some(value) = taker {
            shared.master_taker = value;
        }
        ServerMessage::MasterStateUpdate {
            master_maker: Some(shared.master_maker),
            master_taker: Some(shared.master_taker),
        }
    }

    /// One engine tick: walk every numeric baseline, append the tick's log
    /// rows, and hand back the full-grid update to broadcast.
    pub fn tick(&self) -> ServerMessage {
        let mut shared = self.lock();
        let timestamp = now();
        let mut rng = rand::thread_rng();
        let symbols = shared.symbols.clone();
        let mut rows = Vec::new();

        for symbol in &symbols {
            let Some(book) = shared.books.get_mut(symbol) else {
                continue;
            };
            for field in NUMERIC_FIELDS {
                let Some(cell) = book.get_mut(field) else {
                    continue;
                };
                let next = crate::engine::next_value(&mut rng, field, numeric(cell.value.as_ref()));
                cell.value = Some(CellValue::Number(next));
                rows.push(LogEntry {
                    timestamp: timestamp.clone(),
                    symbol: symbol.clone(),
                    field: field.to_string(),
                    value: CellValue::Number(next),
                    is_override: false,
                    user_id: None,
                });
                for (user_id, entry) in &cell.overrides {
                    rows.push(LogEntry {
                        timestamp: timestamp.clone(),
                        symbol: symbol.clone(),
                        field: field.to_string(),
                        value: entry.value.clone(),
                        is_override: true,
                        user_id: Some(user_id.clone()),
                    });
                }
            }
        }

        for row in rows {
            if shared.logs.len() == LOG_CAP {
                shared.logs.pop_front();
            }
            shared.logs.push_back(row);
        }

        ServerMessage::CellUpdate {
            cell_data: snapshot(&shared),
        }
    }

    /// Oldest-first page for `GET /logs`.
    pub fn log_page(&self) -> LogPage {
        LogPage {
            logs: self.lock().logs.iter().cloned().collect(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        // A poisoned lock means a panic mid-update; the grid data is still
        // structurally sound, so keep serving it.
        self.shared.lock().unwrap_or_else(|err| err.into_inner())
    }
}

fn new_book() -> HashMap<String, Cell> {
    let mut book = HashMap::new();
    for field in fields::base_fields() {
        let value = match field {
            "bid_edge" | "ask_edge" => CellValue::Number(INITIAL_EDGE),
            "bid_q" | "ask_q" => CellValue::Number(INITIAL_QTY),
            _ => CellValue::Toggle(Toggle::Off),
        };
        book.insert(
            field.to_string(),
            Cell {
                value: Some(value),
                overrides: HashMap::new(),
            },
        );
    }
    book
}

fn snapshot(shared: &Shared) -> CellData {
    shared.books.clone()
}

fn numeric(value: Option<&CellValue>) -> f64 {
    match value {
        Some(CellValue::Number(n)) => *n,
        _ => 0.0,
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> Vec<String> {
        vec!["ESM5".to_string(), "NQM5".to_string()]
    }

    fn edit(symbol: &str, field: &str, value: Option<CellValue>) -> CellEdit {
        CellEdit {
            cell_id: field.to_string(),
            value,
            user_id: "user_42".to_string(),
            symbol: symbol.to_string(),
        }
    }

    fn cell_of(msg: &ServerMessage, symbol: &str, field: &str) -> Cell {
        match msg {
            ServerMessage::CellUpdate { cell_data } => cell_data[symbol][field].clone(),
            other => panic!("expected cell_update, got {other:?}"),
        }
    }

    #[test]
    fn numeric_edit_records_override_and_moves_baseline() {
        let state = FloorState::new(&symbols());
        state.apply_edit(&edit("ESM5", "bid_edge", Some(CellValue::Number(1.3))));

        let cell = cell_of(&state.cell_update(), "ESM5", "bid_edge");
        assert_eq!(cell.value, Some(CellValue::Number(1.3)));
        let entry = &cell.overrides["user_42"];
        assert_eq!(entry.value, CellValue::Number(1.3));
        assert!(entry.timestamp.is_some());
    }

    #[test]
    fn clearing_the_last_override_recomputes_the_baseline() {
        let state = FloorState::new(&symbols());
        state.apply_edit(&edit("ESM5", "bid_q", Some(CellValue::Number(42.0))));
        state.apply_edit(&edit("ESM5", "bid_q", None));

        let cell = cell_of(&state.cell_update(), "ESM5", "bid_q");
        assert!(cell.overrides.is_empty());
        // The baseline walked away from the cleared override.
        match cell.value {
            Some(CellValue::Number(n)) => assert!((1.0..=100.0).contains(&n)),
            other => panic!("expected a number, got {other:?}"),
        }
    }

    #[test]
    fn mistyped_value_clears_the_override() {
        let state = FloorState::new(&symbols());
        state.apply_edit(&edit("ESM5", "maker", Some(CellValue::Toggle(Toggle::On))));
        state.apply_edit(&edit("ESM5", "maker", Some(CellValue::Number(3.0))));

        let cell = cell_of(&state.cell_update(), "ESM5", "maker");
        assert!(cell.overrides.is_empty());
        // The baseline keeps the last well-typed write.
        assert_eq!(cell.value, Some(CellValue::Toggle(Toggle::On)));
    }

    #[test]
    fn edits_for_unknown_cells_are_ignored() {
        let state = FloorState::new(&symbols());
        state.apply_edit(&edit("CLM5", "bid_edge", Some(CellValue::Number(1.0))));
        state.apply_edit(&edit("ESM5", "nope", Some(CellValue::Number(1.0))));
        let cell = cell_of(&state.cell_update(), "ESM5", "bid_edge");
        assert!(cell.overrides.is_empty());
    }

    #[test]
    fn master_broadcast_always_carries_both_flags() {
        let state = FloorState::new(&symbols());
        match state.set_master(Some(Toggle::Off), None) {
            ServerMessage::MasterStateUpdate {
                master_maker,
                master_taker,
            } => {
                assert_eq!(master_maker, Some(Toggle::Off));
                assert_eq!(master_taker, Some(Toggle::On));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn tick_walks_numeric_fields_and_logs_them() {
        let state = FloorState::new(&symbols());
        state.apply_edit(&edit("ESM5", "ask_edge", Some(CellValue::Number(5.0))));
        state.tick();

        let page = state.log_page();
        // Two symbols x four numeric fields, plus one override row.
        assert_eq!(page.logs.len(), 9);
        let override_rows: Vec<_> = page.logs.iter().filter(|row| row.is_override).collect();
        assert_eq!(override_rows.len(), 1);
        assert_eq!(override_rows[0].user_id.as_deref(), Some("user_42"));
        // Every row in one tick shares a timestamp, so clients can group.
        assert!(page
            .logs
            .iter()
            .all(|row| row.timestamp == page.logs[0].timestamp));
    }

    #[test]
    fn log_ring_is_bounded() {
        let state = FloorState::new(&symbols());
        // 8 rows per tick; 80 ticks overflow the 512-row cap.
        for _ in 0..80 {
            state.tick();
        }
        assert_eq!(state.log_page().logs.len(), LOG_CAP);
    }

    #[test]
    fn toggles_survive_ticks_untouched() {
        let state = FloorState::new(&symbols());
        state.apply_edit(&edit("ESM5", "taker", Some(CellValue::Toggle(Toggle::On))));
        state.tick();
        let cell = cell_of(&state.cell_update(), "ESM5", "taker");
        assert_eq!(cell.value, Some(CellValue::Toggle(Toggle::On)));
    }
}
