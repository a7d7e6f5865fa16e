//! Client-side session state: the replicated grid, this user's display
//! orders, the master switches, and the cursor.
//!
//! [`ClientState::apply`] is the only place server pushes mutate state, so
//! everything downstream of it can stay pure.

pub mod grid;
pub mod master;
pub mod prefs;

use pit_proto::fields;
use pit_proto::{ServerMessage, UserId};
use tracing::{debug, trace, warn};

pub use grid::ParamGrid;
pub use master::{MasterKind, MasterState};
pub use prefs::{OrderKind, OrderOutcome, OrderPrefs};

/// Cursor over the grid. Tracks ids, not indices, so it survives reorders.
#[derive(Debug, Clone)]
pub struct Selection {
    pub symbol: String,
    pub column: String,
    /// True while the numeric edit buffer owns the keyboard.
    pub focused: bool,
}

#[derive(Debug, Clone)]
pub struct ClientState {
    pub me: UserId,
    pub grid: ParamGrid,
    pub prefs: OrderPrefs,
    pub master: MasterState,
    pub selection: Selection,
    pub connected: bool,
}

impl ClientState {
    pub fn new(me: UserId, symbols: &[String]) -> Self {
        let prefs = OrderPrefs::new(symbols);
        let selection = Selection {
            symbol: symbols.first().cloned().unwrap_or_default(),
            column: "bid_edge".to_string(),
            focused: false,
        };
        ClientState {
            me,
            grid: ParamGrid::default(),
            prefs,
            master: MasterState::default(),
            selection,
            connected: false,
        }
    }

    /// Fold one server push into local state.
    pub fn apply(&mut self, msg: ServerMessage) {
        let me = self.me.clone();
        match msg {
            ServerMessage::InitialData {
                cell_data,
                column_orders,
                symbol_orders,
            } => {
                self.grid.apply_snapshot(cell_data);
                if let Some(order) = column_orders.get(&me) {
                    self.fold_order(OrderKind::Columns, &me, order);
                }
                if let Some(order) = symbol_orders.get(&me) {
                    self.fold_order(OrderKind::Symbols, &me, order);
                }
            }
            ServerMessage::CellUpdate { cell_data } => self.grid.apply_update(cell_data),
            ServerMessage::ColumnOrderUpdate { user_id, order } => {
                self.fold_order(OrderKind::Columns, &user_id, &order);
            }
            ServerMessage::SymbolOrderUpdate { user_id, order } => {
                self.fold_order(OrderKind::Symbols, &user_id, &order);
            }
            ServerMessage::MasterStateUpdate {
                master_maker,
                master_taker,
            } => self.master.apply(master_maker, master_taker),
            ServerMessage::Unknown => debug!("ignoring unrecognized server push"),
        }
    }

    fn fold_order(&mut self, kind: OrderKind, user_id: &str, order: &[String]) {
        match self.prefs.apply(kind, user_id, order, &self.me) {
            OrderOutcome::Applied => {}
            OrderOutcome::ForeignUser => trace!(%user_id, ?kind, "order update for another user"),
            OrderOutcome::Malformed => warn!(%user_id, ?kind, ?order, "rejected malformed order"),
        }
    }

    /// Columns the cursor can land on, in active display order.
    fn editable_columns(&self) -> Vec<&str> {
        self.prefs
            .columns()
            .iter()
            .filter(|id| {
                fields::column(id)
                    .map(|col| col.editable)
                    .unwrap_or(false)
            })
            .map(String::as_str)
            .collect()
    }

    pub fn select_left(&mut self) {
        let cols = self.editable_columns();
        if cols.is_empty() {
            return;
        }
        let next = match cols.iter().position(|id| *id == self.selection.column) {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        let column = cols[next].to_string();
        self.selection.column = column;
    }

    pub fn select_right(&mut self) {
        let cols = self.editable_columns();
        if cols.is_empty() {
            return;
        }
        let next = match cols.iter().position(|id| *id == self.selection.column) {
            Some(i) => (i + 1).min(cols.len() - 1),
            None => 0,
        };
        let column = cols[next].to_string();
        self.selection.column = column;
    }

    pub fn select_up(&mut self) {
        let symbols = self.prefs.symbols();
        if symbols.is_empty() {
            return;
        }
        let next = match symbols.iter().position(|s| *s == self.selection.symbol) {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        let symbol = symbols[next].clone();
        self.selection.symbol = symbol;
    }

    pub fn select_down(&mut self) {
        let symbols = self.prefs.symbols();
        if symbols.is_empty() {
            return;
        }
        let next = match symbols.iter().position(|s| *s == self.selection.symbol) {
            Some(i) => (i + 1).min(symbols.len() - 1),
            None => 0,
        };
        let symbol = symbols[next].clone();
        self.selection.symbol = symbol;
    }
}
