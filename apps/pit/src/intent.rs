//! Outbound intents.
//!
//! Every edit goes to the floor and comes back as a broadcast before it is
//! visible; nothing here applies optimistically. The single exception is
//! the master switch, which flips locally at the same time it is sent so
//! the gate feels immediate even when the floor is slow.

use pit_proto::fields::{ColumnSpec, FieldKind};
use pit_proto::{CellEdit, CellValue, ClientMessage, TaggedIntent, Toggle, UserId};
use tracing::{debug, warn};

use crate::state::{ClientState, MasterKind, MasterState};
use crate::transport::ChannelHandle;
use crate::view::{self, DisplayValue};

pub struct IntentDispatcher {
    me: UserId,
    channel: ChannelHandle,
}

impl IntentDispatcher {
    pub fn new(me: UserId, channel: ChannelHandle) -> Self {
        IntentDispatcher { me, channel }
    }

    /// Send a numeric edit for an override column. Empty input clears the
    /// override; input that does not parse is refused locally and nothing
    /// is sent. Returns whether an intent went out.
    pub fn commit_edit(&self, symbol: &str, column: &ColumnSpec, input: &str) -> bool {
        if column.kind != FieldKind::Numeric || !column.editable {
            return false;
        }
        let trimmed = input.trim();
        let value = if trimmed.is_empty() {
            None
        } else {
            match trimmed.parse::<f64>() {
                Ok(n) => Some(CellValue::Number(n)),
                Err(_) => {
                    warn!(input = trimmed, column = column.id, "refusing unparsable edit");
                    return false;
                }
            }
        };
        self.channel.send(ClientMessage::CellEdit(CellEdit {
            cell_id: column.base_field().to_string(),
            value,
            user_id: self.me.clone(),
            symbol: symbol.to_string(),
        }));
        true
    }

    /// Clear this user's override on a column.
    pub fn clear_edit(&self, symbol: &str, column: &ColumnSpec) -> bool {
        self.commit_edit(symbol, column, "")
    }

    /// Flip a toggle cell. Refused while the column's master switch is off;
    /// otherwise the inverse of the currently displayed value is sent and
    /// the display changes only when the floor echoes it back.
    pub fn toggle_cell(&self, state: &ClientState, symbol: &str, column: &ColumnSpec) -> bool {
        let Some(kind) = MasterKind::for_field(column.id) else {
            return false;
        };
        if !state.master.enabled(kind) {
            debug!(column = column.id, "toggle refused while master is off");
            return false;
        }
        let rendered = view::render_cell(state, symbol, column);
        let current = match rendered.value {
            DisplayValue::Value(CellValue::Toggle(t)) => t,
            _ => Toggle::Off,
        };
        self.channel.send(ClientMessage::CellEdit(CellEdit {
            cell_id: column.base_field().to_string(),
            value: Some(CellValue::Toggle(current.flipped())),
            user_id: self.me.clone(),
            symbol: symbol.to_string(),
        }));
        true
    }

    pub fn send_column_order(&self, order: Vec<String>) {
        self.channel.send(ClientMessage::Tagged(TaggedIntent::ColumnOrder {
            user_id: self.me.clone(),
            order,
        }));
    }

    pub fn send_symbol_order(&self, order: Vec<String>) {
        self.channel.send(ClientMessage::Tagged(TaggedIntent::SymbolOrder {
            user_id: self.me.clone(),
            order,
        }));
    }

    /// Flip a master switch locally and tell the floor. Only the flipped
    /// flag travels; the other is omitted from the frame entirely.
    pub fn toggle_master(&self, master: &mut MasterState, kind: MasterKind) {
        let next = master.flag(kind).flipped();
        master.set(kind, next);
        let (master_maker, master_taker) = match kind {
            MasterKind::Maker => (Some(next), None),
            MasterKind::Taker => (None, Some(next)),
        };
        self.channel.send(ClientMessage::Tagged(TaggedIntent::MasterState {
            master_maker,
            master_taker,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pit_proto::fields;
    use pit_proto::{Cell, ServerMessage};
    use std::collections::HashMap;
    use tokio::sync::mpsc::error::TryRecvError;

    fn fixture() -> (
        IntentDispatcher,
        ClientState,
        tokio::sync::mpsc::UnboundedReceiver<ClientMessage>,
    ) {
        let (handle, rx) = ChannelHandle::pair();
        let me = "user_42".to_string();
        let symbols = vec!["ESM5".to_string()];
        (
            IntentDispatcher::new(me.clone(), handle),
            ClientState::new(me, &symbols),
            rx,
        )
    }

    fn col(id: &str) -> &'static ColumnSpec {
        fields::column(id).unwrap()
    }

    #[test]
    fn edits_target_the_base_field() {
        let (dispatcher, _, mut rx) = fixture();
        assert!(dispatcher.commit_edit("ESM5", col("bid_edge_override"), "1.30"));
        match rx.try_recv().unwrap() {
            ClientMessage::CellEdit(edit) => {
                assert_eq!(edit.cell_id, "bid_edge");
                assert_eq!(edit.value, Some(CellValue::Number(1.3)));
                assert_eq!(edit.user_id, "user_42");
                assert_eq!(edit.symbol, "ESM5");
            }
            other => panic!("unexpected intent: {other:?}"),
        }
    }

    #[test]
    fn empty_input_clears_the_override() {
        let (dispatcher, _, mut rx) = fixture();
        assert!(dispatcher.commit_edit("ESM5", col("ask_q_override"), "  "));
        match rx.try_recv().unwrap() {
            ClientMessage::CellEdit(edit) => {
                assert_eq!(edit.cell_id, "ask_q");
                assert_eq!(edit.value, None);
            }
            other => panic!("unexpected intent: {other:?}"),
        }
    }

    #[test]
    fn unparsable_input_sends_nothing() {
        let (dispatcher, _, mut rx) = fixture();
        assert!(!dispatcher.commit_edit("ESM5", col("bid_edge_override"), "1.2.3"));
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn read_only_columns_cannot_be_edited() {
        let (dispatcher, _, mut rx) = fixture();
        assert!(!dispatcher.commit_edit("ESM5", col("bid_edge"), "9.99"));
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn toggle_sends_inverse_of_displayed_value() {
        let (dispatcher, mut state, mut rx) = fixture();
        let mut cells = HashMap::new();
        let mut per_field = HashMap::new();
        per_field.insert(
            "maker".to_string(),
            Cell {
                value: Some(CellValue::Toggle(Toggle::On)),
                overrides: HashMap::new(),
            },
        );
        cells.insert("ESM5".to_string(), per_field);
        state.apply(ServerMessage::InitialData {
            cell_data: cells,
            column_orders: HashMap::new(),
            symbol_orders: HashMap::new(),
        });

        assert!(dispatcher.toggle_cell(&state, "ESM5", col("maker")));
        match rx.try_recv().unwrap() {
            ClientMessage::CellEdit(edit) => {
                assert_eq!(edit.cell_id, "maker");
                assert_eq!(edit.value, Some(CellValue::Toggle(Toggle::Off)));
            }
            other => panic!("unexpected intent: {other:?}"),
        }
        // Nothing is applied locally; the cell still reads ON until an echo.
        assert_eq!(
            state.grid.cell("ESM5", "maker").value,
            Some(CellValue::Toggle(Toggle::On))
        );
    }

    #[test]
    fn toggle_refused_while_master_is_off() {
        let (dispatcher, mut state, mut rx) = fixture();
        state.apply(ServerMessage::MasterStateUpdate {
            master_maker: Some(Toggle::Off),
            master_taker: None,
        });
        assert!(!dispatcher.toggle_cell(&state, "ESM5", col("maker")));
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn master_toggle_applies_locally_and_sends_one_flag() {
        let (dispatcher, mut state, mut rx) = fixture();
        dispatcher.toggle_master(&mut state.master, MasterKind::Taker);
        assert!(!state.master.enabled(MasterKind::Taker));
        match rx.try_recv().unwrap() {
            ClientMessage::Tagged(TaggedIntent::MasterState {
                master_maker,
                master_taker,
            }) => {
                assert_eq!(master_maker, None);
                assert_eq!(master_taker, Some(Toggle::Off));
            }
            other => panic!("unexpected intent: {other:?}"),
        }
    }

    #[test]
    fn order_intents_carry_the_local_identity() {
        let (dispatcher, _, mut rx) = fixture();
        dispatcher.send_symbol_order(vec!["ESM5".to_string()]);
        match rx.try_recv().unwrap() {
            ClientMessage::Tagged(TaggedIntent::SymbolOrder { user_id, order }) => {
                assert_eq!(user_id, "user_42");
                assert_eq!(order, vec!["ESM5".to_string()]);
            }
            other => panic!("unexpected intent: {other:?}"),
        }
    }
}
