//! Reconciliation of shared cell data into what this user actually sees.
//!
//! Precedence for numeric cells: own override, then shared baseline, then
//! blank. Toggle cells read the baseline only and are forced to a
//! non-interactive ON while their master switch is disabled; the underlying
//! data is left exactly as the floor sent it. Pure functions throughout, so
//! the rules are testable without a terminal or a socket.

use pit_proto::fields::{ColumnSpec, FieldKind};
use pit_proto::{CellValue, Toggle, UserId};

use crate::state::{ClientState, MasterKind};

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayValue {
    Empty,
    Value(CellValue),
}

impl DisplayValue {
    pub fn text(&self) -> String {
        match self {
            DisplayValue::Empty => String::new(),
            DisplayValue::Value(value) => value.to_string(),
        }
    }
}

/// Another user's override on a base cell, surfaced next to the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerOverride {
    pub user_id: UserId,
    pub value: CellValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCell {
    pub value: DisplayValue,
    pub interactive: bool,
    pub peer_overrides: Vec<PeerOverride>,
}

impl RenderedCell {
    fn plain(value: DisplayValue, interactive: bool) -> Self {
        RenderedCell {
            value,
            interactive,
            peer_overrides: Vec::new(),
        }
    }
}

/// Resolve one cell of the grid for display.
pub fn render_cell(state: &ClientState, symbol: &str, column: &ColumnSpec) -> RenderedCell {
    let cell = state.grid.cell(symbol, column.base_field());
    match column.kind {
        FieldKind::Toggle => {
            let enabled = MasterKind::for_field(column.id)
                .map(|kind| state.master.enabled(kind))
                .unwrap_or(true);
            if !enabled {
                // Forced display state while the master is off. The cell's
                // real value stays untouched underneath.
                return RenderedCell::plain(
                    DisplayValue::Value(CellValue::Toggle(Toggle::On)),
                    false,
                );
            }
            // Anything other than an exact ON reads as OFF.
            let shown = match cell.value {
                Some(CellValue::Toggle(Toggle::On)) => Toggle::On,
                _ => Toggle::Off,
            };
            RenderedCell::plain(
                DisplayValue::Value(CellValue::Toggle(shown)),
                column.editable,
            )
        }
        FieldKind::Numeric => {
            let own = cell
                .overrides
                .get(&state.me)
                .map(|entry| entry.value.clone());
            if column.is_override() {
                let value = own.map(DisplayValue::Value).unwrap_or(DisplayValue::Empty);
                RenderedCell::plain(value, column.editable)
            } else {
                let value = own
                    .or(cell.value)
                    .map(DisplayValue::Value)
                    .unwrap_or(DisplayValue::Empty);
                let mut peers: Vec<PeerOverride> = cell
                    .overrides
                    .iter()
                    .filter(|(user_id, _)| user_id.as_str() != state.me)
                    .map(|(user_id, entry)| PeerOverride {
                        user_id: user_id.clone(),
                        value: entry.value.clone(),
                    })
                    .collect();
                peers.sort_by(|a, b| a.user_id.cmp(&b.user_id));
                RenderedCell {
                    value,
                    interactive: false,
                    peer_overrides: peers,
                }
            }
        }
    }
}
