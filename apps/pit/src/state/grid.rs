//! Grid state store.
//!
//! The floor ships the entire grid in every push, so this store never
//! merges: a snapshot or an update simply replaces what was there. Reads
//! never fail; an unknown symbol or field reads as a zero-value cell.

use pit_proto::{Cell, CellData};

#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    cells: CellData,
}

impl ParamGrid {
    /// Seed the store from an `initial_data` push.
    pub fn apply_snapshot(&mut self, data: CellData) {
        self.replace(data);
    }

    /// Replace the store from a `cell_update` push. Updates are full
    /// snapshots on the wire, so this is not a merge.
    pub fn apply_update(&mut self, data: CellData) {
        self.replace(data);
    }

    fn replace(&mut self, data: CellData) {
        self.cells = data;
    }

    /// Read one cell. Unknown coordinates read as an empty cell so render
    /// paths never have to handle a miss.
    ///
    /// ```
    /// use pit::state::grid::ParamGrid;
    ///
    /// let grid = ParamGrid::default();
    /// let cell = grid.cell("ESM5", "bid_edge");
    /// assert!(cell.value.is_none());
    /// assert!(cell.overrides.is_empty());
    /// ```
    pub fn cell(&self, symbol: &str, field: &str) -> Cell {
        self.cells
            .get(symbol)
            .and_then(|fields| fields.get(field))
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pit_proto::CellValue;
    use std::collections::HashMap;

    fn grid_with(symbol: &str, field: &str, value: f64) -> CellData {
        let mut fields = HashMap::new();
        fields.insert(
            field.to_string(),
            Cell {
                value: Some(CellValue::Number(value)),
                overrides: HashMap::new(),
            },
        );
        let mut data = HashMap::new();
        data.insert(symbol.to_string(), fields);
        data
    }

    #[test]
    fn unknown_coordinates_read_as_zero_value() {
        let grid = ParamGrid::default();
        assert_eq!(grid.cell("ESM5", "bid_edge"), Cell::default());
    }

    #[test]
    fn updates_replace_rather_than_merge() {
        let mut grid = ParamGrid::default();
        grid.apply_snapshot(grid_with("ESM5", "bid_edge", 1.25));
        grid.apply_update(grid_with("NQM5", "ask_edge", 2.5));

        // The old symbol is gone entirely, not layered under the new one.
        assert!(grid.cell("ESM5", "bid_edge").value.is_none());
        assert_eq!(
            grid.cell("NQM5", "ask_edge").value,
            Some(CellValue::Number(2.5))
        );
    }
}
