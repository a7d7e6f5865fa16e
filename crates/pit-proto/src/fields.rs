//! Static registry of grid columns and the instruments served by default.
//!
//! Column ids double as wire field names. Override columns share storage with
//! their base field; [`ColumnSpec::base_field`] strips the suffix so both
//! views address the same cell.

pub const OVERRIDE_SUFFIX: &str = "_override";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub editable: bool,
}

impl ColumnSpec {
    /// True for the editable `*_override` companion columns.
    pub fn is_override(&self) -> bool {
        self.id.ends_with(OVERRIDE_SUFFIX)
    }

    /// Wire field this column reads from and writes to.
    pub fn base_field(&self) -> &'static str {
        self.id
            .strip_suffix(OVERRIDE_SUFFIX)
            .unwrap_or(self.id)
    }
}

pub const COLUMNS: [ColumnSpec; 10] = [
    ColumnSpec {
        id: "bid_edge",
        label: "Bid Edge",
        kind: FieldKind::Numeric,
        editable: false,
    },
    ColumnSpec {
        id: "bid_edge_override",
        label: "Bid Edge Override",
        kind: FieldKind::Numeric,
        editable: true,
    },
    ColumnSpec {
        id: "ask_edge",
        label: "Ask Edge",
        kind: FieldKind::Numeric,
        editable: false,
    },
    ColumnSpec {
        id: "ask_edge_override",
        label: "Ask Edge Override",
        kind: FieldKind::Numeric,
        editable: true,
    },
    ColumnSpec {
        id: "bid_q",
        label: "Bid Q",
        kind: FieldKind::Numeric,
        editable: false,
    },
    ColumnSpec {
        id: "bid_q_override",
        label: "Bid Q Override",
        kind: FieldKind::Numeric,
        editable: true,
    },
    ColumnSpec {
        id: "ask_q",
        label: "Ask Q",
        kind: FieldKind::Numeric,
        editable: false,
    },
    ColumnSpec {
        id: "ask_q_override",
        label: "Ask Q Override",
        kind: FieldKind::Numeric,
        editable: true,
    },
    ColumnSpec {
        id: "maker",
        label: "Maker",
        kind: FieldKind::Toggle,
        editable: true,
    },
    ColumnSpec {
        id: "taker",
        label: "Taker",
        kind: FieldKind::Toggle,
        editable: true,
    },
];

/// Numeric base fields walked by the pricing engine each tick.
pub const NUMERIC_FIELDS: [&str; 4] = ["bid_edge", "ask_edge", "bid_q", "ask_q"];

/// Toggle base fields gated by the master switches.
pub const TOGGLE_FIELDS: [&str; 2] = ["maker", "taker"];

pub const DEFAULT_SYMBOLS: [&str; 4] = ["ESM5", "NQM5", "TYM5", "TUM5"];

pub fn column(id: &str) -> Option<&'static ColumnSpec> {
    COLUMNS.iter().find(|col| col.id == id)
}

pub fn default_column_order() -> Vec<String> {
    COLUMNS.iter().map(|col| col.id.to_string()).collect()
}

/// All base fields a symbol carries, numeric and toggle alike.
pub fn base_fields() -> impl Iterator<Item = &'static str> {
    NUMERIC_FIELDS.into_iter().chain(TOGGLE_FIELDS)
}
