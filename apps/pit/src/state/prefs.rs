//! Per-user display orders for columns and symbol rows.
//!
//! Orders arrive as full permutations and are validated against the default
//! sets before they take effect. Anything that is not an exact permutation
//! of the defaults, or that belongs to another user, leaves the current
//! order untouched.

use std::collections::HashSet;

use pit_proto::fields;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Columns,
    Symbols,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderOutcome {
    Applied,
    ForeignUser,
    Malformed,
}

#[derive(Debug, Clone)]
pub struct OrderPrefs {
    columns: Vec<String>,
    symbols: Vec<String>,
    default_columns: Vec<String>,
    default_symbols: Vec<String>,
}

impl OrderPrefs {
    pub fn new(symbols: &[String]) -> Self {
        let columns = fields::default_column_order();
        OrderPrefs {
            columns: columns.clone(),
            symbols: symbols.to_vec(),
            default_columns: columns,
            default_symbols: symbols.to_vec(),
        }
    }

    /// Active column order, left to right.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Active symbol order, top to bottom.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Apply an order update addressed to `user_id`. Only updates for the
    /// local identity `me` are honored, and only exact permutations of the
    /// default set are accepted.
    pub fn apply(
        &mut self,
        kind: OrderKind,
        user_id: &str,
        order: &[String],
        me: &str,
    ) -> OrderOutcome {
        if user_id != me {
            return OrderOutcome::ForeignUser;
        }
        let (target, defaults) = match kind {
            OrderKind::Columns => (&mut self.columns, &self.default_columns),
            OrderKind::Symbols => (&mut self.symbols, &self.default_symbols),
        };
        if !is_permutation(order, defaults) {
            return OrderOutcome::Malformed;
        }
        *target = order.to_vec();
        OrderOutcome::Applied
    }
}

fn is_permutation(order: &[String], defaults: &[String]) -> bool {
    if order.len() != defaults.len() {
        return false;
    }
    let known: HashSet<&str> = defaults.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    order
        .iter()
        .all(|item| known.contains(item.as_str()) && seen.insert(item.as_str()))
}

/// New order produced by moving the item at `from` to position `to`.
/// Out-of-range indices return the order unchanged.
pub fn moved(order: &[String], from: usize, to: usize) -> Vec<String> {
    let mut next = order.to_vec();
    if from < next.len() && to < next.len() {
        let item = next.remove(from);
        next.insert(to, item);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> Vec<String> {
        ["ESM5", "NQM5", "TYM5", "TUM5"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn order(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_permutation_is_applied() {
        let mut prefs = OrderPrefs::new(&symbols());
        let next = order(&["TUM5", "TYM5", "NQM5", "ESM5"]);
        let outcome = prefs.apply(OrderKind::Symbols, "user_42", &next, "user_42");
        assert_eq!(outcome, OrderOutcome::Applied);
        assert_eq!(prefs.symbols(), next.as_slice());
    }

    #[test]
    fn foreign_user_order_is_ignored() {
        let mut prefs = OrderPrefs::new(&symbols());
        let before = prefs.symbols().to_vec();
        let next = order(&["TUM5", "TYM5", "NQM5", "ESM5"]);
        let outcome = prefs.apply(OrderKind::Symbols, "user_99", &next, "user_42");
        assert_eq!(outcome, OrderOutcome::ForeignUser);
        assert_eq!(prefs.symbols(), before.as_slice());
    }

    #[test]
    fn wrong_length_order_is_rejected() {
        let mut prefs = OrderPrefs::new(&symbols());
        let before = prefs.symbols().to_vec();
        let outcome = prefs.apply(
            OrderKind::Symbols,
            "user_42",
            &order(&["ESM5", "NQM5"]),
            "user_42",
        );
        assert_eq!(outcome, OrderOutcome::Malformed);
        assert_eq!(prefs.symbols(), before.as_slice());
    }

    #[test]
    fn duplicates_of_correct_length_are_rejected() {
        let mut prefs = OrderPrefs::new(&symbols());
        let before = prefs.symbols().to_vec();
        let outcome = prefs.apply(
            OrderKind::Symbols,
            "user_42",
            &order(&["ESM5", "ESM5", "TYM5", "TUM5"]),
            "user_42",
        );
        assert_eq!(outcome, OrderOutcome::Malformed);
        assert_eq!(prefs.symbols(), before.as_slice());
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut prefs = OrderPrefs::new(&symbols());
        let outcome = prefs.apply(
            OrderKind::Symbols,
            "user_42",
            &order(&["ESM5", "NQM5", "TYM5", "CLM5"]),
            "user_42",
        );
        assert_eq!(outcome, OrderOutcome::Malformed);
    }

    #[test]
    fn column_defaults_come_from_the_registry() {
        let prefs = OrderPrefs::new(&symbols());
        assert_eq!(prefs.columns().len(), 10);
        assert_eq!(prefs.columns()[0], "bid_edge");
        assert_eq!(prefs.columns()[9], "taker");
    }

    #[test]
    fn moved_reorders_like_a_drag() {
        let base = order(&["a", "b", "c", "d"]);
        assert_eq!(moved(&base, 0, 2), order(&["b", "c", "a", "d"]));
        assert_eq!(moved(&base, 3, 0), order(&["d", "a", "b", "c"]));
        assert_eq!(moved(&base, 1, 9), base);
    }
}
