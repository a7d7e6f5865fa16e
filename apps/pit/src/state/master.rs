//! Master enable switches for the two toggle columns.
//!
//! Both switches start ON; the floor only pushes them once someone flips
//! one. A disabled switch changes how toggle cells render and blocks their
//! intents, but the underlying cell data is never rewritten.

use pit_proto::Toggle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterKind {
    Maker,
    Taker,
}

impl MasterKind {
    pub fn for_field(field: &str) -> Option<MasterKind> {
        match field {
            "maker" => Some(MasterKind::Maker),
            "taker" => Some(MasterKind::Taker),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterState {
    pub maker: Toggle,
    pub taker: Toggle,
}

impl Default for MasterState {
    fn default() -> Self {
        MasterState {
            maker: Toggle::On,
            taker: Toggle::On,
        }
    }
}

impl MasterState {
    /// Fold in a push that may carry either flag, both, or neither.
    pub fn apply(&mut self, maker: Option<Toggle>, taker: Option<Toggle>) {
        if let Some(value) = maker {
            self.maker = value;
        }
        if let Some(value) = taker {
            self.taker = value;
        }
    }

    pub fn flag(&self, kind: MasterKind) -> Toggle {
        match kind {
            MasterKind::Maker => self.maker,
            MasterKind::Taker => self.taker,
        }
    }

    pub fn set(&mut self, kind: MasterKind, value: Toggle) {
        match kind {
            MasterKind::Maker => self.maker = value,
            MasterKind::Taker => self.taker = value,
        }
    }

    pub fn enabled(&self, kind: MasterKind) -> bool {
        self.flag(kind).is_on()
    }
}
