//! Wire protocol shared by the pit client and the floor server.
//!
//! Frames are JSON text. Server pushes carry a `type` tag; client intents do
//! too, with one legacy exception: a cell edit is a bare object with no tag
//! and is recognized by shape alone.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod fields;

/// Session-scoped user identifier, e.g. `user_k3x9q01ab`.
pub type UserId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Toggle {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl Toggle {
    pub fn flipped(self) -> Toggle {
        match self {
            Toggle::On => Toggle::Off,
            Toggle::Off => Toggle::On,
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, Toggle::On)
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toggle::On => f.write_str("ON"),
            Toggle::Off => f.write_str("OFF"),
        }
    }
}

/// A grid value as it appears on the wire: `"ON"`/`"OFF"` for toggles,
/// a JSON number for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Toggle(Toggle),
    Number(f64),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Toggle(t) => t.fmt(f),
            CellValue::Number(n) => n.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub value: CellValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// One base field of one symbol: the shared baseline plus per-user overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub value: Option<CellValue>,
    #[serde(default)]
    pub overrides: HashMap<UserId, OverrideEntry>,
}

/// Full grid payload keyed `symbol -> base field -> cell`.
pub type CellData = HashMap<String, HashMap<String, Cell>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    InitialData {
        cell_data: CellData,
        #[serde(default)]
        column_orders: HashMap<UserId, Vec<String>>,
        #[serde(default)]
        symbol_orders: HashMap<UserId, Vec<String>>,
    },
    CellUpdate {
        cell_data: CellData,
    },
    ColumnOrderUpdate {
        user_id: UserId,
        order: Vec<String>,
    },
    SymbolOrderUpdate {
        user_id: UserId,
        order: Vec<String>,
    },
    MasterStateUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        master_maker: Option<Toggle>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        master_taker: Option<Toggle>,
    },
    #[serde(other)]
    Unknown,
}

/// Intents that carry a `type` discriminator on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaggedIntent {
    ColumnOrder {
        user_id: UserId,
        order: Vec<String>,
    },
    SymbolOrder {
        user_id: UserId,
        order: Vec<String>,
    },
    MasterState {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        master_maker: Option<Toggle>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        master_taker: Option<Toggle>,
    },
}

/// The untagged cell edit. `value: None` serializes as an explicit `null`
/// and asks the server to drop this user's override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellEdit {
    pub cell_id: String,
    #[serde(default)]
    pub value: Option<CellValue>,
    pub user_id: UserId,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    Tagged(TaggedIntent),
    CellEdit(CellEdit),
}

impl From<TaggedIntent> for ClientMessage {
    fn from(intent: TaggedIntent) -> Self {
        ClientMessage::Tagged(intent)
    }
}

impl From<CellEdit> for ClientMessage {
    fn from(edit: CellEdit) -> Self {
        ClientMessage::CellEdit(edit)
    }
}

/// One row of the floor's value log. The upstream feed stringifies booleans
/// Python-style, so `is_override` travels as `"True"`/`"False"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub symbol: String,
    pub field: String,
    pub value: CellValue,
    #[serde(with = "pybool")]
    pub is_override: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// Response body of the floor's `GET /logs` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

pub mod pybool {
    use serde::de::{Deserializer, Error as _, Unexpected};
    use serde::ser::Serializer;
    use serde::Deserialize;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "True" => Ok(true),
            "False" => Ok(false),
            other => Err(D::Error::invalid_value(
                Unexpected::Str(other),
                &"\"True\" or \"False\"",
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn encode_server_message(msg: &ServerMessage) -> Result<String, WireError> {
    serde_json::to_string(msg).map_err(WireError::Encode)
}

pub fn decode_server_message(text: &str) -> Result<ServerMessage, WireError> {
    serde_json::from_str(text).map_err(WireError::Decode)
}

pub fn encode_client_message(msg: &ClientMessage) -> Result<String, WireError> {
    serde_json::to_string(msg).map_err(WireError::Encode)
}

pub fn decode_client_message(text: &str) -> Result<ClientMessage, WireError> {
    serde_json::from_str(text).map_err(WireError::Decode)
}
