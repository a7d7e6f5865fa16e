//! Terminal client for the live trading parameter grid.
//!
//! Everything the floor tells us flows through one event loop in
//! [`client::GridClient`]; the stores in [`state`] change only there, and
//! the pure rules in [`view`] decide what each cell looks like for this
//! user. Outbound edits go through [`intent`] and become visible only when
//! the floor broadcasts them back.

pub mod client;
pub mod config;
pub mod identity;
pub mod intent;
pub mod logs;
pub mod state;
pub mod transport;
pub mod view;
