//! Connection channel to the floor.
//!
//! Intents flow one way through a [`ChannelHandle`]; pushes and lifecycle
//! changes come back as [`ChannelEvent`]s in arrival order. The handle is
//! deliberately fire-and-forget: senders never learn whether the floor
//! accepted an intent, they only see the eventual broadcast.

pub mod websocket;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pit_proto::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tracing::warn;

/// What the channel feeds into the client loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Socket established (or re-established after a drop).
    Connected,
    /// One decoded server push.
    Message(ServerMessage),
    /// Socket lost. State is kept as-is until a new snapshot arrives.
    Disconnected,
}

/// Cloneable sender half of the channel.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    tx: mpsc::UnboundedSender<ClientMessage>,
    open: Arc<AtomicBool>,
}

impl ChannelHandle {
    /// Queue an intent for the socket. Dropped with a warning when the
    /// connection is down; there is no local retry queue.
    pub fn send(&self, msg: ClientMessage) {
        if !self.is_open() {
            warn!("dropping intent; channel is closed");
            return;
        }
        if self.tx.send(msg).is_err() {
            warn!("dropping intent; channel task is gone");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Loopback handle: intents land in the returned receiver instead of a
    /// socket. This is how the dispatcher is exercised in tests.
    pub fn pair() -> (ChannelHandle, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ChannelHandle {
            tx,
            open: Arc::new(AtomicBool::new(true)),
        };
        (handle, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pit_proto::TaggedIntent;

    #[test]
    fn loopback_delivers_intents() {
        let (handle, mut rx) = ChannelHandle::pair();
        handle.send(ClientMessage::Tagged(TaggedIntent::MasterState {
            master_maker: Some(pit_proto::Toggle::Off),
            master_taker: None,
        }));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn send_after_receiver_drop_does_not_panic() {
        let (handle, rx) = ChannelHandle::pair();
        drop(rx);
        handle.send(ClientMessage::Tagged(TaggedIntent::SymbolOrder {
            user_id: "user_42".to_string(),
            order: vec![],
        }));
    }
}
