//! WebSocket hub: accept a peer, seed it with the current grid, relay its
//! intents, and fan every resulting update out to all peers.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use pit_proto::{decode_client_message, encode_server_message, ClientMessage, TaggedIntent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::FloorState;

pub async fn ws_handler(State(state): State<Arc<FloorState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<FloorState>) {
    let peer_id = Uuid::new_v4();
    let (tx, mut outbound) = mpsc::unbounded_channel::<String>();
    state.register_peer(peer_id, tx);
    info!(%peer_id, peers = state.peer_count(), "peer connected");

    let (mut sink, mut stream) = socket.split();

    // Every connection opens with a full snapshot; reconnecting clients
    // rebuild their whole state from this one frame.
    match encode_server_message(&state.initial_data()) {
        Ok(frame) => {
            if sink.send(Message::Text(frame)).await.is_err() {
                state.unregister_peer(&peer_id);
                return;
            }
        }
        Err(err) => {
            warn!(%peer_id, error = %err, "failed to encode initial data");
            state.unregister_peer(&peer_id);
            return;
        }
    }

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if sink.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => handle_intent(&state, &text),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(%peer_id, error = %err, "websocket read failed");
                        break;
                    }
                }
            }
        }
    }

    state.unregister_peer(&peer_id);
    info!(%peer_id, peers = state.peer_count(), "peer disconnected");
}

fn handle_intent(state: &FloorState, text: &str) {
    let msg = match decode_client_message(text) {
        Ok(msg) => msg,
        Err(err) => {
            warn!(error = %err, "skipping malformed client frame");
            return;
        }
    };
    let broadcastable = match msg {
        ClientMessage::CellEdit(edit) => {
            state.apply_edit(&edit);
            state.cell_update()
        }
        ClientMessage::Tagged(TaggedIntent::ColumnOrder { user_id, order }) => {
            state.set_column_order(user_id, order)
        }
        ClientMessage::Tagged(TaggedIntent::SymbolOrder { user_id, order }) => {
            state.set_symbol_order(user_id, order)
        }
        ClientMessage::Tagged(TaggedIntent::MasterState {
            master_maker,
            master_taker,
        }) => state.set_master(master_maker, master_taker),
    };
    state.broadcast(&broadcastable);
}
