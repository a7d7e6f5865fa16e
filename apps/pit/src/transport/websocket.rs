//! WebSocket channel with a reconnect supervisor.
//!
//! The supervisor owns the outbound queue across connection attempts: dial,
//! pump frames until the socket drops, report, back off, redial. Backoff
//! doubles from `base` up to `cap` and resets after a successful connect.
//! With reconnect disabled the supervisor exits after the first drop and
//! the client keeps its last known state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pit_proto::{decode_server_message, encode_client_message, ClientMessage};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{ChannelEvent, ChannelHandle};

#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub base: Duration,
    pub cap: Duration,
}

impl ReconnectPolicy {
    pub fn with_enabled(enabled: bool) -> Self {
        ReconnectPolicy {
            enabled,
            ..ReconnectPolicy::default()
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            enabled: true,
            base: Duration::from_millis(250),
            cap: Duration::from_secs(15),
        }
    }
}

/// Spawn the channel supervisor for `url`. The returned handle accepts
/// intents for the lifetime of the task; lifecycle events and decoded
/// pushes arrive on the receiver.
pub fn spawn(
    url: String,
    policy: ReconnectPolicy,
) -> (
    ChannelHandle,
    mpsc::UnboundedReceiver<ChannelEvent>,
    JoinHandle<()>,
) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let open = Arc::new(AtomicBool::new(false));
    let handle = ChannelHandle {
        tx: out_tx,
        open: open.clone(),
    };
    let task = tokio::spawn(supervise(url, policy, out_rx, event_tx, open));
    (handle, event_rx, task)
}

async fn supervise(
    url: String,
    policy: ReconnectPolicy,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    open: Arc<AtomicBool>,
) {
    let mut backoff = policy.base;
    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!(%url, "connected to floor");
                backoff = policy.base;
                open.store(true, Ordering::SeqCst);
                if events.send(ChannelEvent::Connected).is_err() {
                    return;
                }
                pump(stream, &mut outbound, &events).await;
                open.store(false, Ordering::SeqCst);
                info!(%url, "connection to floor lost");
                if events.send(ChannelEvent::Disconnected).is_err() {
                    return;
                }
            }
            Err(err) => {
                warn!(%url, error = %err, "connect failed");
            }
        }
        if !policy.enabled {
            debug!("reconnect disabled; leaving channel closed");
            return;
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(policy.cap);
    }
}

/// Pump one live socket until it drops or the client goes away.
async fn pump(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    outbound: &mut mpsc::UnboundedReceiver<ClientMessage>,
    events: &mpsc::UnboundedSender<ChannelEvent>,
) {
    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            intent = outbound.recv() => {
                let Some(intent) = intent else {
                    // Every handle is gone; say goodbye and stop.
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                };
                match encode_client_message(&intent) {
                    Ok(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => warn!(error = %err, "failed to encode intent"),
                }
            }
            frame = source.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if !forward_push(&text, events) {
                            return;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => {
                            if !forward_push(&text, events) {
                                return;
                            }
                        }
                        Err(_) => debug!("ignoring non-utf8 binary frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "websocket read failed");
                        return;
                    }
                }
            }
        }
    }
}

/// Decode and forward one push. Malformed frames are logged and skipped so
/// a bad producer cannot take the client down. Returns false once the
/// client side of the event queue is gone.
fn forward_push(text: &str, events: &mpsc::UnboundedSender<ChannelEvent>) -> bool {
    match decode_server_message(text) {
        Ok(msg) => events.send(ChannelEvent::Message(msg)).is_ok(),
        Err(err) => {
            warn!(error = %err, "skipping malformed server frame");
            true
        }
    }
}
