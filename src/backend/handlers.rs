//! Push frame routing and outbound message encoding
//!
//! The push channel carries two kinds of text frames on one socket: chat
//! messages and presence broadcasts. Presence frames are recognized by shape
//! (`{"userId", "online"}`); everything else is forwarded as a chat payload
//! and parsed by the store, which owns the malformed-input policy.

use crossbeam_channel::Sender;
use tokio_tungstenite::tungstenite::Message;

use crate::error::Result;
use crate::protocol::{ChatEvent, OutgoingMessage, PresenceUpdate};

/// Route a text frame to the matching front-end event.
pub fn route_frame(text: &str, event_tx: &Sender<ChatEvent>) {
    let event = match serde_json::from_str::<PresenceUpdate>(text) {
        Ok(update) => ChatEvent::Presence(update),
        Err(_) => ChatEvent::PushPayload(text.to_string()),
    };
    let _ = event_tx.send(event);
}

/// Route a raw WebSocket frame. Returns false once the peer closed.
pub fn route_message(msg: Message, event_tx: &Sender<ChatEvent>) -> bool {
    match msg {
        Message::Text(text) => {
            route_frame(&text, event_tx);
            true
        }
        Message::Binary(bytes) => {
            match String::from_utf8(bytes) {
                Ok(text) => route_frame(&text, event_tx),
                Err(_) => tracing::warn!("dropping non-UTF-8 binary frame"),
            }
            true
        }
        Message::Close(frame) => {
            tracing::debug!(?frame, "push channel closed by server");
            false
        }
        // Ping/pong are answered by tungstenite
        _ => true,
    }
}

/// Encode an outbound chat message as a text frame.
pub fn encode_outgoing(msg: &OutgoingMessage) -> Result<Message> {
    Ok(Message::Text(serde_json::to_string(msg)?))
}
