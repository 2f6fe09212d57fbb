//! Backend event processing (push frames, presence, history snapshots).

use chrono::Local;
use crossbeam_channel::Receiver;

use crate::protocol::ChatEvent;
use crate::store::ConversationStore;

/// Connection state and status lines shown outside any conversation.
#[derive(Debug, Default)]
pub struct SessionStatus {
    pub is_connected: bool,
    pub snapshot_loaded: bool,
    pub system_log: Vec<String>,
}

impl SessionStatus {
    fn log(&mut self, line: String) {
        let ts = Local::now().format("%H:%M:%S").to_string();
        self.system_log.push(format!("[{}] {}", ts, line));
    }
}

/// Process all pending events from the backend. Returns the number handled.
pub fn process_events(
    event_rx: &Receiver<ChatEvent>,
    store: &mut ConversationStore,
    status: &mut SessionStatus,
) -> usize {
    let mut handled = 0;
    // Drain all pending events from the backend
    while let Ok(event) = event_rx.try_recv() {
        apply_event(event, store, status);
        handled += 1;
    }
    handled
}

/// Apply a single backend event to the store.
pub fn apply_event(event: ChatEvent, store: &mut ConversationStore, status: &mut SessionStatus) {
    match event {
        ChatEvent::Connected => {
            status.is_connected = true;
            status.log("✓ Connected".into());
        }

        ChatEvent::Disconnected(reason) => {
            status.is_connected = false;
            status.log(format!("✗ Disconnected: {}", reason));
        }

        ChatEvent::Error(msg) => {
            tracing::warn!(error = %msg, "backend error");
            status.log(format!("⚠ Error: {}", msg));
        }

        ChatEvent::PushPayload(payload) => {
            // Malformed frames are logged by the store and otherwise ignored
            let _ = store.apply_push_payload(&payload);
        }

        ChatEvent::Presence(update) => {
            store.set_presence(&update.user_id, update.online);
        }

        ChatEvent::SnapshotLoaded(records) => {
            let count = store.merge_snapshot(records);
            status.snapshot_loaded = true;
            status.log(format!("Loaded {} conversations", count));
        }

        ChatEvent::SnapshotFailed(reason) => {
            tracing::error!(error = %reason, "conversation history unavailable");
            status.log(format!("⚠ Could not load conversations: {}", reason));
        }
    }
}
