//! Conversation aggregation, separated from rendering and transport.
//!
//! `ConversationStore` owns every conversation the client knows about, keyed
//! by conversation key. Two sources feed it: push frames from the backend
//! (`apply_incoming_message`) and the one-shot history fetch
//! (`merge_snapshot`). Local sends are echoed into it optimistically before
//! the transport confirms anything. The rendering layer reads sorted keys and
//! transcripts back out and registers `on_change` listeners to learn when to
//! redraw.

use std::collections::HashMap;

use chrono::Local;
use crossbeam_channel::Sender;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::conversation::{Conversation, ConversationKey, ConversationKind, Message};
use crate::error::{ChatError, Result};
use crate::protocol::{BackendAction, IncomingMessage, OutgoingMessage, SnapshotRecord};
use crate::time::Timestamp;
use crate::validation;

/// How fetched history is reconciled with a conversation that already exists
/// (typically because a push message arrived before the fetch completed).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Union of both, de-duplicated on (direction, content, minute) and
    /// ordered by timestamp.
    #[default]
    MergeByTimestamp,
    /// Fetched history replaces whatever is stored.
    Overwrite,
}

/// The signed-in user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalUser {
    pub id: String,
    pub name: String,
}

/// The conversation currently shown in the transcript pane.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveConversation {
    pub kind: ConversationKind,
    pub key: ConversationKey,
    pub name: String,
    pub member_count: Option<usize>,
}

/// Notifications for the rendering layer.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreChange {
    /// Messages, presence or metadata of a conversation changed.
    ConversationUpdated(ConversationKey),
    /// A different conversation became active; its transcript must be redrawn.
    ActiveChanged(ConversationKey),
    /// A history snapshot was applied to this many conversations.
    SnapshotMerged(usize),
}

type Listener = Box<dyn FnMut(&StoreChange) + Send>;

pub struct ConversationStore {
    local_user: LocalUser,
    conversations: HashMap<ConversationKey, Conversation>,
    /// Keys in creation order; breaks ties when sorting.
    order: Vec<ConversationKey>,
    active: Option<ActiveConversation>,
    /// Last known presence per user id, including users we have not talked to yet.
    presence: HashMap<String, bool>,
    merge_policy: MergePolicy,
    outbound: Option<Sender<BackendAction>>,
    listeners: Vec<Listener>,
}

impl ConversationStore {
    pub fn new(local_user: LocalUser) -> Self {
        Self {
            local_user,
            conversations: HashMap::new(),
            order: Vec::new(),
            active: None,
            presence: HashMap::new(),
            merge_policy: MergePolicy::default(),
            outbound: None,
            listeners: Vec::new(),
        }
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Route local sends to the backend through `tx`.
    pub fn with_outbound(mut self, tx: Sender<BackendAction>) -> Self {
        self.outbound = Some(tx);
        self
    }

    /// Register a callback invoked after every state change.
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: FnMut(&StoreChange) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn local_user(&self) -> &LocalUser {
        &self.local_user
    }

    pub fn active(&self) -> Option<&ActiveConversation> {
        self.active.as_ref()
    }

    pub fn conversation(&self, key: &ConversationKey) -> Option<&Conversation> {
        self.conversations.get(key)
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Parse and apply a raw push frame. Malformed frames are logged and
    /// dropped without touching any conversation.
    pub fn apply_push_payload(&mut self, payload: &str) -> Result<Option<ConversationKey>> {
        let raw: IncomingMessage = serde_json::from_str(payload).map_err(|e| {
            tracing::warn!(error = %e, "dropping malformed push payload");
            ChatError::MalformedPayload(e)
        })?;
        Ok(self.apply_incoming_message(raw))
    }

    /// Apply one pushed message, creating its conversation on first sight.
    ///
    /// Returns the conversation key, or `None` when the message names no
    /// counterpart (a direct message we sent without a receiver).
    pub fn apply_incoming_message(&mut self, raw: IncomingMessage) -> Option<ConversationKey> {
        let now = Local::now();
        let timestamp = raw
            .timestamp
            .as_deref()
            .map(|t| Timestamp::parse(t, now))
            .unwrap_or(Timestamp::At(now));
        let is_sent = raw.sender_id == self.local_user.id;

        let (key, kind, name) = match (&raw.group_id, is_sent) {
            (Some(group_id), _) => (
                group_id.clone(),
                ConversationKind::Group,
                raw.group_name.clone().unwrap_or_else(|| group_id.clone()),
            ),
            (None, true) => {
                let Some(receiver_id) = raw.receiver_id.clone() else {
                    tracing::warn!(sender = %raw.sender_id, "own message without receiver, dropping");
                    return None;
                };
                let name = raw
                    .receiver_name
                    .clone()
                    .unwrap_or_else(|| receiver_id.clone());
                (receiver_id, ConversationKind::Direct, name)
            }
            (None, false) => (
                raw.sender_id.clone(),
                ConversationKind::Direct,
                raw.sender_name.clone(),
            ),
        };
        let key = ConversationKey::new(key);

        let message = if is_sent {
            Message::sent(raw.content, timestamp.clone())
        } else if kind == ConversationKind::Group {
            Message::received(raw.content, timestamp.clone(), Some(raw.sender_name))
        } else {
            Message::received(raw.content, timestamp.clone(), None)
        };

        let is_active = self.is_active(&key);
        let conv = ensure_conversation(
            &mut self.conversations,
            &mut self.order,
            &self.presence,
            &key,
            kind,
            &name,
            timestamp,
        );
        if message.is_sent() && conv.take_pending_echo(&message.content, &message.timestamp) {
            tracing::debug!(key = %key, "server echo of local send");
            return Some(key);
        }
        conv.add_message(message, is_active);
        self.notify(StoreChange::ConversationUpdated(key.clone()));
        Some(key)
    }

    /// Apply fetched history. Returns the number of conversations touched.
    pub fn merge_snapshot(&mut self, records: Vec<SnapshotRecord>) -> usize {
        let now = Local::now();
        let mut touched = Vec::with_capacity(records.len());

        for record in records {
            let key = ConversationKey::new(record.receiver_id.clone());
            let name = record
                .receiver_name
                .clone()
                .unwrap_or_else(|| record.receiver_id.clone());
            let history: Vec<Message> = record
                .messages
                .into_iter()
                .map(|m| {
                    let ts = Timestamp::parse(&m.sent_at, now);
                    if m.sender {
                        Message::sent(m.content, ts)
                    } else {
                        Message::received(m.content, ts, None)
                    }
                })
                .collect();

            let existed = self.conversations.contains_key(&key);
            let policy = self.merge_policy;
            let conv = ensure_conversation(
                &mut self.conversations,
                &mut self.order,
                &self.presence,
                &key,
                ConversationKind::Direct,
                &name,
                Timestamp::At(now),
            );

            if !existed || policy == MergePolicy::Overwrite {
                if existed {
                    tracing::debug!(key = %key, dropped = conv.messages.len(), "snapshot overwrites conversation");
                }
                // Fetched history counts as already seen
                conv.messages = history;
                conv.clear_unread();
            } else {
                let existing = std::mem::take(&mut conv.messages);
                conv.messages = merge_messages(history, existing);
            }
            conv.refresh_last_updated();
            touched.push(key);
        }

        let count = touched.len();
        tracing::info!(conversations = count, policy = ?self.merge_policy, "snapshot merged");
        for key in touched {
            self.notify(StoreChange::ConversationUpdated(key));
        }
        self.notify(StoreChange::SnapshotMerged(count));
        count
    }

    /// Optimistically append a message to the active conversation and hand it
    /// to the transport. Empty text or no active conversation is a no-op.
    pub fn send_local_message(&mut self, content: &str) -> bool {
        if validation::validate_message(content).is_err() {
            return false;
        }
        let Some(active) = self.active.clone() else {
            return false;
        };
        let content = content.trim().to_string();
        let timestamp = Timestamp::now();

        let conv = ensure_conversation(
            &mut self.conversations,
            &mut self.order,
            &self.presence,
            &active.key,
            active.kind,
            &active.name,
            timestamp.clone(),
        );
        if conv.member_count.is_none() {
            conv.member_count = active.member_count;
        }
        conv.add_local_send(Message::sent(content.clone(), timestamp.clone()));

        let (receiver_id, receiver_name, group_id, group_name) = match active.kind {
            ConversationKind::Direct => (
                Some(active.key.to_string()),
                Some(active.name.clone()),
                None,
                None,
            ),
            ConversationKind::Group => (
                None,
                None,
                Some(active.key.to_string()),
                Some(active.name.clone()),
            ),
        };
        let outgoing = OutgoingMessage {
            sender_id: self.local_user.id.clone(),
            sender_name: self.local_user.name.clone(),
            content,
            timestamp: timestamp.to_wire(),
            receiver_id,
            receiver_name,
            group_id,
            group_name,
        };
        match &self.outbound {
            Some(tx) => {
                if tx.send(BackendAction::SendMessage(outgoing)).is_err() {
                    tracing::warn!(key = %active.key, "backend is gone, message kept locally only");
                }
            }
            None => tracing::debug!(key = %active.key, "no transport attached"),
        }

        self.notify(StoreChange::ConversationUpdated(active.key));
        true
    }

    /// Make an existing conversation active. Unknown keys are ignored.
    pub fn select_conversation(&mut self, key: &ConversationKey) -> bool {
        let Some(conv) = self.conversations.get_mut(key) else {
            return false;
        };
        conv.clear_unread();
        self.active = Some(ActiveConversation {
            kind: conv.kind,
            key: conv.key.clone(),
            name: conv.name.clone(),
            member_count: conv.member_count,
        });
        self.notify(StoreChange::ActiveChanged(key.clone()));
        true
    }

    /// Make a direct chat with `user_id` active, whether or not any message
    /// has been exchanged yet.
    pub fn open_direct(&mut self, user_id: &str, name: &str) -> Result<ConversationKey> {
        validation::validate_user_id(user_id).map_err(ChatError::Configuration)?;
        let key = ConversationKey::new(user_id);
        if self.conversations.contains_key(&key) {
            self.select_conversation(&key);
            return Ok(key);
        }
        self.active = Some(ActiveConversation {
            kind: ConversationKind::Direct,
            key: key.clone(),
            name: name.trim().to_string(),
            member_count: None,
        });
        self.notify(StoreChange::ActiveChanged(key.clone()));
        Ok(key)
    }

    /// Start a new group chat and make it active. The conversation itself is
    /// created by the first message sent to it.
    pub fn start_group(&mut self, name: &str, member_ids: &[String]) -> Result<ConversationKey> {
        validation::validate_group_name(name).map_err(ChatError::InvalidGroup)?;
        validation::validate_group_members(member_ids).map_err(ChatError::InvalidGroup)?;

        let key = ConversationKey::new(new_group_id());
        self.active = Some(ActiveConversation {
            kind: ConversationKind::Group,
            key: key.clone(),
            name: name.trim().to_string(),
            member_count: Some(member_ids.len()),
        });
        tracing::info!(key = %key, members = member_ids.len(), "group started");
        self.notify(StoreChange::ActiveChanged(key.clone()));
        Ok(key)
    }

    /// Record presence for a user and reflect it on their direct conversation.
    pub fn set_presence(&mut self, user_id: &str, online: bool) {
        self.presence.insert(user_id.to_string(), online);
        let key = ConversationKey::new(user_id);
        if let Some(conv) = self.conversations.get_mut(&key) {
            if conv.kind == ConversationKind::Direct && conv.is_online != online {
                conv.is_online = online;
                self.notify(StoreChange::ConversationUpdated(key));
            }
        }
    }

    /// Keys ordered by most recent activity first. Ties keep creation order.
    pub fn sorted_conversation_keys(&self) -> Vec<ConversationKey> {
        let mut entries: Vec<(&ConversationKey, &Timestamp)> = self
            .order
            .iter()
            .filter_map(|key| self.conversations.get(key).map(|c| (key, &c.last_updated)))
            .collect();
        entries.sort_by(|(_, a), (_, b)| b.chronological_cmp(a));
        entries.into_iter().map(|(key, _)| key.clone()).collect()
    }

    /// Conversations in list order.
    pub fn sorted_conversations(&self) -> Vec<&Conversation> {
        self.sorted_conversation_keys()
            .iter()
            .filter_map(|key| self.conversations.get(key))
            .collect()
    }

    /// Messages of a conversation in arrival order. Unknown keys yield nothing.
    pub fn transcript_for(&self, key: &ConversationKey) -> &[Message] {
        self.conversations
            .get(key)
            .map(|c| c.messages.as_slice())
            .unwrap_or(&[])
    }

    fn is_active(&self, key: &ConversationKey) -> bool {
        self.active.as_ref().is_some_and(|a| a.key == *key)
    }

    fn notify(&mut self, change: StoreChange) {
        for listener in self.listeners.iter_mut() {
            listener(&change);
        }
    }
}

/// Ensure a conversation exists for the given key.
fn ensure_conversation<'a>(
    conversations: &'a mut HashMap<ConversationKey, Conversation>,
    order: &mut Vec<ConversationKey>,
    presence: &HashMap<String, bool>,
    key: &ConversationKey,
    kind: ConversationKind,
    name: &str,
    created: Timestamp,
) -> &'a mut Conversation {
    conversations.entry(key.clone()).or_insert_with(|| {
        tracing::debug!(key = %key, ?kind, "new conversation");
        order.push(key.clone());
        match kind {
            ConversationKind::Direct => {
                let mut conv = Conversation::direct(key.clone(), name, created);
                conv.is_online = presence.get(key.as_str()).copied().unwrap_or(false);
                conv
            }
            ConversationKind::Group => Conversation::group(key.clone(), name, created),
        }
    })
}

/// Reconcile fetched history with messages already held. History keeps its
/// order; each held message not present in it is inserted after the last
/// message that is not newer. Held messages with indeterminate time go last.
fn merge_messages(history: Vec<Message>, existing: Vec<Message>) -> Vec<Message> {
    let mut unmatched: HashMap<_, usize> = HashMap::new();
    for msg in &history {
        *unmatched.entry(msg.merge_key()).or_insert(0) += 1;
    }

    let mut merged = history;
    for msg in existing {
        if let Some(count) = unmatched.get_mut(&msg.merge_key()) {
            if *count > 0 {
                *count -= 1;
                continue;
            }
        }
        if msg.timestamp.instant().is_none() {
            merged.push(msg);
            continue;
        }
        let pos = merged
            .iter()
            .rposition(|m| m.timestamp.chronological_cmp(&msg.timestamp).is_le())
            .map(|i| i + 1)
            .unwrap_or(0);
        merged.insert(pos, msg);
    }
    merged
}

/// `group-` followed by nine base-36 characters.
fn new_group_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| std::char::from_digit(rng.random_range(0..36u32), 36).unwrap_or('0'))
        .collect();
    format!("group-{}", suffix)
}
