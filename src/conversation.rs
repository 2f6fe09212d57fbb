use std::fmt;

use crate::time::Timestamp;

/// Group id for group chats, counterpart user id for direct chats.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey(String);

impl ConversationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ConversationKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ConversationKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversationKind {
    Direct,
    Group,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Sent,
    Received,
}

/// A single chat message. Never mutated once appended.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub content: String,
    pub timestamp: Timestamp,
    pub direction: Direction,
    /// Display name of the sender for messages from others; `None` for our own.
    pub sender_name: Option<String>,
}

impl Message {
    pub fn sent(content: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            content: content.into(),
            timestamp,
            direction: Direction::Sent,
            sender_name: None,
        }
    }

    pub fn received(
        content: impl Into<String>,
        timestamp: Timestamp,
        sender_name: Option<String>,
    ) -> Self {
        Self {
            content: content.into(),
            timestamp,
            direction: Direction::Received,
            sender_name,
        }
    }

    pub fn is_sent(&self) -> bool {
        self.direction == Direction::Sent
    }

    /// Identity used when reconciling fetched history against pushed messages.
    pub(crate) fn merge_key(&self) -> (Direction, String, Option<i64>) {
        (self.direction, self.content.clone(), self.timestamp.minute_bucket())
    }
}

/// One aggregated chat thread (direct or group).
#[derive(Clone, Debug)]
pub struct Conversation {
    pub key: ConversationKey,
    pub kind: ConversationKind,
    pub name: String,
    pub initials: String,
    /// Presence of the counterpart. Always false for groups.
    pub is_online: bool,
    /// Known member count. Groups only.
    pub member_count: Option<usize>,
    pub messages: Vec<Message>,
    pub last_updated: Timestamp,
    pub unread_count: usize,
    /// Local sends not yet echoed back by the server, as (content, time).
    pending_echoes: Vec<(String, Timestamp)>,
}

impl Conversation {
    pub fn direct(key: ConversationKey, name: &str, created: Timestamp) -> Self {
        Self {
            key,
            kind: ConversationKind::Direct,
            name: name.to_string(),
            initials: user_initials(name),
            is_online: false,
            member_count: None,
            messages: Vec::new(),
            last_updated: created,
            unread_count: 0,
            pending_echoes: Vec::new(),
        }
    }

    pub fn group(key: ConversationKey, name: &str, created: Timestamp) -> Self {
        Self {
            key,
            kind: ConversationKind::Group,
            name: name.to_string(),
            initials: group_initials(name),
            is_online: false,
            member_count: None,
            messages: Vec::new(),
            last_updated: created,
            unread_count: 0,
            pending_echoes: Vec::new(),
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind == ConversationKind::Group
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a message. Identical messages are kept; each one is a
    /// separate delivery.
    pub fn add_message(&mut self, msg: Message, is_active: bool) {
        if !is_active && !msg.is_sent() {
            self.unread_count += 1;
        }
        self.touch(&msg.timestamp);
        self.messages.push(msg);
    }

    /// Append a locally composed message and expect the server to echo it.
    pub fn add_local_send(&mut self, msg: Message) {
        self.pending_echoes
            .push((msg.content.clone(), msg.timestamp.clone()));
        self.add_message(msg, true);
    }

    /// Consume the pending echo matching this sent message, if any. Each
    /// local send absorbs at most one echo.
    pub fn take_pending_echo(&mut self, content: &str, timestamp: &Timestamp) -> bool {
        match self
            .pending_echoes
            .iter()
            .position(|(c, t)| c == content && t == timestamp)
        {
            Some(idx) => {
                self.pending_echoes.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear_unread(&mut self) {
        self.unread_count = 0;
    }

    /// Advance `last_updated` if `timestamp` is newer.
    pub(crate) fn touch(&mut self, timestamp: &Timestamp) {
        if timestamp.chronological_cmp(&self.last_updated).is_gt() {
            self.last_updated = timestamp.clone();
        }
    }

    /// Recompute `last_updated` from the message list.
    pub(crate) fn refresh_last_updated(&mut self) {
        if let Some(latest) = self
            .messages
            .iter()
            .map(|m| &m.timestamp)
            .max_by(|a, b| a.chronological_cmp(b))
        {
            self.last_updated = latest.clone();
        }
    }

    /// Last message preview for the conversation list.
    pub fn preview(&self) -> String {
        let Some(last) = self.last_message() else {
            return String::new();
        };
        if last.is_sent() {
            return format!("You: {}", last.content);
        }
        match (&last.sender_name, self.kind) {
            (Some(sender), ConversationKind::Group) => format!("{}: {}", sender, last.content),
            _ => last.content.clone(),
        }
    }

    /// Member count shown in the group header. Groups learned about only
    /// through push traffic have no roster, so two members are assumed.
    pub fn member_count_label(&self) -> String {
        format!("{} members", self.member_count.unwrap_or(2))
    }
}

/// Initials for a group avatar: first letter of the first and last word after
/// stripping punctuation, uppercased. A single word yields one letter.
pub fn group_initials(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let first_letter = |w: &str| {
        w.chars()
            .next()
            .map(|c| c.to_uppercase().collect::<String>())
            .unwrap_or_default()
    };
    match words.as_slice() {
        [] => String::new(),
        [only] => first_letter(*only),
        [first, .., last] => format!("{}{}", first_letter(*first), first_letter(*last)),
    }
}

/// Initials for a user avatar: the first letter of every name token, as typed.
pub fn user_initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|token| token.chars().next())
        .collect()
}
