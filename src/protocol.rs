//! Wire types and the channel protocol between the front end and the backend.

use serde::{Deserialize, Serialize};

/// A chat message as delivered by the push channel.
///
/// `group_id` selects group routing; otherwise `receiver_id` names the other
/// party when we are the sender.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub receiver_name: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
}

/// A message handed to the transport for delivery.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
}

/// One direct conversation from the history endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub receiver_id: String,
    #[serde(default)]
    pub receiver_name: Option<String>,
    #[serde(default)]
    pub messages: Vec<SnapshotMessage>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    pub content: String,
    /// Display-formatted send time, e.g. "Today, 9:55 am".
    pub sent_at: String,
    /// True when the local user sent it.
    #[serde(default)]
    pub sender: bool,
}

/// Presence broadcast for a user.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    pub user_id: String,
    pub online: bool,
}

/// Actions sent from the front end to the Backend
#[derive(Debug, Clone)]
pub enum BackendAction {
    /// Open the push socket
    Connect { url: String },
    /// Close the push socket
    Disconnect,
    /// Fetch conversation history once
    FetchSnapshot { url: String },
    /// Hand a message to the transport
    SendMessage(OutgoingMessage),
    /// Stop the backend loop
    Shutdown,
}

/// Events sent from the Backend to the front end
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Push socket is open
    Connected,
    /// Push socket closed
    Disconnected(String),
    /// Transport error
    Error(String),
    /// A raw chat frame from the push channel
    PushPayload(String),
    /// Presence changed for a user
    Presence(PresenceUpdate),
    /// History endpoint answered
    SnapshotLoaded(Vec<SnapshotRecord>),
    /// History endpoint failed
    SnapshotFailed(String),
}
