//! Plain-text rendering of the conversation list and transcripts.

use chrono::{DateTime, Local};

use crate::conversation::{Conversation, ConversationKind, Message};
use crate::time::{display_time, message_time};

const PREVIEW_WIDTH: usize = 40;

/// One conversation list entry, e.g.
/// `[AS] Alice Smith ● (2) · Today, 9:55 am · You: see you`.
pub fn list_row(conv: &Conversation, now: &DateTime<Local>) -> String {
    let mut row = format!("[{}] {}", conv.initials, conv.name);
    if !conv.is_group() && conv.is_online {
        row.push_str(" ●");
    }
    if conv.unread_count > 0 {
        row.push_str(&format!(" ({})", conv.unread_count));
    }
    let when = display_time(&conv.last_updated, now);
    if !when.is_empty() {
        row.push_str(" · ");
        row.push_str(&when);
    }
    let preview = conv.preview();
    if !preview.is_empty() {
        row.push_str(" · ");
        row.push_str(&truncate(&preview, PREVIEW_WIDTH));
    }
    row
}

/// Transcript header: the name plus presence for direct chats, member count
/// for groups.
pub fn header(conv: &Conversation) -> String {
    match conv.kind {
        ConversationKind::Direct => {
            let presence = if conv.is_online { "online" } else { "offline" };
            format!("{} ({})", conv.name, presence)
        }
        ConversationKind::Group => format!("{} ({})", conv.name, conv.member_count_label()),
    }
}

/// A single transcript line. Received direct messages carry no sender name,
/// so `counterpart` is shown instead.
pub fn transcript_line(msg: &Message, counterpart: &str, now: &DateTime<Local>) -> String {
    let who = if msg.is_sent() {
        "You"
    } else {
        msg.sender_name.as_deref().unwrap_or(counterpart)
    };
    let when = message_time(&msg.timestamp, now);
    if when.is_empty() {
        format!("{}: {}", who, msg.content)
    } else {
        format!("[{}] {}: {}", when, who, msg.content)
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", cut)
}
