//! Slash command handling (/open, /dm, /group, etc.).

use chrono::Local;

use crate::conversation::ConversationKey;
use crate::meeting;
use crate::store::ConversationStore;
use crate::view;

pub const HELP_TEXT: &str = "\
Commands:
  /list                         show conversations, most recent first
  /open <key>                   switch to a conversation
  /dm <user-id> <name...>       start or resume a direct chat
  /group <name> <id1,id2,...>   start a group chat (two or more members)
  /link                         video meeting link for this conversation
  /help                         show this text
  /quit                         exit
Anything else is sent to the active conversation.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Not a command; the caller should treat the line as a message.
    NotACommand,
    Handled,
    /// Handled, and the active transcript was written to the output.
    Rendered,
    Quit,
}

/// Handle user commands starting with '/'. Output meant for the user is
/// appended to `output`.
pub fn handle_user_command(
    input: &str,
    store: &mut ConversationStore,
    meeting_base_url: &str,
    output: &mut Vec<String>,
) -> CommandOutcome {
    let s = input.trim();
    let Some(cmdline) = s.strip_prefix('/') else {
        return CommandOutcome::NotACommand;
    };

    let mut parts = cmdline.split_whitespace();
    let cmd = parts.next().unwrap_or("").to_lowercase();

    match cmd.as_str() {
        "list" | "ls" => {
            let now = Local::now();
            let rows = store.sorted_conversations();
            if rows.is_empty() {
                output.push("No conversations yet".into());
            }
            for conv in rows {
                let marker = if store.active().is_some_and(|a| a.key == conv.key) {
                    "*"
                } else {
                    " "
                };
                output.push(format!("{} {:<16} {}", marker, conv.key, view::list_row(conv, &now)));
            }
        }
        "open" | "o" => match parts.next() {
            Some(key) => {
                let key = ConversationKey::new(key);
                if !store.select_conversation(&key) {
                    output.push(format!("No conversation {}", key));
                } else if render_active(store, output) {
                    return CommandOutcome::Rendered;
                }
            }
            None => output.push("Usage: /open <key>".into()),
        },
        "dm" | "msg" => {
            let Some(user_id) = parts.next() else {
                output.push("Usage: /dm <user-id> <name>".into());
                return CommandOutcome::Handled;
            };
            let name = parts.collect::<Vec<_>>().join(" ");
            let name = if name.is_empty() { user_id.to_string() } else { name };
            match store.open_direct(user_id, &name) {
                Ok(_) if render_active(store, output) => return CommandOutcome::Rendered,
                Ok(_) => {}
                Err(e) => output.push(e.to_string()),
            }
        }
        "group" | "g" => {
            // The member list is the last token; everything before it is the name
            let rest: Vec<&str> = parts.collect();
            let Some((members, name)) = rest.split_last() else {
                output.push("Usage: /group <name> <id1,id2,...>".into());
                return CommandOutcome::Handled;
            };
            let member_ids: Vec<String> = members
                .split(',')
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect();
            match store.start_group(&name.join(" "), &member_ids) {
                Ok(key) => output.push(format!(
                    "Started group {} with {} members",
                    key,
                    member_ids.len()
                )),
                Err(e) => output.push(e.to_string()),
            }
        }
        "link" | "call" => match meeting::link_for_active(meeting_base_url, store.active()) {
            Some(Ok(url)) => output.push(url.to_string()),
            Some(Err(e)) => output.push(e.to_string()),
            None => output.push("Open a conversation first".into()),
        },
        "help" | "h" | "?" => output.push(HELP_TEXT.to_string()),
        "quit" | "exit" | "q" => return CommandOutcome::Quit,
        _ => output.push(format!("Unknown command: /{}", cmd)),
    }
    CommandOutcome::Handled
}

/// Header and transcript of the active conversation. Returns false when
/// nothing is active.
pub fn render_active(store: &ConversationStore, output: &mut Vec<String>) -> bool {
    let Some(active) = store.active() else {
        return false;
    };
    let now = Local::now();
    match store.conversation(&active.key) {
        Some(conv) => {
            output.push(format!("== {} ==", view::header(conv)));
            for msg in store.transcript_for(&active.key) {
                output.push(view::transcript_line(msg, &conv.name, &now));
            }
        }
        None => output.push(format!("== {} (no messages yet) ==", active.name)),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::IncomingMessage;
    use crate::store::LocalUser;

    const BASE: &str = "http://localhost:9000";

    fn store() -> ConversationStore {
        ConversationStore::new(LocalUser {
            id: "me".into(),
            name: "Me".into(),
        })
    }

    fn run(input: &str, store: &mut ConversationStore) -> (CommandOutcome, Vec<String>) {
        let mut out = Vec::new();
        let outcome = handle_user_command(input, store, BASE, &mut out);
        (outcome, out)
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        let mut store = store();
        assert_eq!(run("hello", &mut store).0, CommandOutcome::NotACommand);
        assert_eq!(run("/quit", &mut store).0, CommandOutcome::Quit);
    }

    #[test]
    fn test_dm_then_link() {
        let mut store = store();
        let (outcome, out) = run("/dm u1 Alice Smith", &mut store);
        assert_eq!(outcome, CommandOutcome::Rendered);
        assert_eq!(out, vec!["== Alice Smith (no messages yet) =="]);

        let (_, out) = run("/link", &mut store);
        assert_eq!(
            out,
            vec!["http://localhost:9000/videocall?roomID=room_u1&meetingName=Alice+Smith"]
        );
    }

    #[test]
    fn test_group_command() {
        let mut store = store();
        let (_, out) = run("/group Case Review Team u1,u2,u3", &mut store);
        assert!(out[0].starts_with("Started group group-"));
        let active = store.active().unwrap();
        assert_eq!(active.name, "Case Review Team");
        assert_eq!(active.member_count, Some(3));

        let (_, out) = run("/group Solo u1", &mut store);
        assert!(out[0].contains("at least 2"));
        assert_eq!(store.active().unwrap().name, "Case Review Team");
    }

    #[test]
    fn test_open_and_list() {
        let mut store = store();
        store.apply_incoming_message(IncomingMessage {
            sender_id: "u1".into(),
            sender_name: "Alice".into(),
            content: "hi".into(),
            timestamp: None,
            receiver_id: Some("me".into()),
            receiver_name: None,
            group_id: None,
            group_name: None,
        });

        let (outcome, out) = run("/open nope", &mut store);
        assert_eq!(outcome, CommandOutcome::Handled);
        assert_eq!(out, vec!["No conversation nope"]);

        let (outcome, out) = run("/open u1", &mut store);
        assert_eq!(outcome, CommandOutcome::Rendered);
        assert_eq!(out[0], "== Alice (offline) ==");
        assert!(out[1].ends_with("Alice: hi"));

        let (_, out) = run("/list", &mut store);
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("* u1"));
        assert!(out[0].contains("[A] Alice"));
    }

    #[test]
    fn test_usage_and_unknown() {
        let mut store = store();
        assert_eq!(run("/open", &mut store).1, vec!["Usage: /open <key>"]);
        assert_eq!(run("/dm", &mut store).0, CommandOutcome::Handled);
        assert_eq!(run("/link", &mut store).1, vec!["Open a conversation first"]);
        assert_eq!(run("/frobnicate", &mut store).1, vec!["Unknown command: /frobnicate"]);
    }
}
