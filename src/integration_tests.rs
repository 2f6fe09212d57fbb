//! Integration tests for casechat
//!
//! These tests exercise full workflows across modules: backend events flowing
//! through `events::process_events` into the store, and the store's read API
//! feeding the views.

#[cfg(test)]
mod integration_tests {
    use crate::conversation::{ConversationKind, Direction};
    use crate::events::{process_events, SessionStatus};
    use crate::protocol::{BackendAction, ChatEvent, SnapshotMessage, SnapshotRecord};
    use crate::store::{ConversationStore, LocalUser, MergePolicy};
    use crate::time::{format_display_time, Timestamp};
    use crate::view;
    use chrono::Local;
    use crossbeam_channel::unbounded;

    fn local_user() -> LocalUser {
        LocalUser {
            id: "me".into(),
            name: "Me".into(),
        }
    }

    const ALICE_PUSH: &str = r#"{"senderId":"u1","senderName":"Alice","content":"hi","timestamp":"2024-01-01T10:00:00Z"}"#;

    fn alice_snapshot() -> Vec<SnapshotRecord> {
        vec![SnapshotRecord {
            receiver_id: "u1".into(),
            receiver_name: Some("Alice".into()),
            messages: vec![SnapshotMessage {
                content: "earlier".into(),
                sent_at: "2023-12-31 18:00:00".into(),
                sender: true,
            }],
        }]
    }

    /// A push for an unknown sender creates exactly one direct conversation
    #[test]
    fn test_alice_push_scenario() {
        let (tx, rx) = unbounded();
        let mut store = ConversationStore::new(local_user());
        let mut status = SessionStatus::default();

        tx.send(ChatEvent::PushPayload(ALICE_PUSH.into())).unwrap();
        process_events(&rx, &mut store, &mut status);

        assert_eq!(store.len(), 1);
        let conv = store.conversation(&"u1".into()).unwrap();
        assert_eq!(conv.kind, ConversationKind::Direct);
        assert_eq!(conv.name, "Alice");
        assert_eq!(conv.messages.len(), 1);
        assert_eq!(conv.messages[0].direction, Direction::Received);
        assert_eq!(conv.messages[0].content, "hi");
    }

    /// Snapshot landing after a push keeps the pushed message by default
    #[test]
    fn test_snapshot_after_push_merge() {
        let (tx, rx) = unbounded();
        let mut store = ConversationStore::new(local_user());
        let mut status = SessionStatus::default();

        tx.send(ChatEvent::PushPayload(ALICE_PUSH.into())).unwrap();
        tx.send(ChatEvent::SnapshotLoaded(alice_snapshot())).unwrap();
        process_events(&rx, &mut store, &mut status);

        let contents: Vec<&str> = store
            .transcript_for(&"u1".into())
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["earlier", "hi"]);
        assert!(status.snapshot_loaded);
    }

    /// With the overwrite policy the snapshot replaces the pushed message
    #[test]
    fn test_snapshot_after_push_overwrite() {
        let (tx, rx) = unbounded();
        let mut store = ConversationStore::new(local_user()).with_merge_policy(MergePolicy::Overwrite);
        let mut status = SessionStatus::default();

        tx.send(ChatEvent::PushPayload(ALICE_PUSH.into())).unwrap();
        tx.send(ChatEvent::SnapshotLoaded(alice_snapshot())).unwrap();
        process_events(&rx, &mut store, &mut status);

        let transcript = store.transcript_for(&"u1".into());
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].content, "earlier");
    }

    /// Conversations sort by their own latest timestamp, not arrival order
    #[test]
    fn test_ordering_across_conversations() {
        let (tx, rx) = unbounded();
        let mut store = ConversationStore::new(local_user());
        let mut status = SessionStatus::default();

        for (sender, ts) in [
            ("b", "2024-01-01T11:00:00Z"),
            ("a", "2024-01-01T10:00:00Z"),
            ("c", "2024-01-01T12:00:00Z"),
        ] {
            tx.send(ChatEvent::PushPayload(format!(
                r#"{{"senderId":"{}","senderName":"{}","content":"x","timestamp":"{}"}}"#,
                sender,
                sender.to_uppercase(),
                ts
            )))
            .unwrap();
        }
        process_events(&rx, &mut store, &mut status);

        let keys: Vec<String> = store
            .sorted_conversation_keys()
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, vec!["c", "b", "a"]);

        // A new message moves a conversation to the top
        tx.send(ChatEvent::PushPayload(
            r#"{"senderId":"a","senderName":"A","content":"y","timestamp":"2024-01-01T13:00:00Z"}"#.into(),
        ))
        .unwrap();
        process_events(&rx, &mut store, &mut status);
        assert_eq!(store.sorted_conversation_keys()[0].as_str(), "a");
    }

    /// Empty sends never touch the store or the transport
    #[test]
    fn test_empty_send_is_noop() {
        let (action_tx, action_rx) = unbounded::<BackendAction>();
        let mut store = ConversationStore::new(local_user()).with_outbound(action_tx);
        store.open_direct("u1", "Alice").unwrap();

        for text in ["", "   ", "\n\t"] {
            assert!(!store.send_local_message(text));
        }
        assert!(store.is_empty());
        assert!(action_rx.try_recv().is_err());
    }

    /// Group traffic renders with sender prefixes and initials
    #[test]
    fn test_group_flow_renders() {
        let (tx, rx) = unbounded();
        let mut store = ConversationStore::new(local_user());
        let mut status = SessionStatus::default();

        tx.send(ChatEvent::PushPayload(
            r#"{"senderId":"u3","senderName":"Carol","content":"filed","groupId":"g1","groupName":"Case Review Team"}"#.into(),
        ))
        .unwrap();
        process_events(&rx, &mut store, &mut status);

        let now = Local::now();
        let conv = store.conversation(&"g1".into()).unwrap();
        let row = view::list_row(conv, &now);
        assert!(row.starts_with("[CT] Case Review Team (1) · Today, "));
        assert!(row.ends_with("Carol: filed"));
        assert_eq!(view::header(conv), "Case Review Team (2 members)");
    }

    /// Display timestamps produced now normalize back into the same minute
    #[test]
    fn test_display_time_round_trip() {
        let now = Local::now();
        let shown = format_display_time(&now, &now);
        assert!(shown.contains("Today"));
        let parsed = Timestamp::parse(&shown, now);
        assert_eq!(parsed.minute_bucket(), Timestamp::At(now).minute_bucket());
    }
}
