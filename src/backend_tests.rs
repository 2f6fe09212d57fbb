//! Backend tests for the network layer
//!
//! Each test runs `run_backend` on its own thread against a local stub: a
//! one-shot HTTP responder for the history endpoint, or a WebSocket server
//! for the push channel.

use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::{SinkExt, StreamExt};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

use crate::protocol::{BackendAction, ChatEvent, OutgoingMessage};

const WAIT: Duration = Duration::from_secs(5);

fn spawn_backend() -> (Sender<BackendAction>, Receiver<ChatEvent>, JoinHandle<()>) {
    let (action_tx, action_rx) = unbounded::<BackendAction>();
    let (event_tx, event_rx) = unbounded::<ChatEvent>();
    let handle = thread::spawn(move || {
        crate::backend::run_backend(action_rx, event_tx);
    });
    (action_tx, event_rx, handle)
}

/// Serve exactly one HTTP response, then close.
fn spawn_http_stub(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
    });
    format!("http://{}/api/conversations", addr)
}

/// Accept one WebSocket client, push `frames`, then report the first text
/// frame the client sends.
fn spawn_push_stub(frames: Vec<String>) -> (String, Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = unbounded();
    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            listener.set_nonblocking(true).unwrap();
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            for frame in frames {
                ws.send(Message::Text(frame)).await.unwrap();
            }
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(text) = msg {
                    let _ = seen_tx.send(text);
                    break;
                }
            }
        });
    });
    (format!("ws://{}", addr), seen_rx)
}

#[test]
fn test_backend_exits_when_action_channel_drops() {
    let (action_tx, _event_rx, handle) = spawn_backend();
    drop(action_tx);
    handle.join().unwrap();
}

#[test]
fn test_shutdown_stops_backend() {
    let (action_tx, _event_rx, handle) = spawn_backend();
    action_tx.send(BackendAction::Shutdown).unwrap();
    handle.join().unwrap();
}

#[test]
fn test_disconnect_handling() {
    let (action_tx, event_rx, _handle) = spawn_backend();

    action_tx.send(BackendAction::Disconnect).unwrap();

    match event_rx.recv_timeout(WAIT) {
        Ok(ChatEvent::Disconnected(_)) => {}
        other => panic!("Expected Disconnected event, got {:?}", other),
    }
}

#[test]
fn test_send_while_disconnected_reports_error() {
    let (action_tx, event_rx, _handle) = spawn_backend();

    action_tx
        .send(BackendAction::SendMessage(OutgoingMessage {
            sender_id: "me".into(),
            sender_name: "Me".into(),
            content: "hello".into(),
            timestamp: "2024-01-01T10:00:00+00:00".into(),
            receiver_id: Some("u1".into()),
            receiver_name: None,
            group_id: None,
            group_name: None,
        }))
        .unwrap();

    match event_rx.recv_timeout(WAIT) {
        Ok(ChatEvent::Error(text)) => assert!(text.starts_with("Not connected")),
        other => panic!("Expected Error event, got {:?}", other),
    }
}

#[test]
fn test_snapshot_fetch_loads_records() {
    let url = spawn_http_stub(
        "200 OK",
        r#"[{"receiverId":"u1","receiverName":"Alice","messages":[{"content":"hi","sentAt":"Today, 9:55 am","sender":false}]}]"#,
    );
    let (action_tx, event_rx, _handle) = spawn_backend();

    action_tx.send(BackendAction::FetchSnapshot { url }).unwrap();

    match event_rx.recv_timeout(WAIT) {
        Ok(ChatEvent::SnapshotLoaded(records)) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].receiver_id, "u1");
            assert_eq!(records[0].messages[0].content, "hi");
        }
        other => panic!("Expected SnapshotLoaded, got {:?}", other),
    }
}

#[test]
fn test_snapshot_server_error_fails() {
    let url = spawn_http_stub("500 Internal Server Error", "{}");
    let (action_tx, event_rx, _handle) = spawn_backend();

    action_tx.send(BackendAction::FetchSnapshot { url }).unwrap();

    assert!(matches!(
        event_rx.recv_timeout(WAIT),
        Ok(ChatEvent::SnapshotFailed(_))
    ));
}

#[test]
fn test_snapshot_unreachable_fails() {
    // Bind then release a port so nothing is listening on it
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let (action_tx, event_rx, _handle) = spawn_backend();

    action_tx
        .send(BackendAction::FetchSnapshot {
            url: format!("http://{}/api/conversations", addr),
        })
        .unwrap();

    assert!(matches!(
        event_rx.recv_timeout(WAIT),
        Ok(ChatEvent::SnapshotFailed(_))
    ));
}

#[test]
fn test_push_channel_round_trip() {
    let (url, seen_rx) = spawn_push_stub(vec![
        r#"{"senderId":"u1","senderName":"Alice","content":"hi"}"#.into(),
        r#"{"userId":"u1","online":true}"#.into(),
    ]);
    let (action_tx, event_rx, _handle) = spawn_backend();

    action_tx.send(BackendAction::Connect { url }).unwrap();
    assert!(matches!(event_rx.recv_timeout(WAIT), Ok(ChatEvent::Connected)));

    match event_rx.recv_timeout(WAIT) {
        Ok(ChatEvent::PushPayload(raw)) => assert!(raw.contains(r#""content":"hi""#)),
        other => panic!("Expected PushPayload, got {:?}", other),
    }
    match event_rx.recv_timeout(WAIT) {
        Ok(ChatEvent::Presence(update)) => {
            assert_eq!(update.user_id, "u1");
            assert!(update.online);
        }
        other => panic!("Expected Presence, got {:?}", other),
    }

    action_tx
        .send(BackendAction::SendMessage(OutgoingMessage {
            sender_id: "me".into(),
            sender_name: "Me".into(),
            content: "hello".into(),
            timestamp: "2024-01-01T10:00:00+00:00".into(),
            receiver_id: Some("u1".into()),
            receiver_name: Some("Alice".into()),
            group_id: None,
            group_name: None,
        }))
        .unwrap();

    let sent = seen_rx.recv_timeout(WAIT).unwrap();
    let value: serde_json::Value = serde_json::from_str(&sent).unwrap();
    assert_eq!(value["content"], "hello");
    assert_eq!(value["receiverId"], "u1");

    action_tx.send(BackendAction::Shutdown).unwrap();
}

#[test]
fn test_connect_failure_reports_error() {
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let (action_tx, event_rx, _handle) = spawn_backend();

    action_tx
        .send(BackendAction::Connect {
            url: format!("ws://{}", addr),
        })
        .unwrap();

    assert!(matches!(event_rx.recv_timeout(WAIT), Ok(ChatEvent::Error(_))));
}
