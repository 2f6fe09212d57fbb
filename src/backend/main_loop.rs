use crossbeam_channel::{Receiver, Sender, TryRecvError};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::time::timeout;

use super::connection::{self, PushStream};
use super::handlers;
use crate::error::ChatError;
use crate::protocol::{BackendAction, ChatEvent};

/// How long a read waits before the loop goes back to check for actions
const READ_POLL: Duration = Duration::from_millis(50);

/// Run the backend on the current thread until `Shutdown` arrives or the
/// front end drops its action sender.
pub fn run_backend(action_rx: Receiver<BackendAction>, event_tx: Sender<ChatEvent>) {
    // Create a Tokio runtime for this thread
    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            let _ = event_tx.send(ChatEvent::Error(format!(
                "Failed to create Tokio runtime: {}",
                e
            )));
            return;
        }
    };

    rt.block_on(async move {
        let mut stream: Option<PushStream> = None;

        loop {
            // Check for actions from the front end (non-blocking)
            loop {
                let action = match action_rx.try_recv() {
                    Ok(action) => action,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        tracing::debug!("action channel closed, stopping backend");
                        close_stream(&mut stream).await;
                        return;
                    }
                };

                match action {
                    BackendAction::Connect { url } => {
                        close_stream(&mut stream).await;
                        match connection::establish_connection(&url).await {
                            Ok(s) => {
                                stream = Some(s);
                                let _ = event_tx.send(ChatEvent::Connected);
                            }
                            Err(e) => {
                                tracing::warn!(url = %url, error = %e, "push connection failed");
                                let _ = event_tx.send(ChatEvent::Error(e.to_string()));
                            }
                        }
                    }

                    BackendAction::Disconnect => {
                        close_stream(&mut stream).await;
                        let _ = event_tx.send(ChatEvent::Disconnected("User disconnected".into()));
                    }

                    BackendAction::FetchSnapshot { url } => {
                        // Runs beside the push socket; push traffic may land first
                        let tx = event_tx.clone();
                        tokio::spawn(async move {
                            let event = match connection::fetch_snapshot(&url).await {
                                Ok(records) => ChatEvent::SnapshotLoaded(records),
                                Err(e) => {
                                    tracing::warn!(url = %url, error = %e, "snapshot fetch failed");
                                    ChatEvent::SnapshotFailed(e.to_string())
                                }
                            };
                            let _ = tx.send(event);
                        });
                    }

                    BackendAction::SendMessage(msg) => {
                        let Some(s) = stream.as_mut() else {
                            let _ = event_tx.send(ChatEvent::Error(format!(
                                "{}; message kept locally only",
                                ChatError::NotConnected
                            )));
                            continue;
                        };
                        let frame = match handlers::encode_outgoing(&msg) {
                            Ok(frame) => frame,
                            Err(e) => {
                                let _ = event_tx.send(ChatEvent::Error(e.to_string()));
                                continue;
                            }
                        };
                        if let Err(e) = s.send(frame).await {
                            let _ = event_tx.send(ChatEvent::Error(format!(
                                "Failed to send message: {}",
                                e
                            )));
                        }
                    }

                    BackendAction::Shutdown => {
                        close_stream(&mut stream).await;
                        tracing::debug!("backend shut down");
                        return;
                    }
                }
            }

            // Read from the push socket if connected
            if let Some(s) = stream.as_mut() {
                match timeout(READ_POLL, s.next()).await {
                    Ok(Some(Ok(msg))) => {
                        if !handlers::route_message(msg, &event_tx) {
                            stream = None;
                            let _ = event_tx.send(ChatEvent::Disconnected(
                                "Connection closed by server".into(),
                            ));
                        }
                    }
                    Ok(Some(Err(e))) => {
                        let _ = event_tx.send(ChatEvent::Error(format!("Read error: {}", e)));
                        stream = None;
                        let _ = event_tx.send(ChatEvent::Disconnected("Read error".into()));
                    }
                    Ok(None) => {
                        // Connection closed
                        stream = None;
                        let _ = event_tx.send(ChatEvent::Disconnected(
                            "Connection closed by server".into(),
                        ));
                    }
                    Err(_) => {
                        // Timeout - this is normal, just loop
                    }
                }
            } else {
                // No connection, sleep a bit to avoid busy-looping
                tokio::time::sleep(READ_POLL).await;
            }
        }
    });
}

async fn close_stream(stream: &mut Option<PushStream>) {
    if let Some(mut s) = stream.take() {
        if let Err(e) = s.close(None).await {
            tracing::debug!(error = %e, "error closing push channel");
        }
    }
}
