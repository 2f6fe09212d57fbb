//! Terminal session: owns the store, the backend thread and the channels
//! between them.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::backend::run_backend;
use crate::commands::{self, CommandOutcome};
use crate::config::Settings;
use crate::conversation::ConversationKey;
use crate::events::{self, SessionStatus};
use crate::protocol::{BackendAction, ChatEvent};
use crate::store::{ConversationStore, LocalUser, StoreChange};
use crate::view;

pub struct ChatApp {
    pub settings: Settings,
    pub store: ConversationStore,
    pub status: SessionStatus,

    action_tx: Sender<BackendAction>,
    event_rx: Receiver<ChatEvent>,
    change_rx: Receiver<StoreChange>,
    backend: Option<JoinHandle<()>>,

    /// Status lines already printed
    log_printed: usize,
    /// Transcript lines of the active conversation already printed
    transcript_printed: usize,
}

impl ChatApp {
    pub fn new(settings: Settings) -> Self {
        // Create channels for front end <-> Backend
        let (action_tx, action_rx) = unbounded::<BackendAction>();
        let (event_tx, event_rx) = unbounded::<ChatEvent>();

        // Spawn the backend thread
        let backend = thread::spawn(move || {
            run_backend(action_rx, event_tx);
        });

        Self::with_channels(settings, action_tx, event_rx, Some(backend))
    }

    /// Build a session around existing channels without spawning a backend.
    pub fn with_channels(
        settings: Settings,
        action_tx: Sender<BackendAction>,
        event_rx: Receiver<ChatEvent>,
        backend: Option<JoinHandle<()>>,
    ) -> Self {
        let user = LocalUser {
            id: settings.user_id.clone(),
            name: settings.display_name().to_string(),
        };
        let mut store = ConversationStore::new(user)
            .with_merge_policy(settings.merge_policy)
            .with_outbound(action_tx.clone());

        let (change_tx, change_rx) = unbounded::<StoreChange>();
        store.on_change(move |change| {
            let _ = change_tx.send(change.clone());
        });

        Self {
            settings,
            store,
            status: SessionStatus::default(),
            action_tx,
            event_rx,
            change_rx,
            backend,
            log_printed: 0,
            transcript_printed: 0,
        }
    }

    /// Open the push channel and request history.
    pub fn start(&self) {
        let _ = self.action_tx.send(BackendAction::Connect {
            url: self.settings.push_url.clone(),
        });
        let _ = self.action_tx.send(BackendAction::FetchSnapshot {
            url: self.settings.snapshot_url.clone(),
        });
    }

    /// Apply pending backend events and return the lines to show.
    pub fn poll(&mut self) -> Vec<String> {
        events::process_events(&self.event_rx, &mut self.store, &mut self.status);
        let mut out = Vec::new();
        self.collect_status(&mut out);
        self.collect_changes(&mut out);
        out
    }

    /// Handle one line of user input. Returns false when the session should end.
    pub fn handle_line(&mut self, line: &str) -> (bool, Vec<String>) {
        let mut out = Vec::new();
        let outcome = commands::handle_user_command(
            line,
            &mut self.store,
            &self.settings.meeting_base_url,
            &mut out,
        );
        match outcome {
            CommandOutcome::Quit => return (false, out),
            CommandOutcome::Handled | CommandOutcome::Rendered => {}
            CommandOutcome::NotACommand if line.trim().is_empty() => {}
            CommandOutcome::NotACommand => {
                if self.store.active().is_none() {
                    out.push("No active conversation; use /open or /dm first".into());
                } else {
                    self.store.send_local_message(line);
                }
            }
        }
        if let Some(active) = self.store.active() {
            let key = active.key.clone();
            let rendered = outcome == CommandOutcome::Rendered;
            self.drain_changes(&key, rendered, &mut out);
        } else {
            while self.change_rx.try_recv().is_ok() {}
        }
        (true, out)
    }

    /// Stop the backend and wait for it.
    pub fn shutdown(&mut self) {
        let _ = self.action_tx.send(BackendAction::Shutdown);
        if let Some(handle) = self.backend.take() {
            if handle.join().is_err() {
                tracing::error!("backend thread panicked");
            }
        }
    }

    fn collect_status(&mut self, out: &mut Vec<String>) {
        out.extend(self.status.system_log.iter().skip(self.log_printed).cloned());
        self.log_printed = self.status.system_log.len();
    }

    fn collect_changes(&mut self, out: &mut Vec<String>) {
        match self.store.active() {
            Some(active) => {
                let key = active.key.clone();
                self.drain_changes(&key, false, out);
            }
            None => {
                while let Ok(change) = self.change_rx.try_recv() {
                    self.notice(&change, None, out);
                }
            }
        }
    }

    fn drain_changes(&mut self, active: &ConversationKey, rendered: bool, out: &mut Vec<String>) {
        let mut redraw = false;
        let mut append = false;
        while let Ok(change) = self.change_rx.try_recv() {
            match &change {
                StoreChange::ActiveChanged(_) => {
                    redraw = !rendered;
                    if rendered {
                        self.transcript_printed = self.store.transcript_for(active).len();
                    }
                }
                StoreChange::SnapshotMerged(_) => redraw = true,
                StoreChange::ConversationUpdated(key) if key == active => append = true,
                StoreChange::ConversationUpdated(_) => {}
            }
            self.notice(&change, Some(active), out);
        }

        if redraw {
            let _ = commands::render_active(&self.store, out);
            self.transcript_printed = self.store.transcript_for(active).len();
        } else if append {
            let now = chrono::Local::now();
            let name = self
                .store
                .conversation(active)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            let transcript = self.store.transcript_for(active);
            for msg in transcript.iter().skip(self.transcript_printed) {
                out.push(view::transcript_line(msg, &name, &now));
            }
            self.transcript_printed = transcript.len();
        }
    }

    /// One-line notice for activity outside the active conversation.
    fn notice(&self, change: &StoreChange, active: Option<&ConversationKey>, out: &mut Vec<String>) {
        let StoreChange::ConversationUpdated(key) = change else {
            return;
        };
        if Some(key) == active {
            return;
        }
        if let Some(conv) = self.store.conversation(key) {
            if conv.unread_count > 0 {
                out.push(format!("-- {} ({} unread): {}", conv.name, conv.unread_count, conv.preview()));
            }
        }
    }
}
