//! Collaborative document session.
//!
//! The content is a single blob under last-write-wins: a remote
//! `document_updated` replaces it wholesale. Local edits are applied
//! immediately, broadcast as `document_content_change`, and persisted by a
//! trailing-edge save debounce.
//!
//! Save responses are not ordered against each other. Each one updates the
//! save status as it arrives, so a slow older response can overwrite the
//! status of a newer one. A failed save reports `Failed` and leaves the
//! local content as it is.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use syncspace_core::{
    Caret, CursorPosition, Debounce, LastWriteWins, Reconciled, SyncedView, TypingSignal,
    TypingTransition,
};

use crate::api::ApiError;
use crate::context::{Outbox, SessionContext};
use crate::presence::PresenceRoom;
use crate::protocol::{events, CursorPayload, DocumentChangePayload, Envelope, MemberPayload, Scope, TypingPayload};
use crate::router::Subscription;
use crate::ui::{SaveStatus, ToastLevel, UiEvent};

/// Events a document session listens for on its document scope.
pub const DOCUMENT_EVENTS: &[&str] = &[
    events::DOCUMENT_UPDATED,
    events::USER_JOINED_DOCUMENT,
    events::USER_LEFT_DOCUMENT,
    events::USER_TYPING_DOCUMENT,
    events::CURSOR_POSITION_UPDATE,
];

/// Outcome of one save request, tagged with its issue order.
type SaveOutcome = (u64, Result<(), ApiError>);

pub struct DocumentSession {
    ctx: SessionContext,
    document_id: String,
    scope: Scope,
    title: String,
    view: SyncedView<LastWriteWins<String>>,
    caret: Option<Caret>,
    save: Debounce<String>,
    cursor: Debounce<CursorPosition>,
    typing: TypingSignal,
    presence: PresenceRoom,
    idle_sweep: Interval,
    outbox: Outbox,
    save_tx: mpsc::UnboundedSender<SaveOutcome>,
    save_rx: mpsc::UnboundedReceiver<SaveOutcome>,
    saves_issued: u64,
    save_status: Option<SaveStatus>,
    sub: Subscription,
}

impl DocumentSession {
    /// Join the document room and load its content.
    pub async fn open(ctx: SessionContext, document_id: &str) -> Self {
        let scope = Scope::Document(document_id.to_string());
        let sub = ctx.subscribe(scope.clone(), DOCUMENT_EVENTS);
        let join = Envelope::join_document(ctx.identity(), document_id);
        sub.set_rejoin(join.clone());

        let identity = ctx.identity().clone();
        let timing = ctx.timing.clone();
        let (save_tx, save_rx) = mpsc::unbounded_channel();
        let mut idle_sweep = interval_at(Instant::now() + timing.idle_sweep, timing.idle_sweep);
        idle_sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut session = Self {
            document_id: document_id.to_string(),
            scope,
            title: String::new(),
            view: SyncedView::new(identity.id.clone(), String::new()),
            caret: None,
            save: Debounce::new(timing.save_debounce),
            cursor: Debounce::new(timing.cursor_quiet),
            typing: TypingSignal::new(timing.typing_idle),
            presence: PresenceRoom::new(identity, timing.remote_typing_ttl)
                .with_idle_timeout(timing.peer_idle_timeout),
            idle_sweep,
            outbox: Outbox::default(),
            save_tx,
            save_rx,
            saves_issued: 0,
            save_status: None,
            sub,
            ctx,
        };
        session.load().await;
        session.ctx.emit(join).await;
        session
    }

    pub async fn load(&mut self) {
        match self.ctx.api.load_document(&self.document_id).await {
            Ok(record) => {
                self.title = record.display_title().to_string();
                self.view.reset(record.content);
                self.presence.replace_roster(&record.active_users);
                self.ctx.ui.send(UiEvent::DocumentLoaded {
                    title: self.title.clone(),
                    content: self.view.state().clone(),
                });
                self.publish_roster();
            }
            Err(e) => {
                log::error!("Error loading document: {e}");
                self.ctx.ui.toast(ToastLevel::Error, "Failed to load document");
            }
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        self.view.state()
    }

    pub fn caret(&self) -> Option<Caret> {
        self.caret
    }

    pub fn save_status(&self) -> Option<SaveStatus> {
        self.save_status
    }

    pub fn has_pending_save(&self) -> bool {
        self.save.is_pending()
    }

    pub fn presence(&self) -> &PresenceRoom {
        &self.presence
    }

    /// Replace the content with the user's edit.
    ///
    /// Broadcasts the change, restarts the save debounce and reports
    /// `Saving`.
    pub async fn edit(&mut self, content: impl Into<String>, caret: Option<Caret>) {
        let content = content.into();
        self.view.apply_local(content.clone());
        if caret.is_some() {
            self.caret = caret;
        }

        let envelope =
            Envelope::document_content_change(self.ctx.identity(), &self.document_id, &content);
        self.ctx.emit(envelope).await;

        if self.save.schedule(content) {
            log::debug!("Superseded pending save of {}", self.document_id);
        }
        self.set_save_status(SaveStatus::Saving);

        if let Some(transition) = self.typing.on_input() {
            self.emit_typing(transition).await;
        }
    }

    /// Record a local caret move; the position is broadcast once the caret
    /// has been still for the quiet window.
    pub fn move_caret(&mut self, caret: Caret, node: &str) {
        self.caret = Some(caret);
        self.cursor.schedule(CursorPosition {
            offset: caret.offset,
            node: node.to_string(),
        });
    }

    /// Save a pending edit now instead of waiting out the debounce.
    pub fn flush(&mut self) -> bool {
        match self.save.cancel() {
            Some(content) => {
                self.spawn_save(content);
                true
            }
            None => false,
        }
    }

    fn spawn_save(&mut self, content: String) {
        self.saves_issued += 1;
        let seq = self.saves_issued;
        let api = self.ctx.api.clone();
        let document_id = self.document_id.clone();
        let tx = self.save_tx.clone();
        log::debug!("Saving {document_id} (#{seq})");
        tokio::spawn(async move {
            let result = api.save_document(&document_id, &content).await;
            let _ = tx.send((seq, result));
        });
    }

    fn set_save_status(&mut self, status: SaveStatus) {
        self.save_status = Some(status);
        self.ctx.ui.send(UiEvent::SaveStatus(status));
    }

    fn on_save_result(&mut self, seq: u64, result: Result<(), ApiError>) {
        match result {
            Ok(()) => self.set_save_status(SaveStatus::Saved),
            Err(e) => {
                log::error!("Error saving document (#{seq}): {e}");
                self.set_save_status(SaveStatus::Failed);
            }
        }
    }

    fn typing_envelope(&self, transition: TypingTransition) -> Envelope {
        let identity = self.ctx.identity();
        match transition {
            TypingTransition::Started => Envelope::document_typing(identity, &self.document_id),
            TypingTransition::Stopped => Envelope::document_stop_typing(identity, &self.document_id),
        }
    }

    async fn emit_typing(&self, transition: TypingTransition) {
        self.ctx.emit(self.typing_envelope(transition)).await;
    }

    fn publish_roster(&self) {
        let users = self.presence.active_users();
        self.ctx.ui.send(UiEvent::ActiveUsers {
            scope: self.scope.clone(),
            online_count: users.len(),
            users,
        });
    }

    /// Apply one routed event.
    pub async fn handle(&mut self, envelope: Envelope) {
        match envelope.event.as_str() {
            events::DOCUMENT_UPDATED => {
                let change: DocumentChangePayload = envelope.payload_or_default();
                let origin = envelope.originator();
                if self.view.apply_remote(origin, change.content) == Reconciled::Applied {
                    self.caret = self.caret.and_then(|c| c.restore(self.view.state()));
                    log::debug!("Document updated by {}", change.username);
                    self.ctx.ui.send(UiEvent::DocumentReplaced {
                        content: self.view.state().clone(),
                        caret: self.caret,
                        author: change.username,
                    });
                }
            }
            events::USER_JOINED_DOCUMENT => {
                let member: MemberPayload = envelope.payload_or_default();
                if self.presence.joined(&member.user_id, &member.username) {
                    self.ctx.ui.toast(
                        ToastLevel::Info,
                        format!("{} joined the document", member.username),
                    );
                    self.publish_roster();
                }
            }
            events::USER_LEFT_DOCUMENT => {
                let member: MemberPayload = envelope.payload_or_default();
                if self.presence.left(&member.user_id, &member.username).is_some() {
                    self.publish_roster();
                }
            }
            events::USER_TYPING_DOCUMENT => {
                let typing: TypingPayload = envelope.payload_or_default();
                if self.presence.set_typing(&typing.user_id, &typing.username, typing.typing) {
                    self.ctx.ui.send(UiEvent::TypingIndicator {
                        scope: self.scope.clone(),
                        username: typing.username,
                        typing: typing.typing,
                    });
                }
            }
            events::CURSOR_POSITION_UPDATE => {
                let cursor: CursorPayload = envelope.payload_or_default();
                let position = cursor.position.clone();
                if self.presence.move_cursor(&cursor.user_id, &cursor.username, position) {
                    self.ctx.ui.send(UiEvent::CursorMoved {
                        user_id: cursor.user_id,
                        username: cursor.username,
                        position: cursor.position,
                    });
                }
            }
            other => log::debug!("Document ignoring '{other}'"),
        }
    }

    /// Wait for the next inbound event, timer or save response and
    /// process it. Returns `false` once the subscription has closed.
    ///
    /// Cancel-safe: a timer that fired queues its envelope before anything
    /// is awaited, and a dropped step delivers it on the next call.
    pub async fn step(&mut self) -> bool {
        if !self.outbox.is_empty() {
            self.outbox.deliver(&self.ctx).await;
            return true;
        }
        let alive = tokio::select! {
            envelope = self.sub.recv() => match envelope {
                Some(envelope) => {
                    self.handle(envelope).await;
                    true
                }
                None => false,
            },
            content = self.save.fired() => {
                self.spawn_save(content);
                true
            }
            Some((seq, result)) = self.save_rx.recv() => {
                self.on_save_result(seq, result);
                true
            }
            position = self.cursor.fired() => {
                self.outbox.push(Envelope::document_cursor_position(
                    self.ctx.identity(),
                    &self.document_id,
                    &position,
                ));
                true
            }
            transition = self.typing.expired() => {
                let envelope = self.typing_envelope(transition);
                self.outbox.push(envelope);
                true
            }
            expired = self.presence.typing_expired() => {
                for username in expired {
                    self.ctx.ui.send(UiEvent::TypingIndicator {
                        scope: self.scope.clone(),
                        username,
                        typing: false,
                    });
                }
                true
            }
            _ = self.idle_sweep.tick() => {
                let idle = self.presence.cleanup_idle();
                if !idle.is_empty() {
                    log::info!("Dropped {} idle participants from {}", idle.len(), self.document_id);
                    self.publish_roster();
                }
                true
            }
        };
        self.outbox.deliver(&self.ctx).await;
        alive
    }

    /// Process everything due within `window`, for callers that drive the
    /// session in bounded slices.
    pub async fn run_for(&mut self, window: Duration) {
        let deadline = Instant::now() + window;
        while tokio::time::timeout_at(deadline, self.step()).await.unwrap_or(false) {}
    }

    /// Leave the room and unregister. Pending timers are cancelled; call
    /// [`flush`](Self::flush) first to keep an unsaved edit.
    pub async fn close(mut self) {
        if self.save.cancel().is_some() {
            log::warn!("Discarding unsaved edit of {}", self.document_id);
        }
        self.cursor.cancel();
        self.outbox.deliver(&self.ctx).await;
        if let Some(transition) = self.typing.force_stop() {
            self.emit_typing(transition).await;
        }
        let leave = Envelope::leave_document(self.ctx.identity(), &self.document_id);
        self.ctx.emit(leave).await;
        log::info!("Closed document {}", self.document_id);
    }
}
