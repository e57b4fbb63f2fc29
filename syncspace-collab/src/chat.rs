//! Workspace chat room.
//!
//! Messages are an append-only log in arrival order. A sent message is
//! appended locally first, then broadcast; the server's `new_message` echo
//! of it is dropped by the originator check. There is no total order across
//! clients and no dedup beyond that check.

use syncspace_core::{AppendOnly, ChatMessage, Reconciled, SyncedView, TypingSignal, TypingTransition};

use crate::context::{Outbox, SessionContext};
use crate::presence::PresenceRoom;
use crate::protocol::{events, Envelope, Scope, TypingPayload};
use crate::router::Subscription;
use crate::ui::{ToastLevel, UiEvent};

/// Events a chat room listens for on its workspace scope.
pub const CHAT_EVENTS: &[&str] = &[events::NEW_MESSAGE, events::USER_TYPING];

pub struct ChatRoom {
    ctx: SessionContext,
    workspace_id: String,
    scope: Scope,
    view: SyncedView<AppendOnly<ChatMessage>>,
    typing: TypingSignal,
    presence: PresenceRoom,
    outbox: Outbox,
    sub: Subscription,
}

impl ChatRoom {
    /// Subscribe to the room and load its history.
    pub async fn open(ctx: SessionContext, workspace_id: &str) -> Self {
        let scope = Scope::Workspace(workspace_id.to_string());
        let sub = ctx.subscribe(scope.clone(), CHAT_EVENTS);
        let identity = ctx.identity().clone();
        let mut room = Self {
            view: SyncedView::new(identity.id.clone(), Vec::new()),
            typing: TypingSignal::new(ctx.timing.typing_idle),
            presence: PresenceRoom::new(identity, ctx.timing.remote_typing_ttl),
            outbox: Outbox::default(),
            workspace_id: workspace_id.to_string(),
            scope,
            sub,
            ctx,
        };
        room.load_history().await;
        room
    }

    pub async fn load_history(&mut self) {
        match self.ctx.api.chat_history(&self.workspace_id).await {
            Ok(messages) => {
                log::info!("Loaded {} messages for {}", messages.len(), self.workspace_id);
                self.view.reset(messages);
                self.ctx.ui.send(UiEvent::ChatLoaded {
                    messages: self.view.state().clone(),
                });
            }
            Err(e) => {
                log::error!("Error loading messages: {e}");
                self.ctx.ui.toast(ToastLevel::Error, "Failed to load messages");
            }
        }
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.view.state()
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_typing()
    }

    /// Names of remote participants currently typing.
    pub fn typing_users(&self) -> Vec<&str> {
        self.presence.typing_users()
    }

    /// Send a message. Blank input is ignored and returns `false`.
    pub async fn send(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let message = ChatMessage::local(self.ctx.identity(), text);
        self.view.apply_local(message.clone());
        self.ctx.ui.send(UiEvent::ChatAppended { message, own: true });

        let envelope = Envelope::chat_message(self.ctx.identity(), &self.workspace_id, text);
        self.ctx.emit(envelope).await;

        if self.typing.force_stop() == Some(TypingTransition::Stopped) {
            self.emit_typing(TypingTransition::Stopped).await;
        }
        true
    }

    /// A keystroke in the message input.
    pub async fn input(&mut self) {
        if let Some(transition) = self.typing.on_input() {
            self.emit_typing(transition).await;
        }
    }

    fn typing_envelope(&self, transition: TypingTransition) -> Envelope {
        let identity = self.ctx.identity();
        match transition {
            TypingTransition::Started => Envelope::typing_start(identity, &self.workspace_id),
            TypingTransition::Stopped => Envelope::typing_stop(identity, &self.workspace_id),
        }
    }

    async fn emit_typing(&self, transition: TypingTransition) {
        self.ctx.emit(self.typing_envelope(transition)).await;
    }

    /// Apply one routed event.
    pub async fn handle(&mut self, envelope: Envelope) {
        match envelope.event.as_str() {
            events::NEW_MESSAGE => {
                let message: ChatMessage = envelope.payload_or_default();
                let origin = envelope.originator();
                if self.view.apply_remote(origin, message.clone()) == Reconciled::Applied {
                    self.ctx.ui.send(UiEvent::ChatAppended { message, own: false });
                }
            }
            events::USER_TYPING => {
                let typing: TypingPayload = envelope.payload_or_default();
                if self.presence.set_typing(&typing.user_id, &typing.username, typing.typing) {
                    self.ctx.ui.send(UiEvent::TypingIndicator {
                        scope: self.scope.clone(),
                        username: typing.username,
                        typing: typing.typing,
                    });
                }
            }
            other => log::debug!("Chat ignoring '{other}'"),
        }
    }

    /// Wait for the next inbound event or timer and process it.
    ///
    /// Returns `false` once the subscription has closed. Cancel-safe: an
    /// expired typing signal is queued before it is sent.
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
        };
        self.outbox.deliver(&self.ctx).await;
        alive
    }

    /// Stop typing and unregister.
    pub async fn close(mut self) {
        self.outbox.deliver(&self.ctx).await;
        if self.typing.force_stop() == Some(TypingTransition::Stopped) {
            self.emit_typing(TypingTransition::Stopped).await;
        }
        log::info!("Closed chat {}", self.workspace_id);
    }
}
