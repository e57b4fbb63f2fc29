//! Presentation seam.
//!
//! Managers never render; they push [`UiEvent`]s into a [`Ui`] handle and
//! whatever composes them (the terminal front end, a test) drains the
//! receiving end.

use std::time::Duration;

use tokio::sync::mpsc;

use syncspace_core::{ActiveUser, Caret, ChatMessage, CursorPosition, Notification};

use crate::connection::ConnectionStatus;
use crate::protocol::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Document save indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saving,
    Saved,
    Failed,
}

impl SaveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SaveStatus::Saving => "Saving...",
            SaveStatus::Saved => "All changes saved",
            SaveStatus::Failed => "Failed to save",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Toast {
        level: ToastLevel,
        message: String,
    },
    Connection {
        status: ConnectionStatus,
        visible_for: Duration,
    },

    ChatLoaded {
        messages: Vec<ChatMessage>,
    },
    ChatAppended {
        message: ChatMessage,
        own: bool,
    },
    TypingIndicator {
        scope: Scope,
        username: String,
        typing: bool,
    },

    DocumentLoaded {
        title: String,
        content: String,
    },
    /// Content replaced by a remote edit. `caret` is `None` when the local
    /// caret could not be carried over.
    DocumentReplaced {
        content: String,
        caret: Option<Caret>,
        author: String,
    },
    SaveStatus(SaveStatus),
    CursorMoved {
        user_id: String,
        username: String,
        position: CursorPosition,
    },

    ActiveUsers {
        scope: Scope,
        online_count: usize,
        users: Vec<ActiveUser>,
    },

    /// `(column id, task ids)` in display order.
    BoardRendered {
        columns: Vec<(String, Vec<String>)>,
    },

    NotificationsChanged {
        unread: u32,
        badge: Option<String>,
        latest: Option<Notification>,
    },
}

/// Sender half of the presentation channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Ui {
    tx: Option<mpsc::UnboundedSender<UiEvent>>,
}

impl Ui {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A handle that discards everything.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: UiEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                log::trace!("UI receiver gone");
            }
        }
    }

    pub fn toast(&self, level: ToastLevel, message: impl Into<String>) {
        self.send(UiEvent::Toast {
            level,
            message: message.into(),
        });
    }
}
