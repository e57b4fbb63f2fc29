//! JSON envelope protocol for the shared event channel.
//!
//! Wire format (one WebSocket text frame per envelope):
//! ```text
//! {
//!   "event":   "document_content_change",
//!   "scope":   { "type": "document", "id": "6650f0…" },
//!   "origin":  "64f1c2…",            // originating user id, optional
//!   "payload": { "document_id": "…", "content": "…", … }
//! }
//! ```
//!
//! Events are routed by `(event, scope)`, so two rooms open at once never
//! see each other's traffic. Payload keys follow the server's naming.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use syncspace_core::model::{ActiveUser, CursorPosition, Identity};

/// Event names understood by the server and the view managers.
pub mod events {
    // Connection / presence
    pub const CONNECTED: &str = "connected";
    pub const USER_ONLINE: &str = "user_online";
    pub const USER_OFFLINE: &str = "user_offline";
    pub const SUBSCRIBE_NOTIFICATIONS: &str = "subscribe_notifications";
    pub const LIVE_NOTIFICATION: &str = "live_notification";

    // Workspace room
    pub const JOIN_WORKSPACE: &str = "join_workspace";
    pub const LEAVE_WORKSPACE: &str = "leave_workspace";
    pub const USER_JOINED: &str = "user_joined";
    pub const USER_LEFT: &str = "user_left";
    pub const USER_PRESENCE: &str = "user_presence";

    // Chat
    pub const CHAT_MESSAGE: &str = "chat_message";
    pub const NEW_MESSAGE: &str = "new_message";
    pub const TYPING_START: &str = "typing_start";
    pub const TYPING_STOP: &str = "typing_stop";
    pub const USER_TYPING: &str = "user_typing";

    // Documents
    pub const JOIN_DOCUMENT: &str = "join_document";
    pub const LEAVE_DOCUMENT: &str = "leave_document";
    pub const USER_JOINED_DOCUMENT: &str = "user_joined_document";
    pub const USER_LEFT_DOCUMENT: &str = "user_left_document";
    pub const DOCUMENT_CONTENT_CHANGE: &str = "document_content_change";
    pub const DOCUMENT_UPDATED: &str = "document_updated";
    pub const DOCUMENT_TYPING: &str = "document_typing";
    pub const DOCUMENT_STOP_TYPING: &str = "document_stop_typing";
    pub const USER_TYPING_DOCUMENT: &str = "user_typing_document";
    pub const DOCUMENT_CURSOR_POSITION: &str = "document_cursor_position";
    pub const CURSOR_POSITION_UPDATE: &str = "cursor_position_update";

    // Kanban
    pub const KANBAN_UPDATE: &str = "kanban_update";
    pub const KANBAN_CHANGED: &str = "kanban_changed";
}

/// Routing scope of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Scope {
    /// Connection-wide events (presence announcements, server hello).
    #[default]
    Global,
    /// Personal notification scope.
    User(String),
    /// Workspace room: chat, kanban, workspace presence.
    Workspace(String),
    /// Document editing room.
    Document(String),
}

impl Scope {
    /// Parse a `kind:id` string.
    pub fn parse(channel: &str) -> Option<Self> {
        let parts: Vec<&str> = channel.splitn(2, ':').collect();
        match parts.as_slice() {
            ["global"] => Some(Scope::Global),
            ["user", id] if !id.is_empty() => Some(Scope::User(id.to_string())),
            ["workspace", id] if !id.is_empty() => Some(Scope::Workspace(id.to_string())),
            ["document", id] if !id.is_empty() => Some(Scope::Document(id.to_string())),
            _ => None,
        }
    }

    pub fn to_channel_string(&self) -> String {
        match self {
            Scope::Global => "global".to_string(),
            Scope::User(id) => format!("user:{id}"),
            Scope::Workspace(id) => format!("workspace:{id}"),
            Scope::Document(id) => format!("document:{id}"),
        }
    }

    /// The scoped id, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            Scope::Global => None,
            Scope::User(id) | Scope::Workspace(id) | Scope::Document(id) => Some(id),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_channel_string())
    }
}

// ───────────────────────────────────────────────────────────────────
// Payloads
// ───────────────────────────────────────────────────────────────────

/// Identity of a participant, optionally tagged with the room it concerns.
///
/// Used by join/leave, online/offline, notification subscription and the
/// outbound typing signals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPayload {
    pub workspace_id: String,
    pub user_id: String,
    pub username: String,
    pub message: String,
}

/// Inbound typing indicator (`user_typing`, `user_typing_document`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingPayload {
    pub user_id: String,
    pub username: String,
    pub typing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentChangePayload {
    pub document_id: String,
    pub content: String,
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorPayload {
    pub document_id: String,
    pub user_id: String,
    pub username: String,
    pub position: CursorPosition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KanbanPayload {
    pub workspace_id: String,
}

/// Workspace roster (`user_presence`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresencePayload {
    pub online_count: usize,
    pub users: Vec<ActiveUser>,
}

// ───────────────────────────────────────────────────────────────────
// Envelope
// ───────────────────────────────────────────────────────────────────

/// One event on the shared channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Build an envelope from any serializable payload.
    pub fn new(
        event: impl Into<String>,
        scope: Scope,
        origin: Option<&str>,
        payload: &impl Serialize,
    ) -> Self {
        Self {
            event: event.into(),
            scope,
            origin: origin.map(str::to_string),
            payload: serde_json::to_value(payload).unwrap_or_default(),
        }
    }

    /// Serialize to a text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Deserialize from a text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }

    /// Decode the payload, falling back to `T::default()` when it is absent
    /// or shaped differently than expected.
    pub fn payload_or_default<T: DeserializeOwned + Default>(&self) -> T {
        match serde_json::from_value(self.payload.clone()) {
            Ok(value) => value,
            Err(e) => {
                log::debug!("Malformed '{}' payload, using defaults: {e}", self.event);
                T::default()
            }
        }
    }

    /// Originating user id: the envelope origin, else `payload.user_id`.
    pub fn originator(&self) -> Option<&str> {
        self.origin.as_deref().or_else(|| {
            self.payload
                .get("user_id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
        })
    }

    fn member(
        event: &str,
        scope: Scope,
        user: &Identity,
        workspace_id: Option<&str>,
        document_id: Option<&str>,
    ) -> Self {
        let payload = MemberPayload {
            workspace_id: workspace_id.map(str::to_string),
            document_id: document_id.map(str::to_string),
            user_id: user.id.clone(),
            username: user.name.clone(),
            message: None,
        };
        Self::new(event, scope, Some(&user.id), &payload)
    }

    // ── Connection / presence ───────────────────────────────────

    pub fn user_online(user: &Identity) -> Self {
        Self::member(events::USER_ONLINE, Scope::Global, user, None, None)
    }

    pub fn user_offline(user: &Identity) -> Self {
        let payload = MemberPayload {
            user_id: user.id.clone(),
            ..MemberPayload::default()
        };
        Self::new(events::USER_OFFLINE, Scope::Global, Some(&user.id), &payload)
    }

    pub fn subscribe_notifications(user: &Identity) -> Self {
        let payload = MemberPayload {
            user_id: user.id.clone(),
            ..MemberPayload::default()
        };
        Self::new(
            events::SUBSCRIBE_NOTIFICATIONS,
            Scope::User(user.id.clone()),
            Some(&user.id),
            &payload,
        )
    }

    // ── Workspace ───────────────────────────────────────────────

    pub fn join_workspace(user: &Identity, workspace_id: &str) -> Self {
        let scope = Scope::Workspace(workspace_id.to_string());
        Self::member(events::JOIN_WORKSPACE, scope, user, Some(workspace_id), None)
    }

    pub fn leave_workspace(user: &Identity, workspace_id: &str) -> Self {
        let scope = Scope::Workspace(workspace_id.to_string());
        Self::member(events::LEAVE_WORKSPACE, scope, user, Some(workspace_id), None)
    }

    // ── Chat ────────────────────────────────────────────────────

    pub fn chat_message(user: &Identity, workspace_id: &str, text: &str) -> Self {
        let payload = ChatPayload {
            workspace_id: workspace_id.to_string(),
            user_id: user.id.clone(),
            username: user.name.clone(),
            message: text.to_string(),
        };
        Self::new(
            events::CHAT_MESSAGE,
            Scope::Workspace(workspace_id.to_string()),
            Some(&user.id),
            &payload,
        )
    }

    pub fn typing_start(user: &Identity, workspace_id: &str) -> Self {
        let scope = Scope::Workspace(workspace_id.to_string());
        Self::member(events::TYPING_START, scope, user, Some(workspace_id), None)
    }

    pub fn typing_stop(user: &Identity, workspace_id: &str) -> Self {
        let scope = Scope::Workspace(workspace_id.to_string());
        Self::member(events::TYPING_STOP, scope, user, Some(workspace_id), None)
    }

    // ── Documents ───────────────────────────────────────────────

    pub fn join_document(user: &Identity, document_id: &str) -> Self {
        let scope = Scope::Document(document_id.to_string());
        Self::member(events::JOIN_DOCUMENT, scope, user, None, Some(document_id))
    }

    pub fn leave_document(user: &Identity, document_id: &str) -> Self {
        let scope = Scope::Document(document_id.to_string());
        Self::member(events::LEAVE_DOCUMENT, scope, user, None, Some(document_id))
    }

    pub fn document_content_change(user: &Identity, document_id: &str, content: &str) -> Self {
        let payload = DocumentChangePayload {
            document_id: document_id.to_string(),
            content: content.to_string(),
            user_id: user.id.clone(),
            username: user.name.clone(),
        };
        Self::new(
            events::DOCUMENT_CONTENT_CHANGE,
            Scope::Document(document_id.to_string()),
            Some(&user.id),
            &payload,
        )
    }

    pub fn document_typing(user: &Identity, document_id: &str) -> Self {
        let scope = Scope::Document(document_id.to_string());
        Self::member(events::DOCUMENT_TYPING, scope, user, None, Some(document_id))
    }

    pub fn document_stop_typing(user: &Identity, document_id: &str) -> Self {
        let scope = Scope::Document(document_id.to_string());
        Self::member(events::DOCUMENT_STOP_TYPING, scope, user, None, Some(document_id))
    }

    pub fn document_cursor_position(
        user: &Identity,
        document_id: &str,
        position: &CursorPosition,
    ) -> Self {
        let payload = CursorPayload {
            document_id: document_id.to_string(),
            user_id: user.id.clone(),
            username: user.name.clone(),
            position: position.clone(),
        };
        Self::new(
            events::DOCUMENT_CURSOR_POSITION,
            Scope::Document(document_id.to_string()),
            Some(&user.id),
            &payload,
        )
    }

    // ── Kanban ──────────────────────────────────────────────────

    pub fn kanban_update(user: &Identity, workspace_id: &str) -> Self {
        let payload = KanbanPayload {
            workspace_id: workspace_id.to_string(),
        };
        Self::new(
            events::KANBAN_UPDATE,
            Scope::Workspace(workspace_id.to_string()),
            Some(&user.id),
            &payload,
        )
    }
}

/// Protocol errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}
