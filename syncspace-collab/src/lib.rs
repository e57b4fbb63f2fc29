//! # syncspace-collab — Real-time collaboration client for SyncSpace
//!
//! Connects view managers (chat, documents, kanban, notifications,
//! workspace presence) to one shared event channel and the REST API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  emit   ┌───────────────────┐  JSON text  ┌────────┐
//! │ view manager │ ──────► │ ConnectionManager │ ◄─────────► │ server │
//! │ (SyncedView) │         │  + supervisor     │   frames    └────────┘
//! └──────▲───────┘         └─────────┬─────────┘
//!        │ Subscription              │ inbound
//!        │                           ▼
//!        │                  ┌─────────────────┐
//!        └───────────────── │   EventRouter   │  keyed by (event, scope)
//!                           └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] — JSON envelope, scopes, payloads
//! - [`router`] — `(event, scope)` dispatch with self-cleaning subscriptions
//! - [`transport`] — WebSocket and in-memory links
//! - [`connection`] — lifecycle, handshake, bounded reconnect
//! - [`api`] — REST collaborator
//! - [`context`] — session context handed to each manager
//! - [`chat`], [`document`], [`kanban`], [`notifications`], [`workspace`] — view managers
//! - [`presence`] — remote participants, typing TTLs, cursors

pub mod api;
pub mod chat;
pub mod config;
pub mod connection;
pub mod context;
pub mod document;
pub mod error;
pub mod kanban;
pub mod notifications;
pub mod presence;
pub mod protocol;
pub mod router;
pub mod transport;
pub mod ui;
pub mod workspace;

pub use api::{ApiError, HttpApi, WorkspaceApi};
pub use chat::ChatRoom;
pub use config::{ClientConfig, SyncTiming};
pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState, ConnectionStatus};
pub use context::SessionContext;
pub use document::DocumentSession;
pub use error::CollabError;
pub use kanban::KanbanBoard;
pub use notifications::NotificationCenter;
pub use presence::{PresenceRoom, RemotePeer};
pub use protocol::{events, Envelope, ProtocolError, Scope};
pub use router::{EventRouter, Subscription};
pub use transport::{Link, MemoryListener, MemoryPeer, MemoryTransport, Transport, WebSocketTransport};
pub use ui::{SaveStatus, ToastLevel, Ui, UiEvent};
pub use workspace::WorkspacePresence;
