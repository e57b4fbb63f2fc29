//! # syncspace-core — transport-free synchronization primitives
//!
//! The pieces every SyncSpace view manager is built from, with no network
//! or UI dependency:
//!
//! - [`model`] — local state shapes (chat lines, documents, boards, notifications)
//! - [`merge`] — how updates fold into state (append, last-write-wins, full replace)
//! - [`view`] — [`SyncedView`]: optimistic local apply + echo-filtered remote apply
//! - [`timer`] — [`Debounce`]: cancel-on-supersede trailing-edge scheduling
//! - [`typing`] — [`TypingSignal`]: start-once / stop-after-idle state machine

pub mod error;
pub mod merge;
pub mod model;
pub mod timer;
pub mod typing;
pub mod view;

pub use error::SyncError;
pub use merge::{AppendOnly, FullReplace, LastWriteWins, MergeStrategy};
pub use model::{
    ActiveUser, BoardState, Caret, ChatMessage, Column, ColumnView, CursorPosition,
    DocumentRecord, DocumentSummary, Identity, NewTask, Notification, NotificationFeed,
    ProjectList, ProjectSummary, Task, WorkspaceList, WorkspaceMember, WorkspaceSummary,
};
pub use timer::Debounce;
pub use typing::{TypingSignal, TypingTransition};
pub use view::{Reconciled, SyncedView, ViewStats};
