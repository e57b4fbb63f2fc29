//! Local state shapes held by the view managers.
//!
//! Every inbound shape is `#[serde(default)]`: the REST and event
//! collaborators are trusted to send the expected keys, and anything
//! missing decodes to an empty value rather than an error.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SyncError;

/// The local user, as supplied by whoever handles authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A participant listed in a room roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveUser {
    pub user_id: String,
    pub username: String,
}

// ───────────────────────────────────────────────────────────────────
// Chat
// ───────────────────────────────────────────────────────────────────

/// One chat line. Ordering is arrival order in the local sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Set only on messages created locally, never by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    pub user_id: String,
    pub username: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ChatMessage {
    /// Build the optimistic local copy of a message the user just sent.
    pub fn local(author: &Identity, text: &str) -> Self {
        Self {
            id: None,
            client_id: Some(Uuid::new_v4()),
            user_id: author.id.clone(),
            username: author.name.clone(),
            message: text.to_string(),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    pub fn is_from(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

// ───────────────────────────────────────────────────────────────────
// Documents
// ───────────────────────────────────────────────────────────────────

/// Document as returned by `GET /api/document/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub active_users: Vec<ActiveUser>,
}

impl DocumentRecord {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Untitled Document"
        } else {
            &self.title
        }
    }
}

/// Local caret, as a character offset into the document content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caret {
    pub offset: usize,
}

impl Caret {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }

    /// Try to carry the caret across a wholesale content replace.
    ///
    /// Returns `None` when the old offset no longer lands inside the new
    /// content; the caret is then dropped rather than clamped.
    pub fn restore(self, content: &str) -> Option<Caret> {
        if self.offset <= content.chars().count() {
            Some(self)
        } else {
            None
        }
    }
}

/// Cursor location broadcast to other editors of the same document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorPosition {
    pub offset: usize,
    pub node: String,
}

// ───────────────────────────────────────────────────────────────────
// Kanban
// ───────────────────────────────────────────────────────────────────

/// A board column. Tasks belong to the column whose id equals their status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Column {
    pub id: String,
    pub title: String,
    pub color: String,
}

fn default_priority() -> String {
    "medium".to_string()
}

fn default_status() -> String {
    "todo".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub assigned_to: Vec<String>,
    #[serde(default)]
    pub workspace_id: String,
}

/// Request body for `POST /api/kanban/task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub workspace_id: String,
}

impl NewTask {
    pub fn new(workspace_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: default_priority(),
            status: default_status(),
            due_date: None,
            workspace_id: workspace_id.into(),
        }
    }
}

/// Board and tasks as returned by `GET /api/kanban/{workspace}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardState {
    pub boards: Vec<Column>,
    pub tasks: Vec<Task>,
}

/// A column together with the tasks currently in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView<'a> {
    pub column: &'a Column,
    pub tasks: Vec<&'a Task>,
}

impl BoardState {
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn has_column(&self, column_id: &str) -> bool {
        self.boards.iter().any(|c| c.id == column_id)
    }

    /// Set a task's status to `column_id`.
    pub fn move_task(&mut self, task_id: &str, column_id: &str) -> Result<(), SyncError> {
        if !self.boards.is_empty() && !self.has_column(column_id) {
            return Err(SyncError::UnknownColumn(column_id.to_string()));
        }
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| SyncError::TaskNotFound(task_id.to_string()))?;
        task.status = column_id.to_string();
        Ok(())
    }

    /// Remove a task; returns it if it was present.
    pub fn remove_task(&mut self, task_id: &str) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id == task_id)?;
        Some(self.tasks.remove(idx))
    }

    /// Group tasks under their columns, in column order.
    pub fn columns(&self) -> Vec<ColumnView<'_>> {
        self.boards
            .iter()
            .map(|column| ColumnView {
                column,
                tasks: self.tasks.iter().filter(|t| t.status == column.id).collect(),
            })
            .collect()
    }

    /// `(column id, task ids)` pairs, for render snapshots.
    pub fn layout(&self) -> Vec<(String, Vec<String>)> {
        self.columns()
            .into_iter()
            .map(|view| {
                (
                    view.column.id.clone(),
                    view.tasks.iter().map(|t| t.id.clone()).collect(),
                )
            })
            .collect()
    }
}

// ───────────────────────────────────────────────────────────────────
// Directory
// ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceMember {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// One workspace the user belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub members: Vec<WorkspaceMember>,
}

impl WorkspaceSummary {
    pub fn role_of(&self, user_id: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.user_id == user_id)
            .map(|m| m.role.as_str())
    }
}

/// Body of `GET /api/workspace/list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceList {
    pub workspaces: Vec<WorkspaceSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub workspace_id: String,
    pub tasks_count: u32,
    /// Percentage of tasks in `done`.
    pub progress: u32,
}

/// Body of `GET /api/project/list`: projects across all of the user's
/// workspaces, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
}

/// One entry of `GET /api/document/workspace/{id}`, most recently
/// updated first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl DocumentSummary {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Untitled Document"
        } else {
            &self.title
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Notifications
// ───────────────────────────────────────────────────────────────────

fn default_kind() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Default for Notification {
    fn default() -> Self {
        Self {
            id: None,
            message: String::new(),
            kind: default_kind(),
            read: false,
            created_at: None,
        }
    }
}

/// Feed as returned by `GET /api/notifications/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationFeed {
    pub notifications: Vec<Notification>,
    pub unread_count: u32,
}

/// Badge counts above this render as `99+`.
pub const BADGE_CAP: u32 = 99;

impl NotificationFeed {
    /// Prepend a live notification and bump the unread count.
    pub fn push_live(&mut self, mut notification: Notification) {
        notification.read = false;
        if notification.created_at.is_none() {
            notification.created_at = Some(chrono::Utc::now().to_rfc3339());
        }
        self.notifications.insert(0, notification);
        self.unread_count += 1;
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.notifications {
            n.read = true;
        }
        self.unread_count = 0;
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
        self.unread_count = 0;
    }

    /// Badge text, or `None` when there is nothing unread.
    pub fn badge(&self) -> Option<String> {
        match self.unread_count {
            0 => None,
            n if n > BADGE_CAP => Some(format!("{BADGE_CAP}+")),
            n => Some(n.to_string()),
        }
    }
}
