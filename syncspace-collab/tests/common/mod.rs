//! Shared fixtures: an in-memory server link, a scripted REST API and a
//! captured UI stream.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use syncspace_collab::{
    ApiError, ConnectionConfig, ConnectionManager, Envelope, EventRouter, MemoryListener,
    MemoryPeer, MemoryTransport, Scope, SessionContext, SyncTiming, Ui, UiEvent, WorkspaceApi,
};
use syncspace_core::{
    BoardState, ChatMessage, Column, DocumentRecord, DocumentSummary, Identity, NewTask,
    NotificationFeed, ProjectSummary, Task, WorkspaceSummary,
};

pub fn alice() -> Identity {
    Identity::new("u-alice", "Alice")
}

#[derive(Default)]
pub struct FakeState {
    pub workspaces: Vec<WorkspaceSummary>,
    pub projects: Vec<ProjectSummary>,
    pub documents: Vec<DocumentSummary>,
    pub history: Vec<ChatMessage>,
    pub document: DocumentRecord,
    pub board: BoardState,
    pub feed: NotificationFeed,

    pub saves: Vec<(String, String)>,
    /// Per-save response delays, consumed in issue order.
    pub save_delays: VecDeque<Duration>,
    /// Per-save outcomes, consumed in issue order; missing means success.
    pub save_failures: VecDeque<bool>,
    pub moves: Vec<(String, String)>,
    pub created: Vec<NewTask>,
    pub deleted: Vec<String>,
    pub marked_read: usize,
    pub cleared: usize,

    pub fail_moves: bool,
    /// Error text the server gives for a rejected move.
    pub move_error: Option<String>,
    pub fail_loads: bool,
    pub board_loads: usize,
    /// Delay before every board load answers.
    pub board_delay: Duration,
}

#[derive(Default)]
pub struct FakeApi {
    pub state: Mutex<FakeState>,
}

fn server_error(message: &str) -> ApiError {
    ApiError::Status {
        status: 500,
        message: message.to_string(),
    }
}

impl FakeApi {
    pub fn with(f: impl FnOnce(&mut FakeState)) -> Arc<Self> {
        let api = Self::default();
        f(&mut api.state.lock().unwrap());
        Arc::new(api)
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl WorkspaceApi for FakeApi {
    async fn workspaces(&self) -> Result<Vec<WorkspaceSummary>, ApiError> {
        Ok(self.lock().workspaces.clone())
    }

    async fn projects(&self) -> Result<Vec<ProjectSummary>, ApiError> {
        Ok(self.lock().projects.clone())
    }

    async fn documents(&self, workspace_id: &str) -> Result<Vec<DocumentSummary>, ApiError> {
        let state = self.lock();
        Ok(state
            .documents
            .iter()
            .filter(|d| d.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn chat_history(&self, _workspace_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let state = self.lock();
        if state.fail_loads {
            return Err(server_error("Failed to get messages"));
        }
        Ok(state.history.clone())
    }

    async fn load_document(&self, _document_id: &str) -> Result<DocumentRecord, ApiError> {
        let state = self.lock();
        if state.fail_loads {
            return Err(server_error("Failed to get document"));
        }
        Ok(state.document.clone())
    }

    async fn save_document(&self, document_id: &str, content: &str) -> Result<(), ApiError> {
        let (delay, fail) = {
            let mut state = self.lock();
            state.saves.push((document_id.to_string(), content.to_string()));
            let delay = state.save_delays.pop_front().unwrap_or_default();
            let fail = state.save_failures.pop_front().unwrap_or(false);
            (delay, fail)
        };
        tokio::time::sleep(delay).await;
        if fail {
            Err(server_error("Failed to update document"))
        } else {
            Ok(())
        }
    }

    async fn load_board(&self, _workspace_id: &str) -> Result<BoardState, ApiError> {
        let delay = {
            let mut state = self.lock();
            state.board_loads += 1;
            state.board_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let state = self.lock();
        if state.fail_loads {
            return Err(server_error("Failed to get kanban board"));
        }
        Ok(state.board.clone())
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        let mut state = self.lock();
        state.created.push(task.clone());
        Ok(Task {
            id: format!("t-new-{}", state.created.len()),
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority.clone(),
            status: task.status.clone(),
            due_date: task.due_date.clone(),
            assigned_to: Vec::new(),
            workspace_id: task.workspace_id.clone(),
        })
    }

    async fn move_task(&self, task_id: &str, status: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.moves.push((task_id.to_string(), status.to_string()));
        if state.fail_moves {
            let message = state.move_error.as_deref().unwrap_or("Failed to move task");
            return Err(server_error(message));
        }
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
        self.lock().deleted.push(task_id.to_string());
        Ok(())
    }

    async fn notifications(&self) -> Result<NotificationFeed, ApiError> {
        Ok(self.lock().feed.clone())
    }

    async fn mark_notifications_read(&self) -> Result<(), ApiError> {
        self.lock().marked_read += 1;
        Ok(())
    }

    async fn clear_notifications(&self) -> Result<(), ApiError> {
        self.lock().cleared += 1;
        Ok(())
    }
}

pub fn sample_board() -> BoardState {
    let column = |id: &str, title: &str| Column {
        id: id.to_string(),
        title: title.to_string(),
        color: String::new(),
    };
    let task = |id: &str, status: &str| Task {
        id: id.to_string(),
        title: format!("Task {id}"),
        description: String::new(),
        priority: "medium".to_string(),
        status: status.to_string(),
        due_date: None,
        assigned_to: Vec::new(),
        workspace_id: "w1".to_string(),
    };
    BoardState {
        boards: vec![
            column("todo", "To Do"),
            column("in_progress", "In Progress"),
            column("review", "Review"),
            column("done", "Done"),
        ],
        tasks: vec![task("t1", "todo"), task("t2", "todo"), task("t3", "done")],
    }
}

pub struct Harness {
    pub ctx: SessionContext,
    pub api: Arc<FakeApi>,
    pub listener: MemoryListener,
    pub ui_rx: mpsc::UnboundedReceiver<UiEvent>,
}

impl Harness {
    pub fn new(api: Arc<FakeApi>) -> Self {
        let (transport, listener) = MemoryTransport::new();
        let connection = ConnectionManager::new(
            alice(),
            Arc::new(transport),
            EventRouter::new(),
            ConnectionConfig::default(),
        );
        let (ui, ui_rx) = Ui::channel();
        let ctx = SessionContext::new(connection, api.clone(), ui, SyncTiming::default());
        Self {
            ctx,
            api,
            listener,
            ui_rx,
        }
    }

    /// Connect and return the server end with the handshake consumed.
    pub async fn connect(&mut self) -> MemoryPeer {
        self.ctx.connection.connect().await.unwrap();
        let mut peer = self.listener.accept().await.unwrap();
        peer.drain();
        peer
    }

    pub fn drain_ui(&mut self) -> Vec<UiEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.ui_rx.try_recv() {
            out.push(event);
        }
        out
    }
}

/// An event pushed by the server on behalf of another participant.
pub fn remote(event: &str, scope: Scope, payload: Value) -> Envelope {
    Envelope {
        event: event.to_string(),
        scope,
        origin: None,
        payload,
    }
}

/// Names of everything the client has emitted so far.
pub fn emitted(peer: &mut MemoryPeer) -> Vec<String> {
    peer.drain().into_iter().map(|e| e.event).collect()
}

/// Let spawned tasks (the connection supervisor, save requests) run.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
