//! Kanban board.
//!
//! Board state is authoritative on the server. Local changes are applied
//! only after the request succeeds, then announced with `kanban_update`;
//! every other client answers the resulting `kanban_changed` with a full
//! reload rather than a delta.

use syncspace_core::{BoardState, FullReplace, NewTask, Reconciled, SyncError, SyncedView, Task};

use crate::context::SessionContext;
use crate::error::CollabError;
use crate::protocol::{events, Envelope, KanbanPayload, Scope};
use crate::router::Subscription;
use crate::ui::{ToastLevel, UiEvent};

pub const KANBAN_EVENTS: &[&str] = &[events::KANBAN_CHANGED];

pub struct KanbanBoard {
    ctx: SessionContext,
    workspace_id: String,
    view: SyncedView<FullReplace<BoardState>>,
    dragged: Option<String>,
    /// Received but not yet fully handled.
    parked: Option<Envelope>,
    sub: Subscription,
}

impl KanbanBoard {
    pub async fn open(ctx: SessionContext, workspace_id: &str) -> Self {
        let sub = ctx.subscribe(Scope::Workspace(workspace_id.to_string()), KANBAN_EVENTS);
        let mut board = Self {
            view: SyncedView::new(ctx.identity().id.clone(), BoardState::default()),
            workspace_id: workspace_id.to_string(),
            dragged: None,
            parked: None,
            sub,
            ctx,
        };
        board.reload().await;
        board
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn state(&self) -> &BoardState {
        self.view.state()
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.view.state().task(task_id)
    }

    /// Fetch the board and tasks and re-render.
    pub async fn reload(&mut self) -> bool {
        match self.ctx.api.load_board(&self.workspace_id).await {
            Ok(board) => {
                self.view.reset(board);
                self.render();
                true
            }
            Err(e) => {
                log::error!("Error loading kanban board: {e}");
                self.ctx.ui.toast(ToastLevel::Error, "Failed to load kanban board");
                false
            }
        }
    }

    fn render(&self) {
        self.ctx.ui.send(UiEvent::BoardRendered {
            columns: self.view.state().layout(),
        });
    }

    async fn announce(&self) {
        let envelope = Envelope::kanban_update(self.ctx.identity(), &self.workspace_id);
        self.ctx.emit(envelope).await;
    }

    pub fn begin_drag(&mut self, task_id: &str) {
        self.dragged = Some(task_id.to_string());
    }

    pub fn end_drag(&mut self) {
        self.dragged = None;
    }

    pub fn dragged(&self) -> Option<&str> {
        self.dragged.as_deref()
    }

    /// Drop the dragged task on a column. Nothing happens without a drag.
    pub async fn drop_on(&mut self, column_id: &str) -> Result<(), CollabError> {
        let Some(task_id) = self.dragged.take() else {
            return Ok(());
        };
        self.move_task(&task_id, column_id).await
    }

    /// Move a task to another column.
    ///
    /// The local status changes only once the server accepts the move; on
    /// any failure the board is left untouched and an error toast is shown.
    pub async fn move_task(&mut self, task_id: &str, column_id: &str) -> Result<(), CollabError> {
        let state = self.view.state();
        if !state.boards.is_empty() && !state.has_column(column_id) {
            self.ctx.ui.toast(ToastLevel::Error, "Failed to move task");
            return Err(SyncError::UnknownColumn(column_id.to_string()).into());
        }

        if let Err(e) = self.ctx.api.move_task(task_id, column_id).await {
            log::error!("Error moving task: {e}");
            self.ctx.ui.toast(ToastLevel::Error, e.user_message("Failed to move task"));
            return Err(e.into());
        }

        if let Err(e) = self.view.mutate_local(|board| board.move_task(task_id, column_id)) {
            // Accepted by the server but unknown here; the board is stale.
            log::warn!("Moved task missing locally ({e}), reloading");
            self.reload().await;
        } else {
            self.render();
        }
        self.announce().await;
        self.ctx.ui.toast(ToastLevel::Success, "Task moved successfully");
        Ok(())
    }

    pub async fn create_task(&mut self, task: NewTask) -> Result<Task, CollabError> {
        match self.ctx.api.create_task(&task).await {
            Ok(created) => {
                self.view.mutate_local(|board| board.tasks.push(created.clone()));
                self.render();
                self.announce().await;
                self.ctx.ui.toast(ToastLevel::Success, "Task created successfully");
                Ok(created)
            }
            Err(e) => {
                log::error!("Error creating task: {e}");
                self.ctx.ui.toast(ToastLevel::Error, e.user_message("Failed to create task"));
                Err(e.into())
            }
        }
    }

    pub async fn delete_task(&mut self, task_id: &str) -> Result<(), CollabError> {
        if let Err(e) = self.ctx.api.delete_task(task_id).await {
            log::error!("Error deleting task: {e}");
            self.ctx.ui.toast(ToastLevel::Error, e.user_message("Failed to delete task"));
            return Err(e.into());
        }
        self.view.mutate_local(|board| board.remove_task(task_id));
        self.render();
        self.announce().await;
        self.ctx.ui.toast(ToastLevel::Success, "Task deleted successfully");
        Ok(())
    }

    /// Apply one routed event. Returns `true` if the board was reloaded.
    pub async fn handle(&mut self, envelope: Envelope) -> bool {
        if envelope.event != events::KANBAN_CHANGED {
            return false;
        }
        let payload: KanbanPayload = envelope.payload_or_default();
        if !payload.workspace_id.is_empty() && payload.workspace_id != self.workspace_id {
            return false;
        }
        let origin = envelope.originator();
        if self.view.is_echo(origin) {
            log::debug!("Ignoring own kanban change");
            return false;
        }

        match self.ctx.api.load_board(&self.workspace_id).await {
            Ok(board) => {
                log::info!("Kanban board updated by another user");
                if self.view.apply_remote(origin, board) == Reconciled::Applied {
                    self.render();
                }
                true
            }
            Err(e) => {
                log::error!("Error reloading kanban board: {e}");
                self.ctx.ui.toast(ToastLevel::Error, "Failed to load kanban board");
                false
            }
        }
    }

    /// Wait for the next inbound event and process it.
    ///
    /// Returns `false` once the subscription has closed. Cancel-safe: the
    /// event stays parked until its reload completes, so a step dropped
    /// mid-request picks the same event up again on the next call.
    pub async fn step(&mut self) -> bool {
        let envelope = match &self.parked {
            Some(envelope) => envelope.clone(),
            None => match self.sub.recv().await {
                Some(envelope) => {
                    self.parked = Some(envelope.clone());
                    envelope
                }
                None => return false,
            },
        };
        self.handle(envelope).await;
        self.parked = None;
        true
    }

    pub fn close(self) {
        log::info!("Closed kanban board {}", self.workspace_id);
    }
}
