//! Explicit session context handed to every view manager.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use syncspace_core::Identity;

use crate::api::{HttpApi, WorkspaceApi};
use crate::config::{ClientConfig, SyncTiming};
use crate::connection::ConnectionManager;
use crate::error::CollabError;
use crate::protocol::{Envelope, Scope};
use crate::router::{EventRouter, Subscription};
use crate::transport::{Transport, WebSocketTransport};
use crate::ui::{Ui, UiEvent};

/// Everything a view manager needs: who the user is, the shared channel,
/// the REST collaborator, the presentation sink and the timing windows.
#[derive(Clone)]
pub struct SessionContext {
    pub connection: ConnectionManager,
    pub api: Arc<dyn WorkspaceApi>,
    pub ui: Ui,
    pub timing: SyncTiming,
}

impl SessionContext {
    pub fn new(
        connection: ConnectionManager,
        api: Arc<dyn WorkspaceApi>,
        ui: Ui,
        timing: SyncTiming,
    ) -> Self {
        Self {
            connection,
            api,
            ui,
            timing,
        }
    }

    /// Wire up a WebSocket channel and the HTTP API from `config`.
    ///
    /// Does not connect; call `connection.connect()` when ready.
    pub fn from_config(config: &ClientConfig, identity: Identity, ui: Ui) -> Result<Self, CollabError> {
        let transport: Arc<dyn Transport> = Arc::new(WebSocketTransport::new(
            &config.server_url,
            config.token.as_deref(),
        )?);
        let api = HttpApi::new(&config.api_base_url, config.token.as_deref())?;
        let connection = ConnectionManager::new(
            identity,
            transport,
            EventRouter::new(),
            config.connection.clone(),
        );
        Ok(Self::new(connection, Arc::new(api), ui, config.timing.clone()))
    }

    pub fn identity(&self) -> &Identity {
        self.connection.identity()
    }

    pub fn subscribe(&self, scope: Scope, events: &[&str]) -> Subscription {
        self.connection.router().subscribe(scope, events)
    }

    /// Fire-and-forget. Delivery failures are logged by the connection.
    pub async fn emit(&self, envelope: Envelope) {
        let _ = self.connection.emit(envelope).await;
    }

    /// Mirror connection status transitions into the UI.
    pub fn forward_status(&self) -> JoinHandle<()> {
        let mut status_rx = self.connection.status_events();
        let ui = self.ui.clone();
        let visible_for = self.connection.config().status_display;
        tokio::spawn(async move {
            loop {
                match status_rx.recv().await {
                    Ok(status) => ui.send(UiEvent::Connection {
                        status,
                        visible_for,
                    }),
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("Status forwarder skipped {skipped} transitions");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Envelopes queued by a manager's `step` and not yet handed to the
/// connection.
///
/// An envelope leaves the queue only after `emit` returns, so a `step`
/// dropped mid-delivery resends it on the next call.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: VecDeque<Envelope>,
}

impl Outbox {
    pub fn push(&mut self, envelope: Envelope) {
        self.queue.push_back(envelope);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub async fn deliver(&mut self, ctx: &SessionContext) {
        while let Some(envelope) = self.queue.front() {
            ctx.emit(envelope.clone()).await;
            self.queue.pop_front();
        }
    }
}
