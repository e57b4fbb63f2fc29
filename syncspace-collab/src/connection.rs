//! Connection manager: the single shared event channel.
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──open ok──► Connected
//!      ▲                          │                      │ link lost
//!      │                      open failed                ▼
//!      └──────────────────────────┴────exhausted──── Reconnecting ──open ok──► Connected
//! ```
//!
//! Every transition into `Connected` replays the handshake: subscribe to
//! the personal notification scope, announce `user_online`, then re-emit
//! each live subscription's rejoin envelope.
//!
//! `emit` is fire-and-forget. Nothing is queued while offline; a dropped
//! envelope is logged and a connect attempt is started in the background.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use syncspace_core::Identity;

use crate::error::CollabError;
use crate::protocol::Envelope;
use crate::router::EventRouter;
use crate::transport::{Link, Transport};

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Transitions surfaced to the user as a transient status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting { attempt: u32 },
    Reconnected { attempts: u32 },
    /// Retry budget exhausted. Terminal until the next `connect`.
    Failed,
}

impl ConnectionStatus {
    pub fn label(&self) -> String {
        match self {
            ConnectionStatus::Connected => "Connected".to_string(),
            ConnectionStatus::Disconnected => "Disconnected".to_string(),
            ConnectionStatus::Reconnecting { attempt } => format!("Reconnecting ({attempt})..."),
            ConnectionStatus::Reconnected { .. } => "Reconnected".to_string(),
            ConnectionStatus::Failed => "Connection failed".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ConnectionStatus::Disconnected | ConnectionStatus::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Reconnect attempts after a loss before giving up.
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect attempt; doubled per attempt.
    pub reconnect_delay: Duration,
    /// Upper bound on the reconnect delay.
    pub reconnect_delay_max: Duration,
    /// Abandon a single `open` after this long.
    pub connect_timeout: Duration,
    /// How long a status indicator stays on screen.
    pub status_display: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(1),
            reconnect_delay_max: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            status_display: Duration::from_secs(3),
        }
    }
}

impl ConnectionConfig {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.reconnect_delay
            .saturating_mul(factor)
            .min(self.reconnect_delay_max)
    }
}

struct Inner {
    identity: Identity,
    transport: Arc<dyn Transport>,
    router: EventRouter,
    config: ConnectionConfig,
    state: RwLock<ConnectionState>,
    /// Present exactly while connected.
    outgoing: Mutex<Option<mpsc::Sender<Envelope>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    status_tx: broadcast::Sender<ConnectionStatus>,
}

impl Inner {
    fn notify(&self, status: ConnectionStatus) {
        log::info!("Connection status: {}", status.label());
        let _ = self.status_tx.send(status);
    }

    async fn open_link(&self) -> Result<Link, CollabError> {
        match tokio::time::timeout(self.config.connect_timeout, self.transport.open()).await {
            Ok(result) => result,
            Err(_) => Err(CollabError::Transport("connect timed out".into())),
        }
    }

    /// Send the handshake and mark the link live.
    async fn establish(&self, link: Link) -> mpsc::Receiver<Envelope> {
        let Link { outbound, inbound } = link;

        let mut handshake = vec![
            Envelope::subscribe_notifications(&self.identity),
            Envelope::user_online(&self.identity),
        ];
        let rejoin = self.router.rejoin_envelopes();
        if !rejoin.is_empty() {
            log::info!("Rejoining {} scopes", rejoin.len());
        }
        handshake.extend(rejoin);

        for envelope in handshake {
            if outbound.send(envelope).await.is_err() {
                log::warn!("Link closed during handshake");
                break;
            }
        }

        *self.outgoing.lock().await = Some(outbound);
        *self.state.write().await = ConnectionState::Connected;
        inbound
    }

    /// Bounded retry. Returns the new link and the attempt it succeeded on.
    async fn reconnect(&self) -> Option<(Link, u32)> {
        for attempt in 1..=self.config.max_reconnect_attempts {
            self.notify(ConnectionStatus::Reconnecting { attempt });
            tokio::time::sleep(self.config.backoff(attempt)).await;
            match self.open_link().await {
                Ok(link) => return Some((link, attempt)),
                Err(e) => log::warn!("Reconnect attempt {attempt} failed: {e}"),
            }
        }
        None
    }

    /// Route inbound traffic; on loss, reconnect or give up.
    async fn supervise(self: Arc<Self>, mut inbound: mpsc::Receiver<Envelope>) {
        loop {
            while let Some(envelope) = inbound.recv().await {
                self.router.dispatch(&envelope);
            }

            *self.outgoing.lock().await = None;
            *self.state.write().await = ConnectionState::Reconnecting;
            log::warn!("Connection lost");
            self.notify(ConnectionStatus::Disconnected);

            match self.reconnect().await {
                Some((link, attempts)) => {
                    inbound = self.establish(link).await;
                    self.notify(ConnectionStatus::Reconnected { attempts });
                }
                None => {
                    *self.state.write().await = ConnectionState::Disconnected;
                    log::error!(
                        "Giving up after {} reconnect attempts",
                        self.config.max_reconnect_attempts
                    );
                    self.notify(ConnectionStatus::Failed);
                    return;
                }
            }
        }
    }
}

/// Handle to the shared connection. Cheap to clone.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(
        identity: Identity,
        transport: Arc<dyn Transport>,
        router: EventRouter,
        config: ConnectionConfig,
    ) -> Self {
        let (status_tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                identity,
                transport,
                router,
                config,
                state: RwLock::new(ConnectionState::Disconnected),
                outgoing: Mutex::new(None),
                supervisor: Mutex::new(None),
                status_tx,
            }),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    pub fn router(&self) -> &EventRouter {
        &self.inner.router
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Subscribe to status transitions.
    pub fn status_events(&self) -> broadcast::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }

    pub async fn state(&self) -> ConnectionState {
        *self.inner.state.read().await
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Establish the channel. A no-op unless currently disconnected.
    pub async fn connect(&self) -> Result<(), CollabError> {
        {
            let mut state = self.inner.state.write().await;
            if *state != ConnectionState::Disconnected {
                log::debug!("Already {:?}", *state);
                return Ok(());
            }
            *state = ConnectionState::Connecting;
        }

        let link = match self.inner.open_link().await {
            Ok(link) => link,
            Err(e) => {
                *self.inner.state.write().await = ConnectionState::Disconnected;
                log::warn!("Connect failed: {e}");
                self.inner.notify(ConnectionStatus::Failed);
                return Err(e);
            }
        };

        if *self.inner.state.read().await != ConnectionState::Connecting {
            // disconnect() ran while the link was opening
            return Ok(());
        }

        let inbound = self.inner.establish(link).await;
        let handle = tokio::spawn(self.inner.clone().supervise(inbound));
        if let Some(old) = self.inner.supervisor.lock().await.replace(handle) {
            old.abort();
        }
        self.inner.notify(ConnectionStatus::Connected);
        Ok(())
    }

    /// Send if connected; otherwise drop the envelope, log it, and start a
    /// connect attempt in the background.
    pub async fn emit(&self, envelope: Envelope) -> Result<(), CollabError> {
        let tx = self.inner.outgoing.lock().await.clone();
        if let Some(tx) = tx {
            let event = envelope.event.clone();
            return tx.send(envelope).await.map_err(|_| {
                log::warn!("Failed to deliver '{event}': link closed");
                CollabError::NotConnected
            });
        }

        log::warn!("Not connected, dropping '{}'", envelope.event);
        if self.state().await == ConnectionState::Disconnected {
            let this = self.clone();
            tokio::spawn(async move {
                if let Err(e) = this.connect().await {
                    log::warn!("Background connect failed: {e}");
                }
            });
        }
        Err(CollabError::NotConnected)
    }

    /// Announce `user_offline` and tear the channel down.
    pub async fn disconnect(&self) {
        if let Some(handle) = self.inner.supervisor.lock().await.take() {
            handle.abort();
        }

        let tx = self.inner.outgoing.lock().await.take();
        if let Some(tx) = tx {
            if tx.send(Envelope::user_offline(&self.inner.identity)).await.is_err() {
                log::debug!("Link already closed at disconnect");
            }
        }

        let previous = {
            let mut state = self.inner.state.write().await;
            std::mem::replace(&mut *state, ConnectionState::Disconnected)
        };
        if previous != ConnectionState::Disconnected {
            self.inner.notify(ConnectionStatus::Disconnected);
        }
    }
}
