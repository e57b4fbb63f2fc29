//! In-process transport.
//!
//! Every successful [`MemoryTransport::open`] hands the far end of the new
//! link to the paired [`MemoryListener`] as a [`MemoryPeer`]. The peer plays
//! the server: it sees what the client emits and can push events back.
//! Dropping the peer looks like a network loss to the client.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Link, Transport, LINK_CAPACITY};
use crate::error::CollabError;
use crate::protocol::Envelope;

struct Shared {
    offline: AtomicBool,
    opened: AtomicUsize,
}

pub struct MemoryTransport {
    shared: Arc<Shared>,
    accept_tx: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemoryTransport {
    pub fn new() -> (Self, MemoryListener) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            offline: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
        });
        let transport = Self {
            shared: shared.clone(),
            accept_tx,
        };
        (transport, MemoryListener { accept_rx, shared })
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self) -> Result<Link, CollabError> {
        if self.shared.offline.load(Ordering::SeqCst) {
            return Err(CollabError::Transport("server unreachable".into()));
        }

        let (out_tx, out_rx) = mpsc::channel(LINK_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel(LINK_CAPACITY);
        let peer = MemoryPeer {
            inbound: out_rx,
            outbound: in_tx,
        };
        self.accept_tx
            .send(peer)
            .map_err(|_| CollabError::Transport("listener closed".into()))?;
        self.shared.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Link {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

/// Server side of a [`MemoryTransport`].
pub struct MemoryListener {
    accept_rx: mpsc::UnboundedReceiver<MemoryPeer>,
    shared: Arc<Shared>,
}

impl MemoryListener {
    /// Next link opened by the client.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.recv().await
    }

    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.try_recv().ok()
    }

    /// While offline, every `open` fails.
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.store(offline, Ordering::SeqCst);
    }

    /// Links opened so far.
    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }
}

/// One accepted link, seen from the server.
#[derive(Debug)]
pub struct MemoryPeer {
    /// Envelopes the client emitted.
    pub inbound: mpsc::Receiver<Envelope>,
    /// Push envelopes to the client.
    pub outbound: mpsc::Sender<Envelope>,
}

impl MemoryPeer {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.inbound.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.inbound.try_recv().ok()
    }

    /// Everything emitted so far, without waiting.
    pub fn drain(&mut self) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Ok(envelope) = self.inbound.try_recv() {
            out.push(envelope);
        }
        out
    }

    pub async fn send(&self, envelope: Envelope) -> bool {
        self.outbound.send(envelope).await.is_ok()
    }
}
