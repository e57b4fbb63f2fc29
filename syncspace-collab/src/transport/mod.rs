//! Bidirectional event channel seam.
//!
//! A [`Transport`] opens one [`Link`] per connection attempt. The link is a
//! pair of channels: envelopes pushed into `outbound` are written to the
//! wire, envelopes read from the wire arrive on `inbound`. When the
//! underlying connection dies, `inbound` yields `None`.

pub mod memory;
pub mod websocket;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CollabError;
use crate::protocol::Envelope;

pub use memory::{MemoryListener, MemoryPeer, MemoryTransport};
pub use websocket::WebSocketTransport;

/// Buffered envelopes per direction.
pub const LINK_CAPACITY: usize = 256;

/// One live connection.
#[derive(Debug)]
pub struct Link {
    pub outbound: mpsc::Sender<Envelope>,
    pub inbound: mpsc::Receiver<Envelope>,
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a fresh connection. Fails if the server is unreachable.
    async fn open(&self) -> Result<Link, CollabError>;
}
