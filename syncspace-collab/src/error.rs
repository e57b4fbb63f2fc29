//! Error type for the collaboration client.

use syncspace_core::SyncError;

use crate::api::ApiError;
use crate::protocol::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    /// The transport could not be opened or broke mid-write.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An emit was attempted with no live connection. Nothing is queued.
    #[error("Not connected")]
    NotConnected,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}
