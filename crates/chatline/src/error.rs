//! Error types for the client.

use chatline_sync::SyncError;
use chatline_transport::{ChannelError, TransportError};
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Synchronizer error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// History transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Live channel error.
    #[error("live channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
