//! Error types for the sync module.

use thiserror::Error;

use chatline_core::Topic;
use chatline_transport::TransportError;

/// Errors surfaced to synchronizer consumers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The history fetch failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No topic is bound.
    #[error("no topic bound")]
    NotBound,

    /// The initial page has not loaded (still loading or failed).
    #[error("topic has not finished its initial load")]
    NotReady,

    /// A fetch of the same kind is already in flight.
    #[error("a load is already in flight")]
    LoadInFlight,

    /// The request was made for a topic that has since been replaced.
    #[error("binding for {0} was superseded")]
    Superseded(Topic),

    /// The synchronizer has shut down.
    #[error("synchronizer closed")]
    Closed,
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
