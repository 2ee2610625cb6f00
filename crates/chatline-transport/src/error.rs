//! Error types for the transport module.

use thiserror::Error;

/// Errors from the history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The endpoint answered with a non-success status.
    #[error("history request failed with status {status}")]
    Status { status: u16 },

    /// The request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// The response body was not a valid page.
    #[error("invalid page body: {0}")]
    Decode(String),

    /// The endpoint could not be turned into a request URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl TransportError {
    /// The HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
            }
        } else if err.is_builder() {
            TransportError::InvalidEndpoint(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::InvalidEndpoint(err.to_string())
    }
}

/// Connection-level failures of the live channel.
///
/// These never reach subscribers; the channel logs them, reports
/// [`Connectivity::Disconnected`](crate::Connectivity) and reconnects.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// WebSocket handshake or stream failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,

    /// The live URL is not a ws:// or wss:// URL.
    #[error("invalid live url: {0}")]
    InvalidUrl(String),
}

/// Result type for history fetches.
pub type Result<T> = std::result::Result<T, TransportError>;
