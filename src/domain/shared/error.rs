//! Relay errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Malformed protocol frame: {0}")]
    Protocol(#[source] serde_json::Error),

    #[error("Invalid caller number: {0}")]
    InvalidCallerNumber(String),

    #[error("Session transport closed")]
    TransportClosed,

    #[error("Response agent failed: {0}")]
    Agent(String),

    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl RelayError {
    /// The peer went away; the owning loop ends quietly.
    pub fn is_transport(&self) -> bool {
        matches!(self, RelayError::TransportClosed)
    }

    /// A single bad inbound frame. It is dropped and the session keeps running.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            RelayError::Protocol(_) | RelayError::InvalidCallerNumber(_)
        )
    }
}
