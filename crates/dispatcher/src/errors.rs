//! Relay transport failures

use thiserror::Error;

/// The relay could not be reached or answered unexpectedly. Always
/// recoverable: the next poll cycle simply tries again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("relay request failed: {0}")]
    Request(String),

    #[error("relay returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("relay response invalid: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}
