//! Error types for page interactions

use thiserror::Error;

/// Failure of a single page interaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The element or resource the interaction needs is not on the page
    #[error("Element not found: {0}")]
    NotFound(String),

    /// Navigation did not complete
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Script evaluation inside the page failed
    #[error("Script error: {0}")]
    Script(String),

    /// The hosted document is not reachable (closed tab, detached frame)
    #[error("Page unavailable: {0}")]
    Unavailable(String),

    /// The page refused the interaction (bad credentials, blocked action)
    #[error("Interaction rejected: {0}")]
    Rejected(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;
