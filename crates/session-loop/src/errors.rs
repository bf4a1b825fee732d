use thiserror::Error;

use crate::BrowseVariant;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Only one session of either variant may run at a time.
    #[error("{running} already running")]
    AlreadyRunning { running: BrowseVariant },
}
