//! Shared primitives for the browse relay: commands, results and the
//! catalog of command kinds understood by the agent.

mod catalog;
mod command;

pub use catalog::{catalog, CatalogEntry, CommandKind};
pub use command::{Command, CommandId, CommandResult, CommandStatus, ResultReport};

use thiserror::Error;

/// Errors raised at the relay boundary before a command is accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("{0}")]
    InvalidCommand(String),
}
