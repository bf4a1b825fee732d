use std::sync::Arc;

use async_trait::async_trait;
use relay_command_store::CommandStore;
use relay_core_types::{Command, CommandId, ResultReport};

use crate::errors::TransportError;

/// Agent-side view of the relay: drain pending commands, report results.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn poll(&self) -> Result<Vec<Command>, TransportError>;

    async fn report(&self, command_id: &CommandId, report: &ResultReport)
        -> Result<(), TransportError>;
}

/// Transport over a command store in the same process.
pub struct LocalRelay {
    store: Arc<CommandStore>,
}

impl LocalRelay {
    pub fn new(store: Arc<CommandStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<CommandStore> {
        &self.store
    }
}

#[async_trait]
impl RelayTransport for LocalRelay {
    async fn poll(&self) -> Result<Vec<Command>, TransportError> {
        Ok(self.store.drain_pending())
    }

    async fn report(
        &self,
        command_id: &CommandId,
        report: &ResultReport,
    ) -> Result<(), TransportError> {
        self.store.record_result(command_id.clone(), report.clone());
        Ok(())
    }
}
