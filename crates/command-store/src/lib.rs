//! In-memory command store backing the relay.
//!
//! Holds the pending command queue and a bounded history of reported
//! results. Queue drain and history append share one lock so a command is
//! never handed out twice and results never interleave. Results can also be
//! awaited by command id through a small correlation map.

mod id;

pub use id::CommandIdGenerator;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use relay_core_types::{
    Command, CommandId, CommandResult, CommandStatus, RelayError, ResultReport,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info};

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Read-only snapshot of the store.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub queue_length: usize,
    pub history_length: usize,
    /// Seconds since the store was created.
    pub uptime: f64,
}

#[derive(Default)]
struct StoreInner {
    queue: Vec<Command>,
    history: VecDeque<CommandResult>,
}

pub struct CommandStore {
    inner: Mutex<StoreInner>,
    waiters: DashMap<CommandId, Vec<oneshot::Sender<CommandResult>>>,
    ids: CommandIdGenerator,
    started: Instant,
    history_capacity: usize,
}

impl Default for CommandStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandStore {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(history_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            waiters: DashMap::new(),
            ids: CommandIdGenerator::new(),
            started: Instant::now(),
            history_capacity: history_capacity.max(1),
        }
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    /// Queue a command. Only a missing kind is rejected; unknown kinds are
    /// accepted and left for the agent to report on.
    pub fn enqueue(&self, kind: &str, payload: Value) -> Result<CommandId, RelayError> {
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(RelayError::InvalidCommand("Command is required".to_string()));
        }
        let id = self.ids.next();
        let command = Command::new(id.clone(), kind, payload);
        info!(command_id = %id, kind, "command queued");
        self.inner.lock().queue.push(command);
        Ok(id)
    }

    /// Hand every queued command to the caller and empty the queue.
    pub fn drain_pending(&self) -> Vec<Command> {
        let mut drained = std::mem::take(&mut self.inner.lock().queue);
        for command in drained.iter_mut() {
            command.status = CommandStatus::Delivered;
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "drained pending commands");
        }
        drained
    }

    /// Append a result to history. Unknown ids are accepted as-is.
    pub fn record_result(&self, command_id: CommandId, report: ResultReport) -> CommandResult {
        let result = CommandResult::from_report(command_id, report);
        {
            let mut inner = self.inner.lock();
            inner.history.push_back(result.clone());
            while inner.history.len() > self.history_capacity {
                inner.history.pop_front();
            }
        }
        info!(
            command_id = %result.command_id,
            success = result.success,
            message = %result.message,
            "command result recorded"
        );
        if let Some((_, waiters)) = self.waiters.remove(&result.command_id) {
            for waiter in waiters {
                let _ = waiter.send(result.clone());
            }
        }
        result
    }

    /// The most recent `limit` results, oldest first.
    pub fn history(&self, limit: usize) -> Vec<CommandResult> {
        let inner = self.inner.lock();
        let skip = inner.history.len().saturating_sub(limit);
        inner.history.iter().skip(skip).cloned().collect()
    }

    /// Latest recorded result for a command, if it is still in history.
    pub fn find_result(&self, command_id: &CommandId) -> Option<CommandResult> {
        self.inner
            .lock()
            .history
            .iter()
            .rev()
            .find(|result| &result.command_id == command_id)
            .cloned()
    }

    /// Receiver completed by the next result recorded for `command_id`.
    /// Abandoned receivers for the same id are swept on each call.
    pub fn subscribe_result(&self, command_id: &CommandId) -> oneshot::Receiver<CommandResult> {
        let (tx, rx) = oneshot::channel();
        let mut senders = self.waiters.entry(command_id.clone()).or_default();
        senders.retain(|sender| !sender.is_closed());
        senders.push(tx);
        rx
    }

    /// Wait up to `timeout` for a result, returning one already in history
    /// without waiting. The waiter is removed however the wait ends,
    /// including when this future is dropped.
    pub async fn wait_for_result(
        &self,
        command_id: &CommandId,
        timeout: Duration,
    ) -> Option<CommandResult> {
        let mut waiter = ResultWaiter {
            store: self,
            command_id,
            receiver: Some(self.subscribe_result(command_id)),
        };
        if let Some(existing) = self.find_result(command_id) {
            return Some(existing);
        }
        let receiver = waiter.receiver.as_mut()?;
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(result)) => Some(result),
            _ => None,
        }
    }

    fn prune_waiters(&self, command_id: &CommandId) {
        if let Some(mut entry) = self.waiters.get_mut(command_id) {
            entry.retain(|sender| !sender.is_closed());
        }
        self.waiters.remove_if(command_id, |_, senders| senders.is_empty());
    }

    pub fn status(&self) -> StoreStatus {
        let inner = self.inner.lock();
        StoreStatus {
            queue_length: inner.queue.len(),
            history_length: inner.history.len(),
            uptime: self.started.elapsed().as_secs_f64(),
        }
    }

    pub fn pending_waiters(&self) -> usize {
        self.waiters.iter().map(|entry| entry.value().len()).sum()
    }
}

struct ResultWaiter<'a> {
    store: &'a CommandStore,
    command_id: &'a CommandId,
    receiver: Option<oneshot::Receiver<CommandResult>>,
}

impl Drop for ResultWaiter<'_> {
    fn drop(&mut self) {
        // Close the channel first so the sender is seen as abandoned.
        self.receiver.take();
        self.store.prune_waiters(self.command_id);
    }
}
