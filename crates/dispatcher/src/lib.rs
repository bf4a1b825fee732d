//! Agent-side half of the command relay.
//!
//! The [`Dispatcher`] polls a [`RelayTransport`] on a fixed interval,
//! executes every drained command through the [`CommandExecutor`] and
//! reports exactly one result per command. Transport failures are logged
//! and retried on the next tick; nothing stops the poll cycle except
//! [`Dispatcher::stop_polling`].

pub mod errors;
mod executor;
mod http;
mod metrics;
mod transport;

pub use errors::TransportError;
pub use executor::{BrowseDurations, CommandExecutor};
pub use http::{HttpRelayClient, RelayStatus};
pub use metrics::{DispatcherMetrics, DispatcherMetricsSnapshot};
pub use relay_scheduler::TickerStart;
pub use transport::{LocalRelay, RelayTransport};

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use relay_core_types::{Command, ResultReport};
use relay_scheduler::Ticker;
use tracing::{debug, error, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub received: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Results that could not be delivered back to the relay
    pub unreported: usize,
    pub poll_error: Option<String>,
}

struct DispatcherInner {
    transport: Arc<dyn RelayTransport>,
    executor: CommandExecutor,
    metrics: DispatcherMetrics,
    cycle: tokio::sync::Mutex<()>,
}

impl DispatcherInner {
    async fn poll_once(&self) -> PollReport {
        let _cycle = self.cycle.lock().await;
        self.metrics.record_poll();

        let commands = match self.transport.poll().await {
            Ok(commands) => commands,
            Err(err) => {
                self.metrics.record_transport_error();
                warn!(error = %err, "command poll failed");
                return PollReport {
                    poll_error: Some(err.to_string()),
                    ..PollReport::default()
                };
            }
        };

        let mut report = PollReport {
            received: commands.len(),
            ..PollReport::default()
        };
        for command in &commands {
            let outcome = self.execute_isolated(command).await;
            self.metrics.record_executed(outcome.success);
            if outcome.success {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
            debug!(
                command_id = %command.id,
                success = outcome.success,
                message = %outcome.message,
                "reporting result"
            );
            if let Err(err) = self.transport.report(&command.id, &outcome).await {
                self.metrics.record_transport_error();
                report.unreported += 1;
                warn!(command_id = %command.id, error = %err, "result report failed");
            }
        }
        report
    }

    /// Execute one command; a panic becomes a failed result for that
    /// command only.
    async fn execute_isolated(&self, command: &Command) -> ResultReport {
        match AssertUnwindSafe(self.executor.execute(command))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_reason(panic.as_ref());
                error!(command_id = %command.id, kind = %command.kind, reason, "command execution panicked");
                ResultReport::failed(format!("Error: {reason}"))
            }
        }
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "command panicked"
    }
}

pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
    ticker: Ticker,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn RelayTransport>,
        executor: CommandExecutor,
        poll_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                transport,
                executor,
                metrics: DispatcherMetrics::default(),
                cycle: tokio::sync::Mutex::new(()),
            }),
            ticker: Ticker::new("command-poll", poll_interval),
        }
    }

    /// Run one poll cycle now. Cycles never overlap.
    pub async fn poll_once(&self) -> PollReport {
        self.inner.poll_once().await
    }

    /// Poll on the configured interval, starting immediately.
    pub fn start_polling(&self) -> TickerStart {
        let inner = Arc::clone(&self.inner);
        self.ticker.start(move || {
            let inner = Arc::clone(&inner);
            async move {
                inner.poll_once().await;
            }
        })
    }

    /// Stop future poll cycles; a cycle in progress finishes.
    pub fn stop_polling(&self) -> bool {
        self.ticker.stop()
    }

    pub fn is_polling(&self) -> bool {
        self.ticker.is_active()
    }

    pub fn poll_interval(&self) -> Duration {
        self.ticker.period()
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.inner.executor
    }

    pub fn metrics(&self) -> DispatcherMetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}
