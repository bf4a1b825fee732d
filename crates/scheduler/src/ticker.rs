use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickerStart {
    Started,
    AlreadyActive,
}

struct ActiveTicker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs a task on a fixed period until stopped.
///
/// The first tick fires immediately. Stopping cancels future ticks only; a
/// tick already running is allowed to finish.
pub struct Ticker {
    name: &'static str,
    period: Duration,
    active: Mutex<Option<ActiveTicker>>,
}

impl Ticker {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period,
            active: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .map(|active| !active.handle.is_finished())
            .unwrap_or(false)
    }

    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(&self, mut tick: F) -> TickerStart
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self.active.lock();
        if let Some(active) = guard.as_ref() {
            if !active.handle.is_finished() {
                debug!(ticker = self.name, "ticker already active");
                return TickerStart::AlreadyActive;
            }
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = self.period;
        let name = self.name;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                tick().await;
            }
            debug!(ticker = name, "ticker loop exited");
        });
        info!(ticker = self.name, period_ms = period.as_millis() as u64, "ticker started");
        *guard = Some(ActiveTicker { cancel, handle });
        TickerStart::Started
    }

    /// Returns whether a running ticker was stopped.
    pub fn stop(&self) -> bool {
        match self.active.lock().take() {
            Some(active) => {
                active.cancel.cancel();
                info!(ticker = self.name, "ticker stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.cancel.cancel();
        }
    }
}
