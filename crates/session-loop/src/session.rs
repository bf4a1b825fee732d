use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use page_adapter::PageAdapter;
use parking_lot::Mutex;
use relay_scheduler::Clock;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::browse::Browser;
use crate::errors::SessionError;
use crate::tempo::BrowseTempo;
use crate::BrowseVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Running { variant: BrowseVariant },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStarted {
    pub variant: BrowseVariant,
    pub duration: Duration,
    pub generation: u64,
}

/// Point-in-time view of the session slot. Counters cover the most recent
/// session, running or not.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub running: bool,
    pub variant: Option<BrowseVariant>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub elapsed: Option<Duration>,
    pub iterations: u64,
    pub failures: u64,
}

struct ActiveSession {
    generation: u64,
    variant: BrowseVariant,
    started_at: Instant,
    started_wall: DateTime<Utc>,
    duration: Duration,
    cancel: CancellationToken,
}

struct LoopInner {
    adapter: Arc<dyn PageAdapter>,
    clock: Arc<dyn Clock>,
    tempo: BrowseTempo,
    slot: Mutex<Option<ActiveSession>>,
    generation: AtomicU64,
    iterations: AtomicU64,
    failures: AtomicU64,
    phase: watch::Sender<SessionPhase>,
}

impl LoopInner {
    /// Clear the slot on natural completion, unless a newer session owns it.
    fn finish(&self, generation: u64) -> bool {
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            Some(active) if active.generation == generation => {
                *slot = None;
                self.phase.send_replace(SessionPhase::Idle);
                true
            }
            _ => false,
        }
    }
}

/// The single browse session slot of an agent.
pub struct SessionLoop {
    inner: Arc<LoopInner>,
}

impl SessionLoop {
    pub fn new(adapter: Arc<dyn PageAdapter>, clock: Arc<dyn Clock>, tempo: BrowseTempo) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Idle);
        Self {
            inner: Arc::new(LoopInner {
                adapter,
                clock,
                tempo,
                slot: Mutex::new(None),
                generation: AtomicU64::new(0),
                iterations: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                phase,
            }),
        }
    }

    /// Start a session and schedule its first iteration immediately.
    ///
    /// Fails without touching the running session when one of either
    /// variant is active. Must be called from within a tokio runtime.
    pub fn start(
        &self,
        variant: BrowseVariant,
        duration: Duration,
    ) -> Result<SessionStarted, SessionError> {
        let mut slot = self.inner.slot.lock();
        if let Some(active) = slot.as_ref() {
            debug!(running = %active.variant, requested = %variant, "session already running");
            return Err(SessionError::AlreadyRunning {
                running: active.variant,
            });
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let started_at = self.inner.clock.now();
        let cancel = CancellationToken::new();
        *slot = Some(ActiveSession {
            generation,
            variant,
            started_at,
            started_wall: Utc::now(),
            duration,
            cancel: cancel.clone(),
        });
        self.inner.iterations.store(0, Ordering::Relaxed);
        self.inner.failures.store(0, Ordering::Relaxed);
        self.inner
            .phase
            .send_replace(SessionPhase::Running { variant });
        drop(slot);

        info!(
            %variant,
            generation,
            duration_secs = duration.as_secs(),
            "browse session started"
        );
        tokio::spawn(run_session(
            Arc::clone(&self.inner),
            generation,
            variant,
            started_at,
            duration,
            cancel,
        ));

        Ok(SessionStarted {
            variant,
            duration,
            generation,
        })
    }

    /// Cancel the running session. Returns whether one was running; an
    /// adapter call already in flight is allowed to finish.
    pub fn stop(&self) -> bool {
        let taken = self.inner.slot.lock().take();
        match taken {
            Some(active) => {
                active.cancel.cancel();
                self.inner.phase.send_replace(SessionPhase::Idle);
                info!(variant = %active.variant, generation = active.generation, "browse session stopped");
                true
            }
            None => {
                debug!("stop requested with no running session");
                false
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.slot.lock().is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        *self.inner.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.inner.phase.subscribe()
    }

    /// Resolve once no session is running.
    pub async fn wait_idle(&self) {
        let mut phase = self.subscribe();
        let _ = phase.wait_for(|phase| *phase == SessionPhase::Idle).await;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let slot = self.inner.slot.lock();
        let now = self.inner.clock.now();
        let iterations = self.inner.iterations.load(Ordering::Relaxed);
        let failures = self.inner.failures.load(Ordering::Relaxed);
        match slot.as_ref() {
            Some(active) => SessionSnapshot {
                running: true,
                variant: Some(active.variant),
                started_at: Some(active.started_wall),
                duration: Some(active.duration),
                elapsed: Some(now.saturating_duration_since(active.started_at)),
                iterations,
                failures,
            },
            None => SessionSnapshot {
                running: false,
                variant: None,
                started_at: None,
                duration: None,
                elapsed: None,
                iterations,
                failures,
            },
        }
    }
}

impl Drop for SessionLoop {
    fn drop(&mut self) {
        if let Some(active) = self.inner.slot.lock().take() {
            active.cancel.cancel();
        }
    }
}

/// Frees the slot if the session task ends without reaching `finish`,
/// such as when an adapter call panics.
struct SlotRelease {
    inner: Arc<LoopInner>,
    generation: u64,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        if self.inner.finish(self.generation) {
            warn!(generation = self.generation, "browse session ended abnormally");
        }
    }
}

async fn run_session(
    inner: Arc<LoopInner>,
    generation: u64,
    variant: BrowseVariant,
    started_at: Instant,
    duration: Duration,
    cancel: CancellationToken,
) {
    let _release = SlotRelease {
        inner: Arc::clone(&inner),
        generation,
    };
    let browser = Browser {
        adapter: inner.adapter.as_ref(),
        clock: inner.clock.as_ref(),
        tempo: &inner.tempo,
        cancel: &cancel,
    };

    loop {
        if cancel.is_cancelled() {
            debug!(generation, "session cancelled");
            return;
        }
        let elapsed = inner.clock.now().saturating_duration_since(started_at);
        if elapsed >= duration {
            if inner.finish(generation) {
                info!(%variant, generation, "browse session completed");
            }
            return;
        }

        let iteration = inner.iterations.fetch_add(1, Ordering::Relaxed) + 1;
        let pause = match browser.iteration(variant).await {
            Ok(()) => inner.tempo.iteration_pause(),
            Err(err) => {
                inner.failures.fetch_add(1, Ordering::Relaxed);
                warn!(%variant, iteration, error = %err, "browse iteration failed");
                inner.tempo.error_pause()
            }
        };
        debug!(iteration, pause_ms = pause.as_millis() as u64, "next iteration scheduled");
        if !browser.pause(pause).await {
            debug!(generation, "session cancelled");
            return;
        }
    }
}
