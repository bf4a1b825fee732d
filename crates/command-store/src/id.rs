use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use relay_core_types::CommandId;

/// Clock-derived command ids, bumped past the previous id when two enqueues
/// share a millisecond so every id stays unique and increasing.
#[derive(Debug, Default)]
pub struct CommandIdGenerator {
    last: AtomicU64,
}

impl CommandIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> CommandId {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(previous + 1);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return CommandId(candidate.to_string()),
                Err(actual) => previous = actual,
            }
        }
    }
}
