//! Randomized pacing and decision policy for browse sessions.

use std::ops::RangeInclusive;
use std::time::Duration;

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::BrowseVariant;

pub const LINGER_MS: RangeInclusive<u64> = 20_000..=72_000;
pub const LINGER_STEP_MS: RangeInclusive<u64> = 600..=1_200;
pub const POST_LOAD_MS: RangeInclusive<u64> = 1_000..=2_000;
pub const BACK_SETTLE_MS: RangeInclusive<u64> = 800..=1_500;
pub const LISTING_STEP_MS: RangeInclusive<u64> = 800..=1_500;
pub const ITERATION_PAUSE_MS: RangeInclusive<u64> = 1_000..=3_000;
pub const ERROR_PAUSE_MS: RangeInclusive<u64> = 2_000..=5_000;

pub const LISTING_STEPS: RangeInclusive<usize> = 2..=4;
pub const LISTING_SCROLL_FRACTION: f64 = 0.6;

/// Linger scroll amount, in percent of the viewport.
pub const LINGER_STEP_PERCENT: RangeInclusive<u32> = 40..=100;
pub const FORWARD_PROBABILITY: f64 = 0.85;
/// Back-scrolls move this share of the drawn amount.
pub const BACK_SCROLL_FACTOR: f64 = 0.3;
/// Rewinds land in `[0, REWIND_CEILING * extent)`.
pub const REWIND_CEILING: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseAction {
    VisitPost,
    ScrollListing,
}

/// Seedable random source behind every browse decision.
pub struct BrowseTempo {
    rng: Mutex<StdRng>,
}

impl BrowseTempo {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn pick_action(&self, variant: BrowseVariant) -> BrowseAction {
        if self.rng.lock().gen::<f64>() < variant.post_weight() {
            BrowseAction::VisitPost
        } else {
            BrowseAction::ScrollListing
        }
    }

    /// Uniform index into a non-empty collection.
    pub fn pick_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.rng.lock().gen_range(0..len))
    }

    pub fn linger(&self) -> Duration {
        self.millis(LINGER_MS)
    }

    pub fn linger_step(&self) -> Duration {
        self.millis(LINGER_STEP_MS)
    }

    pub fn post_load(&self) -> Duration {
        self.millis(POST_LOAD_MS)
    }

    pub fn back_settle(&self) -> Duration {
        self.millis(BACK_SETTLE_MS)
    }

    pub fn listing_step(&self) -> Duration {
        self.millis(LISTING_STEP_MS)
    }

    pub fn iteration_pause(&self) -> Duration {
        self.millis(ITERATION_PAUSE_MS)
    }

    pub fn error_pause(&self) -> Duration {
        self.millis(ERROR_PAUSE_MS)
    }

    pub fn listing_steps(&self) -> usize {
        self.rng.lock().gen_range(LISTING_STEPS)
    }

    /// Signed linger scroll for a viewport: mostly forward, sometimes a
    /// short step back.
    pub fn scroll_step(&self, viewport_height: f64) -> f64 {
        let mut rng = self.rng.lock();
        let percent = rng.gen_range(LINGER_STEP_PERCENT);
        let amount = viewport_height * f64::from(percent) / 100.0;
        if rng.gen_bool(FORWARD_PROBABILITY) {
            amount
        } else {
            -amount * BACK_SCROLL_FACTOR
        }
    }

    pub fn rewind_target(&self, scroll_height: f64) -> f64 {
        let draw = self.rng.lock().gen::<f64>();
        (draw * scroll_height * REWIND_CEILING).floor()
    }

    fn millis(&self, range: RangeInclusive<u64>) -> Duration {
        Duration::from_millis(self.rng.lock().gen_range(range))
    }
}

impl Default for BrowseTempo {
    fn default() -> Self {
        Self::from_entropy()
    }
}
