//! Scheduling primitives shared by the agent's recurring activities.
//!
//! [`Ticker`] drives the fixed-interval poll cycle; [`Clock`] lets the
//! self-pacing session loop run against real or virtual time.

pub mod clock;
pub mod ticker;

pub use clock::{Clock, ManualClock, TokioClock};
pub use ticker::{Ticker, TickerStart};
