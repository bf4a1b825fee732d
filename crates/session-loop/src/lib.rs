//! Autonomous browse session loop.
//!
//! A session repeatedly picks a weighted random action (open a post and
//! linger on it, or scroll the listing), paces itself with randomized
//! delays, and ends when its duration elapses or it is stopped. One slot is
//! shared by both variants.

mod browse;
pub mod errors;
mod session;
pub mod tempo;

pub use errors::SessionError;
pub use session::{SessionLoop, SessionPhase, SessionSnapshot, SessionStarted};
pub use tempo::{BrowseAction, BrowseTempo};

use std::fmt;

use page_adapter::FeedKind;
use serde::{Deserialize, Serialize};

/// Bottom-of-content tolerance used by the linger scroll.
pub const BOTTOM_TOLERANCE_PX: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowseVariant {
    /// General browsing of the current listing
    AutoBrowse,
    /// Browsing of the signed-in home feed
    HomeFeed,
}

impl BrowseVariant {
    /// Probability of visiting a post instead of scrolling the listing.
    pub const fn post_weight(self) -> f64 {
        match self {
            BrowseVariant::AutoBrowse => 0.7,
            BrowseVariant::HomeFeed => 0.8,
        }
    }

    pub const fn feed(self) -> FeedKind {
        match self {
            BrowseVariant::AutoBrowse => FeedKind::Listing,
            BrowseVariant::HomeFeed => FeedKind::HomeFeed,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            BrowseVariant::AutoBrowse => "Auto browse",
            BrowseVariant::HomeFeed => "Home feed browse",
        }
    }
}

impl fmt::Display for BrowseVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
