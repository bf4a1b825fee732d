//! Page interaction capability for the relay agent
//!
//! The agent never touches the hosted document directly. Every unit of
//! interaction (search, scroll, navigation, authentication, post discovery)
//! goes through [`PageAdapter`], which either succeeds or fails with an
//! [`AdapterError`]. Element-location heuristics live behind the trait.

pub mod errors;
mod simulated;

pub use errors::{AdapterError, AdapterResult};
pub use simulated::{OpKind, PageOp, SimulatedPage, SimulatedPageConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Fraction of the viewport moved by the page-level scroll commands.
pub const PAGE_SCROLL_FRACTION: f64 = 0.8;

/// Scroll geometry of the current document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub viewport_height: f64,
    /// Total scrollable extent of the document.
    pub scroll_height: f64,
}

impl ScrollMetrics {
    /// Bottom is considered reached within `tolerance` pixels of the end.
    pub fn at_bottom(&self, tolerance: f64) -> bool {
        self.scroll_top + self.viewport_height >= self.scroll_height - tolerance
    }
}

/// Which link-discovery heuristic to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Post titles on a listing or search page
    Listing,
    /// Full-post links on the signed-in home feed
    HomeFeed,
}

/// A post link discovered on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLink {
    pub href: String,
    pub title: Option<String>,
}

impl PostLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.href)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One interaction with the hosted document per call.
///
/// Implementations must not block the runtime; each call is a potential
/// long-latency suspension point.
#[async_trait]
pub trait PageAdapter: Send + Sync {
    /// Run a site search for `query`
    async fn search(&self, query: &str) -> AdapterResult<()>;

    /// Attempt to sign in; `Ok(false)` means the page did not accept it
    async fn login(&self, credentials: &Credentials) -> AdapterResult<bool>;

    async fn logout(&self) -> AdapterResult<bool>;

    /// Signed-in username, if any
    async fn check_auth(&self) -> AdapterResult<Option<String>>;

    /// Scroll relative to the current position (negative scrolls up)
    async fn scroll_by(&self, delta_px: f64) -> AdapterResult<()>;

    async fn scroll_to(&self, top_px: f64) -> AdapterResult<()>;

    async fn metrics(&self) -> AdapterResult<ScrollMetrics>;

    async fn go_home(&self) -> AdapterResult<()>;

    async fn refresh(&self) -> AdapterResult<()>;

    async fn go_back(&self) -> AdapterResult<()>;

    /// Post links currently visible on the page
    async fn find_post_links(&self, feed: FeedKind) -> AdapterResult<Vec<PostLink>>;

    async fn open_post(&self, link: &PostLink) -> AdapterResult<()>;
}

/// Scroll down by most of a viewport.
pub async fn scroll_page_down(adapter: &dyn PageAdapter) -> AdapterResult<()> {
    let metrics = adapter.metrics().await?;
    adapter
        .scroll_by(metrics.viewport_height * PAGE_SCROLL_FRACTION)
        .await
}

/// Scroll up by most of a viewport.
pub async fn scroll_page_up(adapter: &dyn PageAdapter) -> AdapterResult<()> {
    let metrics = adapter.metrics().await?;
    adapter
        .scroll_by(-metrics.viewport_height * PAGE_SCROLL_FRACTION)
        .await
}

pub async fn scroll_page_to_top(adapter: &dyn PageAdapter) -> AdapterResult<()> {
    adapter.scroll_to(0.0).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_detection_uses_tolerance() {
        let metrics = ScrollMetrics {
            scroll_top: 1_160.0,
            viewport_height: 800.0,
            scroll_height: 2_000.0,
        };
        assert!(metrics.at_bottom(50.0));
        assert!(!metrics.at_bottom(10.0));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials {
            email: "user@example.com".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("user@example.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn page_scroll_helpers_move_by_viewport_fraction() {
        let page = SimulatedPage::new(SimulatedPageConfig::default());
        scroll_page_down(&page).await.unwrap();
        let after_down = page.metrics().await.unwrap();
        assert_eq!(after_down.scroll_top, after_down.viewport_height * 0.8);

        scroll_page_up(&page).await.unwrap();
        assert_eq!(page.metrics().await.unwrap().scroll_top, 0.0);

        scroll_page_down(&page).await.unwrap();
        scroll_page_to_top(&page).await.unwrap();
        assert_eq!(page.metrics().await.unwrap().scroll_top, 0.0);
    }
}
