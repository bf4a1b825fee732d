use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::errors::{AdapterError, AdapterResult};
use crate::{Credentials, FeedKind, PageAdapter, PostLink, ScrollMetrics};

const BOTTOM_TOLERANCE_PX: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct SimulatedPageConfig {
    pub home_url: String,
    pub viewport_height: f64,
    pub listing_height: f64,
    pub post_height: f64,
    /// Extent appended whenever a scroll reaches the bottom (lazy loading).
    pub growth_step: f64,
    /// Extent after which no more content loads.
    pub max_height: f64,
    pub listing_links: usize,
    pub feed_links: usize,
    /// Artificial delay applied to every interaction.
    pub latency: Duration,
    /// Most recent interactions kept in the journal.
    pub journal_capacity: usize,
    /// Pages remembered for `go_back`.
    pub back_depth: usize,
}

impl Default for SimulatedPageConfig {
    fn default() -> Self {
        Self {
            home_url: "https://feed.example.com".to_string(),
            viewport_height: 800.0,
            listing_height: 4_000.0,
            post_height: 3_000.0,
            growth_step: 1_200.0,
            max_height: 12_000.0,
            listing_links: 10,
            feed_links: 10,
            latency: Duration::ZERO,
            journal_capacity: 1_024,
            back_depth: 32,
        }
    }
}

/// Interaction kinds, used for failure injection and journal queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Search,
    Login,
    Logout,
    CheckAuth,
    ScrollBy,
    ScrollTo,
    Metrics,
    GoHome,
    Refresh,
    GoBack,
    FindPostLinks,
    OpenPost,
}

/// Journal entry for one interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOp {
    Search(String),
    Login(String),
    Logout,
    CheckAuth,
    ScrollBy(f64),
    ScrollTo(f64),
    Metrics,
    GoHome,
    Refresh,
    GoBack,
    FindPostLinks(FeedKind),
    OpenPost(String),
}

impl PageOp {
    pub fn kind(&self) -> OpKind {
        match self {
            PageOp::Search(_) => OpKind::Search,
            PageOp::Login(_) => OpKind::Login,
            PageOp::Logout => OpKind::Logout,
            PageOp::CheckAuth => OpKind::CheckAuth,
            PageOp::ScrollBy(_) => OpKind::ScrollBy,
            PageOp::ScrollTo(_) => OpKind::ScrollTo,
            PageOp::Metrics => OpKind::Metrics,
            PageOp::GoHome => OpKind::GoHome,
            PageOp::Refresh => OpKind::Refresh,
            PageOp::GoBack => OpKind::GoBack,
            PageOp::FindPostLinks(_) => OpKind::FindPostLinks,
            PageOp::OpenPost(_) => OpKind::OpenPost,
        }
    }
}

#[derive(Debug)]
enum Injected {
    Error(AdapterError),
    Panic,
}

#[derive(Debug, Clone)]
struct Location {
    url: String,
    scroll_top: f64,
    scroll_height: f64,
}

#[derive(Debug)]
struct PageState {
    location: Location,
    back_stack: VecDeque<Location>,
    user: Option<String>,
    listing_links: Vec<PostLink>,
    feed_links: Vec<PostLink>,
    journal: VecDeque<PageOp>,
    failures: HashMap<OpKind, VecDeque<Injected>>,
}

/// In-memory stand-in for the hosted document.
///
/// Models scroll geometry with lazy-loaded growth, a navigation stack, a
/// signed-in user and two link feeds. Recent calls are journaled, and
/// failures (or panics) can be queued per interaction kind.
pub struct SimulatedPage {
    config: SimulatedPageConfig,
    state: Mutex<PageState>,
}

impl SimulatedPage {
    pub fn new(config: SimulatedPageConfig) -> Self {
        let listing_links = (0..config.listing_links)
            .map(|index| {
                PostLink::new(format!(
                    "{}/r/rust/comments/l{index}/listing_post_{index}/",
                    config.home_url
                ))
                .with_title(format!("Listing post {index}"))
            })
            .collect();
        let feed_links = (0..config.feed_links)
            .map(|index| {
                PostLink::new(format!(
                    "{}/r/popular/comments/f{index}/feed_post_{index}/",
                    config.home_url
                ))
                .with_title(format!("Feed post {index}"))
            })
            .collect();
        let location = Location {
            url: config.home_url.clone(),
            scroll_top: 0.0,
            scroll_height: config.listing_height,
        };
        Self {
            state: Mutex::new(PageState {
                location,
                back_stack: VecDeque::new(),
                user: None,
                listing_links,
                feed_links,
                journal: VecDeque::new(),
                failures: HashMap::new(),
            }),
            config,
        }
    }

    /// Make the next `kind` interaction fail with `error`.
    pub fn fail_next(&self, kind: OpKind, error: AdapterError) {
        self.inject(kind, Injected::Error(error));
    }

    /// Make the next `kind` interaction panic, as a broken host adapter would.
    pub fn panic_next(&self, kind: OpKind) {
        self.inject(kind, Injected::Panic);
    }

    fn inject(&self, kind: OpKind, injected: Injected) {
        self.state
            .lock()
            .failures
            .entry(kind)
            .or_default()
            .push_back(injected);
    }

    pub fn set_links(&self, feed: FeedKind, links: Vec<PostLink>) {
        let mut state = self.state.lock();
        match feed {
            FeedKind::Listing => state.listing_links = links,
            FeedKind::HomeFeed => state.feed_links = links,
        }
    }

    pub fn journal(&self) -> Vec<PageOp> {
        self.state.lock().journal.iter().cloned().collect()
    }

    pub fn count(&self, kind: OpKind) -> usize {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|op| op.kind() == kind)
            .count()
    }

    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    pub fn current_url(&self) -> String {
        self.state.lock().location.url.clone()
    }

    pub fn signed_in_user(&self) -> Option<String> {
        self.state.lock().user.clone()
    }

    async fn enter(&self, op: PageOp) -> AdapterResult<()> {
        let failure = {
            let mut state = self.state.lock();
            let kind = op.kind();
            debug!(?op, "simulated page interaction");
            if state.journal.len() >= self.config.journal_capacity.max(1) {
                state.journal.pop_front();
            }
            state.journal.push_back(op);
            state
                .failures
                .get_mut(&kind)
                .and_then(VecDeque::pop_front)
                .map(|injected| (kind, injected))
        };
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        match failure {
            Some((_, Injected::Error(err))) => Err(err),
            Some((kind, Injected::Panic)) => panic!("simulated {kind:?} crash"),
            None => Ok(()),
        }
    }

    fn navigate(&self, url: String, scroll_height: f64) {
        let mut state = self.state.lock();
        let previous = std::mem::replace(
            &mut state.location,
            Location {
                url,
                scroll_top: 0.0,
                scroll_height,
            },
        );
        if state.back_stack.len() >= self.config.back_depth.max(1) {
            state.back_stack.pop_front();
        }
        state.back_stack.push_back(previous);
    }

    fn apply_scroll(&self, target_top: f64) {
        let mut state = self.state.lock();
        let location = &mut state.location;
        let max_top = (location.scroll_height - self.config.viewport_height).max(0.0);
        location.scroll_top = target_top.clamp(0.0, max_top);
        let reached_bottom = location.scroll_top + self.config.viewport_height
            >= location.scroll_height - BOTTOM_TOLERANCE_PX;
        if reached_bottom && location.scroll_height < self.config.max_height {
            location.scroll_height =
                (location.scroll_height + self.config.growth_step).min(self.config.max_height);
        }
    }
}

impl Default for SimulatedPage {
    fn default() -> Self {
        Self::new(SimulatedPageConfig::default())
    }
}

#[async_trait]
impl PageAdapter for SimulatedPage {
    async fn search(&self, query: &str) -> AdapterResult<()> {
        self.enter(PageOp::Search(query.to_string())).await?;
        let query = query.trim();
        if query.is_empty() {
            return Err(AdapterError::NotFound("search query is empty".to_string()));
        }
        let url = format!(
            "{}/search/?q={}",
            self.config.home_url,
            query.split_whitespace().collect::<Vec<_>>().join("+")
        );
        self.navigate(url, self.config.listing_height);
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> AdapterResult<bool> {
        self.enter(PageOp::Login(credentials.email.clone())).await?;
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Ok(false);
        }
        self.state.lock().user = Some(credentials.email.trim().to_string());
        Ok(true)
    }

    async fn logout(&self) -> AdapterResult<bool> {
        self.enter(PageOp::Logout).await?;
        Ok(self.state.lock().user.take().is_some())
    }

    async fn check_auth(&self) -> AdapterResult<Option<String>> {
        self.enter(PageOp::CheckAuth).await?;
        Ok(self.state.lock().user.clone())
    }

    async fn scroll_by(&self, delta_px: f64) -> AdapterResult<()> {
        self.enter(PageOp::ScrollBy(delta_px)).await?;
        let current = self.state.lock().location.scroll_top;
        self.apply_scroll(current + delta_px);
        Ok(())
    }

    async fn scroll_to(&self, top_px: f64) -> AdapterResult<()> {
        self.enter(PageOp::ScrollTo(top_px)).await?;
        self.apply_scroll(top_px);
        Ok(())
    }

    async fn metrics(&self) -> AdapterResult<ScrollMetrics> {
        self.enter(PageOp::Metrics).await?;
        let state = self.state.lock();
        Ok(ScrollMetrics {
            scroll_top: state.location.scroll_top,
            viewport_height: self.config.viewport_height,
            scroll_height: state.location.scroll_height,
        })
    }

    async fn go_home(&self) -> AdapterResult<()> {
        self.enter(PageOp::GoHome).await?;
        self.navigate(self.config.home_url.clone(), self.config.listing_height);
        Ok(())
    }

    async fn refresh(&self) -> AdapterResult<()> {
        self.enter(PageOp::Refresh).await?;
        self.state.lock().location.scroll_top = 0.0;
        Ok(())
    }

    async fn go_back(&self) -> AdapterResult<()> {
        self.enter(PageOp::GoBack).await?;
        let mut state = self.state.lock();
        match state.back_stack.pop_back() {
            Some(previous) => {
                state.location = previous;
                Ok(())
            }
            None => Err(AdapterError::Navigation("no previous page".to_string())),
        }
    }

    async fn find_post_links(&self, feed: FeedKind) -> AdapterResult<Vec<PostLink>> {
        self.enter(PageOp::FindPostLinks(feed)).await?;
        let state = self.state.lock();
        Ok(match feed {
            FeedKind::Listing => state.listing_links.clone(),
            FeedKind::HomeFeed => state.feed_links.clone(),
        })
    }

    async fn open_post(&self, link: &PostLink) -> AdapterResult<()> {
        self.enter(PageOp::OpenPost(link.href.clone())).await?;
        self.navigate(link.href.clone(), self.config.post_height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scrolling_to_bottom_loads_more_until_limit() {
        let page = SimulatedPage::new(SimulatedPageConfig {
            listing_height: 2_000.0,
            growth_step: 1_000.0,
            max_height: 3_000.0,
            ..SimulatedPageConfig::default()
        });

        page.scroll_to(10_000.0).await.unwrap();
        let first = page.metrics().await.unwrap();
        assert_eq!(first.scroll_top, 1_200.0);
        assert_eq!(first.scroll_height, 3_000.0);

        page.scroll_to(10_000.0).await.unwrap();
        let second = page.metrics().await.unwrap();
        assert_eq!(second.scroll_top, 2_200.0);
        assert_eq!(second.scroll_height, 3_000.0);
        assert!(second.at_bottom(BOTTOM_TOLERANCE_PX));
    }

    #[tokio::test]
    async fn open_post_and_back_restores_listing_position() {
        let page = SimulatedPage::default();
        page.scroll_by(500.0).await.unwrap();
        let links = page.find_post_links(FeedKind::Listing).await.unwrap();
        page.open_post(&links[3]).await.unwrap();
        assert_eq!(page.current_url(), links[3].href);
        assert_eq!(page.metrics().await.unwrap().scroll_top, 0.0);

        page.go_back().await.unwrap();
        assert_eq!(page.current_url(), "https://feed.example.com");
        assert_eq!(page.metrics().await.unwrap().scroll_top, 500.0);
        assert!(page.go_back().await.is_err());
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let page = SimulatedPage::default();
        page.fail_next(
            OpKind::Search,
            AdapterError::NotFound("search input".to_string()),
        );
        assert!(page.search("cats").await.is_err());
        page.search("cats").await.unwrap();
        assert!(page.current_url().ends_with("/search/?q=cats"));
        assert_eq!(page.count(OpKind::Search), 2);
    }

    #[tokio::test]
    async fn journal_and_back_stack_stay_bounded() {
        let page = SimulatedPage::new(SimulatedPageConfig {
            journal_capacity: 8,
            back_depth: 3,
            ..SimulatedPageConfig::default()
        });
        for index in 0..20 {
            page.search(&format!("query {index}")).await.unwrap();
        }
        let journal = page.journal();
        assert_eq!(journal.len(), 8);
        assert_eq!(journal.last(), Some(&PageOp::Search("query 19".to_string())));

        for _ in 0..3 {
            page.go_back().await.unwrap();
        }
        assert!(page.current_url().ends_with("/search/?q=query+16"));
        assert!(page.go_back().await.is_err());
    }

    #[tokio::test]
    #[should_panic(expected = "simulated GoHome crash")]
    async fn injected_panic_unwinds() {
        let page = SimulatedPage::default();
        page.panic_next(OpKind::GoHome);
        let _ = page.go_home().await;
    }

    #[tokio::test]
    async fn login_logout_cycle() {
        let page = SimulatedPage::default();
        let credentials = Credentials {
            email: "user@example.com".into(),
            password: "pw".into(),
        };
        assert_eq!(page.check_auth().await.unwrap(), None);
        assert!(page.login(&credentials).await.unwrap());
        assert_eq!(
            page.check_auth().await.unwrap().as_deref(),
            Some("user@example.com")
        );
        assert!(page.logout().await.unwrap());
        assert!(!page.logout().await.unwrap());
    }
}
