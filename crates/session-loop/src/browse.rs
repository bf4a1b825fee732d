use std::time::Duration;

use page_adapter::{AdapterResult, FeedKind, PageAdapter};
use relay_scheduler::Clock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::tempo::{BrowseAction, BrowseTempo, LISTING_SCROLL_FRACTION};
use crate::{BrowseVariant, BOTTOM_TOLERANCE_PX};

/// Browse actions of one session, bound to its cancellation token.
pub(crate) struct Browser<'a> {
    pub adapter: &'a dyn PageAdapter,
    pub clock: &'a dyn Clock,
    pub tempo: &'a BrowseTempo,
    pub cancel: &'a CancellationToken,
}

impl Browser<'_> {
    /// One loop iteration: the weighted action followed by a listing scroll.
    pub async fn iteration(&self, variant: BrowseVariant) -> AdapterResult<()> {
        match self.tempo.pick_action(variant) {
            BrowseAction::VisitPost => self.visit_post(variant.feed()).await?,
            BrowseAction::ScrollListing => self.scroll_listing().await?,
        }
        if self.cancel.is_cancelled() {
            return Ok(());
        }
        self.scroll_listing().await
    }

    pub async fn visit_post(&self, feed: FeedKind) -> AdapterResult<()> {
        let links = self.adapter.find_post_links(feed).await?;
        let Some(index) = self.tempo.pick_index(links.len()) else {
            debug!(?feed, "no post links found");
            return Ok(());
        };
        let link = &links[index];
        info!(post = link.label(), "opening post");
        self.adapter.open_post(link).await?;

        let lingered = if self.pause(self.tempo.post_load()).await {
            let span = self.tempo.linger();
            debug!(linger_ms = span.as_millis() as u64, "lingering on post");
            self.linger(span).await.map(|_| ())
        } else {
            Ok(())
        };

        // Leave the post even when lingering failed.
        let returned = self.adapter.go_back().await;
        lingered?;
        returned?;
        self.pause(self.tempo.back_settle()).await;
        Ok(())
    }

    /// Continuous scroll for `span`. At the bottom of content that stopped
    /// growing, jumps back to a random earlier position instead. Returns the
    /// number of scroll steps taken.
    pub async fn linger(&self, span: Duration) -> AdapterResult<usize> {
        let deadline = self.clock.now() + span;
        let mut last_extent: Option<f64> = None;
        let mut steps = 0;
        while self.clock.now() < deadline {
            let metrics = self.adapter.metrics().await?;
            let stalled = last_extent == Some(metrics.scroll_height);
            if stalled && metrics.at_bottom(BOTTOM_TOLERANCE_PX) {
                let target = self.tempo.rewind_target(metrics.scroll_height);
                debug!(target, "end of content, rewinding");
                self.adapter.scroll_to(target).await?;
            } else {
                let delta = self.tempo.scroll_step(metrics.viewport_height);
                self.adapter.scroll_by(delta).await?;
            }
            last_extent = Some(metrics.scroll_height);
            steps += 1;
            if !self.pause(self.tempo.linger_step()).await {
                break;
            }
        }
        Ok(steps)
    }

    pub async fn scroll_listing(&self) -> AdapterResult<()> {
        let steps = self.tempo.listing_steps();
        for step in 1..=steps {
            let metrics = self.adapter.metrics().await?;
            self.adapter
                .scroll_by(metrics.viewport_height * LISTING_SCROLL_FRACTION)
                .await?;
            if step < steps && !self.pause(self.tempo.listing_step()).await {
                break;
            }
        }
        Ok(())
    }

    /// Sleep unless the session is cancelled first; false when cancelled.
    pub async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = self.clock.sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_adapter::{
        AdapterError, OpKind, PageOp, PostLink, SimulatedPage, SimulatedPageConfig,
    };
    use relay_scheduler::ManualClock;

    struct Fixture {
        page: SimulatedPage,
        clock: ManualClock,
        tempo: BrowseTempo,
        cancel: CancellationToken,
    }

    impl Fixture {
        fn new(config: SimulatedPageConfig) -> Self {
            Self {
                page: SimulatedPage::new(config),
                clock: ManualClock::new(),
                tempo: BrowseTempo::seeded(9),
                cancel: CancellationToken::new(),
            }
        }

        fn browser(&self) -> Browser<'_> {
            Browser {
                adapter: &self.page,
                clock: &self.clock,
                tempo: &self.tempo,
                cancel: &self.cancel,
            }
        }
    }

    #[tokio::test]
    async fn linger_rewinds_once_content_stops_growing() {
        let fixture = Fixture::new(SimulatedPageConfig {
            listing_height: 2_000.0,
            max_height: 3_000.0,
            ..SimulatedPageConfig::default()
        });
        let steps = fixture
            .browser()
            .linger(Duration::from_secs(60))
            .await
            .unwrap();

        assert!(steps >= 50);
        let rewinds: Vec<f64> = fixture
            .page
            .journal()
            .into_iter()
            .filter_map(|op| match op {
                PageOp::ScrollTo(top) => Some(top),
                _ => None,
            })
            .collect();
        assert!(!rewinds.is_empty());
        assert!(rewinds.iter().all(|top| (0.0..2_100.0).contains(top)));
        assert!(fixture.clock.elapsed() >= Duration::from_secs(60));
        assert!(fixture
            .clock
            .sleeps()
            .iter()
            .all(|sleep| (600..=1_200).contains(&(sleep.as_millis() as u64))));
    }

    #[tokio::test]
    async fn linger_stops_after_cancel() {
        let fixture = Fixture::new(SimulatedPageConfig::default());
        fixture.cancel.cancel();
        let steps = fixture
            .browser()
            .linger(Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(steps, 1);
        assert_eq!(fixture.clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn listing_scroll_moves_sixty_percent_of_viewport() {
        let fixture = Fixture::new(SimulatedPageConfig::default());
        fixture.browser().scroll_listing().await.unwrap();

        let scrolls: Vec<f64> = fixture
            .page
            .journal()
            .into_iter()
            .filter_map(|op| match op {
                PageOp::ScrollBy(delta) => Some(delta),
                _ => None,
            })
            .collect();
        assert!((2..=4).contains(&scrolls.len()));
        assert!(scrolls.iter().all(|delta| (delta - 480.0).abs() < 1e-9));
        assert_eq!(fixture.clock.sleeps().len(), scrolls.len() - 1);
    }

    #[tokio::test]
    async fn visit_post_opens_lingers_and_returns() {
        let fixture = Fixture::new(SimulatedPageConfig::default());
        let listing_url = fixture.page.current_url();
        fixture
            .browser()
            .visit_post(FeedKind::Listing)
            .await
            .unwrap();

        assert_eq!(fixture.page.count(OpKind::OpenPost), 1);
        assert_eq!(fixture.page.count(OpKind::GoBack), 1);
        assert_eq!(fixture.page.current_url(), listing_url);
        assert!(fixture.clock.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test]
    async fn visit_post_returns_to_listing_after_linger_failure() {
        let fixture = Fixture::new(SimulatedPageConfig::default());
        let listing_url = fixture.page.current_url();
        fixture.page.fail_next(
            OpKind::Metrics,
            AdapterError::Script("metrics unavailable".to_string()),
        );

        let result = fixture.browser().visit_post(FeedKind::Listing).await;
        assert_eq!(
            result,
            Err(AdapterError::Script("metrics unavailable".to_string()))
        );
        assert_eq!(fixture.page.count(OpKind::GoBack), 1);
        assert_eq!(fixture.page.current_url(), listing_url);
    }

    #[tokio::test]
    async fn visit_post_without_links_does_nothing() {
        let fixture = Fixture::new(SimulatedPageConfig::default());
        fixture.page.set_links(FeedKind::HomeFeed, Vec::<PostLink>::new());
        fixture
            .browser()
            .visit_post(FeedKind::HomeFeed)
            .await
            .unwrap();
        assert_eq!(fixture.page.count(OpKind::OpenPost), 0);
        assert_eq!(fixture.page.journal().len(), 1);
    }
}
