use std::sync::Arc;
use std::time::Duration;

use browse_session::{BrowseVariant, SessionLoop};
use page_adapter::{
    scroll_page_down, scroll_page_to_top, scroll_page_up, AdapterError, Credentials, PageAdapter,
};
use relay_core_types::{Command, CommandKind, ResultReport};
use serde_json::json;
use tracing::{debug, info};

/// Session length used when a loop-control command carries no duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseDurations {
    pub auto_browse: Duration,
    pub home_feed: Duration,
}

impl Default for BrowseDurations {
    fn default() -> Self {
        Self {
            auto_browse: Duration::from_secs(5 * 60),
            home_feed: Duration::from_secs(10 * 60),
        }
    }
}

impl BrowseDurations {
    fn for_variant(&self, variant: BrowseVariant) -> Duration {
        match variant {
            BrowseVariant::AutoBrowse => self.auto_browse,
            BrowseVariant::HomeFeed => self.home_feed,
        }
    }
}

/// Turns one command into exactly one result. Never fails: adapter and
/// session errors become `success: false` reports.
pub struct CommandExecutor {
    adapter: Arc<dyn PageAdapter>,
    session: Arc<SessionLoop>,
    durations: BrowseDurations,
}

impl CommandExecutor {
    pub fn new(
        adapter: Arc<dyn PageAdapter>,
        session: Arc<SessionLoop>,
        durations: BrowseDurations,
    ) -> Self {
        Self {
            adapter,
            session,
            durations,
        }
    }

    pub fn session(&self) -> &Arc<SessionLoop> {
        &self.session
    }

    pub async fn execute(&self, command: &Command) -> ResultReport {
        let kind = match command.kind.parse::<CommandKind>() {
            Ok(kind) => kind,
            Err(message) => {
                debug!(command_id = %command.id, kind = %command.kind, "unrecognized command");
                return ResultReport::failed(message);
            }
        };
        info!(
            command_id = %command.id,
            %kind,
            loop_control = kind.is_loop_control(),
            "executing command"
        );

        self.dispatch(kind, command)
            .await
            .unwrap_or_else(|err| ResultReport::failed(format!("Error: {err}")))
    }

    async fn dispatch(
        &self,
        kind: CommandKind,
        command: &Command,
    ) -> Result<ResultReport, AdapterError> {
        let adapter = self.adapter.as_ref();
        let report = match kind {
            CommandKind::Search => match command.param_str("query") {
                Some(query) => {
                    adapter.search(query).await?;
                    ResultReport::ok(format!("Search performed for: {query}"))
                }
                None => ResultReport::failed("Query parameter required for search"),
            },
            CommandKind::Login => {
                match (command.param_str("email"), command.param_str("password")) {
                    (Some(email), Some(password)) => {
                        let credentials = Credentials {
                            email: email.to_string(),
                            password: password.to_string(),
                        };
                        if adapter.login(&credentials).await? {
                            ResultReport::ok("Login attempted")
                        } else {
                            ResultReport::failed("Login failed")
                        }
                    }
                    _ => ResultReport::failed("Email and password required for login"),
                }
            }
            CommandKind::Logout => {
                if adapter.logout().await? {
                    ResultReport::ok("Logout performed")
                } else {
                    ResultReport::failed("Logout failed")
                }
            }
            CommandKind::CheckAuth => {
                let username = adapter.check_auth().await?;
                let message = match &username {
                    Some(name) => format!("Authenticated as: {name}"),
                    None => "Not authenticated".to_string(),
                };
                ResultReport::ok(message).with_data(json!({
                    "authenticated": username.is_some(),
                    "username": username,
                }))
            }
            CommandKind::ScrollDown => {
                scroll_page_down(adapter).await?;
                ResultReport::ok("Scrolled down")
            }
            CommandKind::ScrollUp => {
                scroll_page_up(adapter).await?;
                ResultReport::ok("Scrolled up")
            }
            CommandKind::ScrollToTop => {
                scroll_page_to_top(adapter).await?;
                ResultReport::ok("Scrolled to top")
            }
            CommandKind::GoHome => {
                adapter.go_home().await?;
                ResultReport::ok("Navigated to home")
            }
            CommandKind::Refresh => {
                adapter.refresh().await?;
                ResultReport::ok("Page refreshed")
            }
            CommandKind::StartAutoBrowse => self.start_session(BrowseVariant::AutoBrowse, command),
            CommandKind::BrowseHomeFeed => self.start_session(BrowseVariant::HomeFeed, command),
            CommandKind::StopAutoBrowse => {
                self.session.stop();
                ResultReport::ok("Auto browse stopped")
            }
        };
        Ok(report)
    }

    fn start_session(&self, variant: BrowseVariant, command: &Command) -> ResultReport {
        let duration = command
            .param_f64("duration")
            .filter(|minutes| minutes.is_finite() && *minutes > 0.0)
            .and_then(|minutes| Duration::try_from_secs_f64(minutes * 60.0).ok())
            .unwrap_or_else(|| self.durations.for_variant(variant));

        match self.session.start(variant, duration) {
            Ok(started) => ResultReport::ok(format!(
                "{} started for {} minutes",
                variant,
                minutes_label(started.duration)
            )),
            Err(err) => ResultReport::failed(format!(
                "Failed to start {}: {err}",
                variant.label().to_lowercase()
            )),
        }
    }
}

fn minutes_label(duration: Duration) -> String {
    let minutes = duration.as_secs_f64() / 60.0;
    if minutes.fract() == 0.0 {
        format!("{}", minutes as u64)
    } else {
        format!("{:.1}", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browse_session::BrowseTempo;
    use page_adapter::{OpKind, SimulatedPage};
    use relay_core_types::CommandId;
    use relay_scheduler::{Clock, TokioClock};
    use serde_json::{json, Value};

    struct Harness {
        page: Arc<SimulatedPage>,
        executor: CommandExecutor,
    }

    fn harness() -> Harness {
        let page = Arc::new(SimulatedPage::default());
        let adapter: Arc<dyn PageAdapter> = page.clone();
        let clock: Arc<dyn Clock> = Arc::new(TokioClock);
        let session = Arc::new(SessionLoop::new(
            Arc::clone(&adapter),
            clock,
            BrowseTempo::seeded(17),
        ));
        Harness {
            page,
            executor: CommandExecutor::new(adapter, session, BrowseDurations::default()),
        }
    }

    fn command(kind: &str, payload: Value) -> Command {
        Command::new(CommandId::from("cmd-1"), kind, payload)
    }

    #[tokio::test]
    async fn search_requires_query() {
        let harness = harness();
        let report = harness.executor.execute(&command("search", json!({}))).await;
        assert!(!report.success);
        assert_eq!(report.message, "Query parameter required for search");
        assert_eq!(harness.page.count(OpKind::Search), 0);

        let report = harness
            .executor
            .execute(&command("search", json!({"query": "cats"})))
            .await;
        assert!(report.success);
        assert_eq!(report.message, "Search performed for: cats");
        assert!(harness.page.current_url().ends_with("/search/?q=cats"));
    }

    #[tokio::test]
    async fn login_logout_and_auth_check() {
        let harness = harness();
        let report = harness
            .executor
            .execute(&command("login", json!({"email": "user@example.com"})))
            .await;
        assert_eq!(report.message, "Email and password required for login");

        let report = harness
            .executor
            .execute(&command(
                "login",
                json!({"email": "user@example.com", "password": "secret"}),
            ))
            .await;
        assert!(report.success);

        let report = harness.executor.execute(&command("checkAuth", json!({}))).await;
        assert_eq!(report.message, "Authenticated as: user@example.com");
        let data = report.data.unwrap();
        assert_eq!(data["authenticated"], true);
        assert_eq!(data["username"], "user@example.com");

        assert!(harness.executor.execute(&command("logout", json!({}))).await.success);
        let report = harness.executor.execute(&command("logout", json!({}))).await;
        assert!(!report.success);
        assert_eq!(report.message, "Logout failed");

        let report = harness.executor.execute(&command("checkAuth", json!({}))).await;
        assert!(report.success);
        assert_eq!(report.message, "Not authenticated");
        assert_eq!(report.data.unwrap()["username"], Value::Null);
    }

    #[tokio::test]
    async fn page_actions_report_success() {
        let harness = harness();
        for (kind, message) in [
            ("scrollDown", "Scrolled down"),
            ("scrollUp", "Scrolled up"),
            ("scrollToTop", "Scrolled to top"),
            ("goHome", "Navigated to home"),
            ("refresh", "Page refreshed"),
        ] {
            let report = harness.executor.execute(&command(kind, json!({}))).await;
            assert!(report.success, "{kind}");
            assert_eq!(report.message, message);
        }
        assert_eq!(harness.page.count(OpKind::GoHome), 1);
    }

    #[tokio::test]
    async fn unknown_kind_fails() {
        let harness = harness();
        let report = harness.executor.execute(&command("teleport", json!({}))).await;
        assert!(!report.success);
        assert_eq!(report.message, "unknown command: teleport");
    }

    #[tokio::test]
    async fn adapter_errors_become_failed_results() {
        let harness = harness();
        harness.page.fail_next(
            OpKind::Refresh,
            AdapterError::Unavailable("tab closed".to_string()),
        );
        let report = harness.executor.execute(&command("refresh", json!({}))).await;
        assert!(!report.success);
        assert_eq!(report.message, "Error: Page unavailable: tab closed");
    }

    #[tokio::test]
    async fn browse_control_shares_one_session() {
        let harness = harness();
        let report = harness
            .executor
            .execute(&command("startAutoBrowse", json!({})))
            .await;
        assert!(report.success);
        assert_eq!(report.message, "Auto browse started for 5 minutes");
        assert!(harness.executor.session().is_running());

        let report = harness
            .executor
            .execute(&command("browseHomeFeed", json!({"duration": 3})))
            .await;
        assert!(!report.success);
        assert_eq!(
            report.message,
            "Failed to start home feed browse: Auto browse already running"
        );
        assert_eq!(
            harness.executor.session().snapshot().duration,
            Some(Duration::from_secs(300))
        );

        for _ in 0..2 {
            let report = harness
                .executor
                .execute(&command("stopAutoBrowse", json!({})))
                .await;
            assert!(report.success);
            assert_eq!(report.message, "Auto browse stopped");
        }
        assert!(!harness.executor.session().is_running());

        let report = harness
            .executor
            .execute(&command("browseHomeFeed", json!({"duration": "2"})))
            .await;
        assert_eq!(report.message, "Home feed browse started for 2 minutes");
        harness.executor.session().stop();
    }

    #[tokio::test]
    async fn out_of_range_duration_uses_default() {
        let harness = harness();
        let report = harness
            .executor
            .execute(&command("startAutoBrowse", json!({"duration": 1e300})))
            .await;
        assert!(report.success);
        assert_eq!(report.message, "Auto browse started for 5 minutes");
        harness.executor.session().stop();
    }

    #[tokio::test]
    async fn home_feed_defaults_to_ten_minutes() {
        let harness = harness();
        let report = harness
            .executor
            .execute(&command("browseHomeFeed", json!({"duration": 0})))
            .await;
        assert_eq!(report.message, "Home feed browse started for 10 minutes");
        harness.executor.session().stop();
    }
}
