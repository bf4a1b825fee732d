use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Value};

/// Command kinds the agent knows how to execute.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CommandKind {
    Search,
    Login,
    Logout,
    CheckAuth,
    StartAutoBrowse,
    BrowseHomeFeed,
    StopAutoBrowse,
    ScrollDown,
    ScrollUp,
    ScrollToTop,
    GoHome,
    Refresh,
}

impl CommandKind {
    pub const ALL: [CommandKind; 12] = [
        CommandKind::Search,
        CommandKind::Login,
        CommandKind::Logout,
        CommandKind::CheckAuth,
        CommandKind::StartAutoBrowse,
        CommandKind::BrowseHomeFeed,
        CommandKind::StopAutoBrowse,
        CommandKind::ScrollDown,
        CommandKind::ScrollUp,
        CommandKind::ScrollToTop,
        CommandKind::GoHome,
        CommandKind::Refresh,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CommandKind::Search => "search",
            CommandKind::Login => "login",
            CommandKind::Logout => "logout",
            CommandKind::CheckAuth => "checkAuth",
            CommandKind::StartAutoBrowse => "startAutoBrowse",
            CommandKind::BrowseHomeFeed => "browseHomeFeed",
            CommandKind::StopAutoBrowse => "stopAutoBrowse",
            CommandKind::ScrollDown => "scrollDown",
            CommandKind::ScrollUp => "scrollUp",
            CommandKind::ScrollToTop => "scrollToTop",
            CommandKind::GoHome => "goHome",
            CommandKind::Refresh => "refresh",
        }
    }

    /// Loop-control kinds are routed to the session loop instead of the page adapter.
    pub const fn is_loop_control(self) -> bool {
        matches!(
            self,
            CommandKind::StartAutoBrowse | CommandKind::BrowseHomeFeed | CommandKind::StopAutoBrowse
        )
    }

    pub fn describe(self) -> CatalogEntry {
        let (description, parameters, example) = match self {
            CommandKind::Search => (
                "Search the site",
                json!({"query": "Search term"}),
                json!({"command": "search", "data": {"query": "javascript"}}),
            ),
            CommandKind::Login => (
                "Log in to the site",
                json!({"email": "Email/username", "password": "Password"}),
                json!({
                    "command": "login",
                    "data": {"email": "user@example.com", "password": "password"}
                }),
            ),
            CommandKind::StartAutoBrowse => (
                "Start auto browsing",
                json!({"duration": "Duration in minutes"}),
                json!({"command": "startAutoBrowse", "data": {"duration": 5}}),
            ),
            CommandKind::BrowseHomeFeed => (
                "Browse the home feed",
                json!({"duration": "Duration in minutes"}),
                json!({"command": "browseHomeFeed", "data": {"duration": 10}}),
            ),
            CommandKind::Logout => simple("Log out of the site", self),
            CommandKind::CheckAuth => simple("Check authentication status", self),
            CommandKind::StopAutoBrowse => simple("Stop auto browsing", self),
            CommandKind::ScrollDown => simple("Scroll down the page", self),
            CommandKind::ScrollUp => simple("Scroll up the page", self),
            CommandKind::ScrollToTop => simple("Scroll to top of page", self),
            CommandKind::GoHome => simple("Go to the site home", self),
            CommandKind::Refresh => simple("Refresh current page", self),
        };
        CatalogEntry {
            description,
            parameters,
            example,
        }
    }
}

fn simple(description: &'static str, kind: CommandKind) -> (&'static str, Value, Value) {
    (description, json!({}), json!({"command": kind.as_str()}))
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        CommandKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == trimmed)
            .ok_or_else(|| format!("unknown command: {}", trimmed))
    }
}

/// One entry of the static command catalog served to controllers.
#[derive(Clone, Debug, Serialize)]
pub struct CatalogEntry {
    pub description: &'static str,
    pub parameters: Value,
    pub example: Value,
}

/// Catalog of every recognized kind keyed by its wire name.
pub fn catalog() -> serde_json::Map<String, Value> {
    CommandKind::ALL
        .into_iter()
        .map(|kind| {
            let entry = serde_json::to_value(kind.describe()).unwrap_or(Value::Null);
            (kind.as_str().to_string(), entry)
        })
        .collect()
}
