//! Interpreter output: a spoken message plus an optional deferred action.

use serde::Serialize;
use tracing::info;

use super::interpreter::Intent;
use crate::{Error, Result};

/// Side effect to perform once the message has been spoken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Action {
    OpenUrl(String),
}

impl Action {
    /// Consumes the action so it cannot run twice.
    pub fn run(self, runner: &dyn ActionRunner) -> Result<()> {
        match self {
            Action::OpenUrl(url) => runner.open_url(&url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResponse {
    /// Always non-empty.
    pub message: String,
    pub action: Option<Action>,
    /// Rule that produced this response.
    pub intent: Intent,
}

impl CommandResponse {
    pub fn say(intent: Intent, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            action: None,
            intent,
        }
    }

    pub fn open(intent: Intent, message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            action: Some(Action::OpenUrl(url.into())),
            intent,
        }
    }

    /// URL the action would open, if any.
    pub fn url(&self) -> Option<&str> {
        match &self.action {
            Some(Action::OpenUrl(url)) => Some(url),
            None => None,
        }
    }
}

/// Executes deferred actions.
pub trait ActionRunner: Send + Sync {
    fn open_url(&self, url: &str) -> Result<()>;
}

/// Opens URLs in the system browser.
pub struct BrowserOpener;

impl ActionRunner for BrowserOpener {
    fn open_url(&self, url: &str) -> Result<()> {
        info!(url, "opening_url");
        open::that_detached(url).map_err(|e| Error::Action(format!("failed to open {url}: {e}")))
    }
}

/// Logs the URL instead of opening it.
pub struct DryRunOpener;

impl ActionRunner for DryRunOpener {
    fn open_url(&self, url: &str) -> Result<()> {
        info!(url, "open_url_dry_run");
        Ok(())
    }
}
