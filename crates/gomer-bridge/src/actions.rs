//! HTTP triggers for the playground server's run and format endpoints.
//!
//! Both endpoints take the raw Go source as the request body and answer
//! `204 No Content`. The interesting part, the program output or the
//! formatted source, is broadcast to every connected client over the
//! WebSocket as `runResult` / `codeUpdate` frames, so callers observe it
//! through the router rather than the HTTP response.

use std::fmt;
use std::time::Duration;

use gomer_settings::ServerSettings;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, warn};

/// Status line the server broadcasts as a `runResult` after a format that
/// succeeded. A failed format broadcasts the `gofmt` diagnostics instead and
/// no `codeUpdate`.
pub const FORMAT_SUCCESS: &str = "Code formatted successfully";

/// Server-side action triggered over HTTP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Compile and run the program.
    Run,
    /// Format the program with `gofmt`.
    Format,
}

impl Action {
    /// Short label for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Format => "format",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from triggering an action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request did not complete (connect failure, timeout, ...).
    #[error("{action} request failed: {source}")]
    Request {
        /// Action that was triggered.
        action: Action,
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{action} rejected with status {status}: {body}")]
    Status {
        /// Action that was triggered.
        action: Action,
        /// HTTP status code.
        status: u16,
        /// Response body, trimmed.
        body: String,
    },
}

/// Client for the playground's HTTP actions.
#[derive(Clone, Debug)]
pub struct PlaygroundClient {
    http: reqwest::Client,
    run_url: String,
    format_url: String,
}

impl PlaygroundClient {
    /// Build a client for explicit endpoint URLs.
    pub fn new(
        run_url: impl Into<String>,
        format_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ActionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ActionError::Client)?;
        Ok(Self {
            http,
            run_url: run_url.into(),
            format_url: format_url.into(),
        })
    }

    /// Build a client from server settings.
    pub fn from_settings(server: &ServerSettings) -> Result<Self, ActionError> {
        Self::new(
            server.run_url(),
            server.format_url(),
            Duration::from_millis(server.request_timeout_ms),
        )
    }

    /// Ask the server to run `go_code`. Output arrives as a `runResult`.
    pub async fn run(&self, go_code: &str) -> Result<(), ActionError> {
        self.trigger(Action::Run, go_code).await
    }

    /// Ask the server to format `go_code`. The formatted source arrives as a
    /// `codeUpdate`, followed by a `runResult` status line.
    pub async fn format(&self, go_code: &str) -> Result<(), ActionError> {
        self.trigger(Action::Format, go_code).await
    }

    /// POST the source to the endpoint for `action`.
    pub async fn trigger(&self, action: Action, go_code: &str) -> Result<(), ActionError> {
        let url = match action {
            Action::Run => &self.run_url,
            Action::Format => &self.format_url,
        };
        debug!(action = action.as_str(), url = %url, bytes = go_code.len(), "triggering action");

        let response = self
            .http
            .post(url.as_str())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(go_code.to_owned())
            .send()
            .await
            .map_err(|source| ActionError::Request { action, source })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(action = action.as_str(), status = status.as_u16(), "action rejected");
        Err(ActionError::Status {
            action,
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }
}
