//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a settings file may name only the values it changes.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "origin": "http://play.example.com:8080" },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GomerSettings {
    /// Playground server location and timeouts.
    pub server: ServerSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl GomerSettings {
    /// Reject values the bridge cannot use.
    pub fn validate(&self) -> Result<()> {
        let _ = self.server.endpoint_url()?;
        for (key, path) in [
            ("server.connPath", &self.server.conn_path),
            ("server.runPath", &self.server.run_path),
            ("server.formatPath", &self.server.format_path),
        ] {
            if !path.starts_with('/') {
                return Err(SettingsError::invalid(
                    key,
                    format!("{path:?} does not start with '/'"),
                ));
            }
        }
        Ok(())
    }
}

/// Where the playground server lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// HTTP origin of the server, e.g. `http://127.0.0.1:8080`.
    pub origin: String,
    /// Path of the WebSocket endpoint on the origin.
    pub conn_path: String,
    /// Path of the run trigger.
    pub run_path: String,
    /// Path of the format trigger.
    pub format_path: String,
    /// Bound on the WebSocket handshake.
    pub connect_timeout_ms: u64,
    /// Bound on each HTTP action request.
    pub request_timeout_ms: u64,
    /// How long one-shot commands wait for a `runResult`.
    pub result_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:8080".to_string(),
            conn_path: "/conn".to_string(),
            run_path: "/run".to_string(),
            format_path: "/format".to_string(),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            result_timeout_ms: 15_000,
        }
    }
}

impl ServerSettings {
    /// WebSocket URL of the endpoint: the origin with `http` mapped to `ws`
    /// and `https` mapped to `wss`, plus [`Self::conn_path`].
    pub fn endpoint_url(&self) -> Result<String> {
        let origin = self.origin.trim_end_matches('/');
        let ws_origin = if let Some(rest) = origin.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = origin.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(SettingsError::invalid(
                "server.origin",
                format!("{:?} is not an http:// or https:// URL", self.origin),
            ));
        };
        if ws_origin.ends_with("//") {
            return Err(SettingsError::invalid(
                "server.origin",
                format!("{:?} has no host", self.origin),
            ));
        }
        Ok(format!("{ws_origin}{}", self.conn_path))
    }

    /// HTTP URL of a path on the origin.
    pub fn http_url(&self, path: &str) -> String {
        format!("{}{path}", self.origin.trim_end_matches('/'))
    }

    /// URL of the run trigger.
    pub fn run_url(&self) -> String {
        self.http_url(&self.run_path)
    }

    /// URL of the format trigger.
    pub fn format_url(&self) -> String {
        self.http_url(&self.format_path)
    }
}

/// Log output settings. `RUST_LOG` still wins over `level`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `warn` or `gomer_bridge=debug`.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
