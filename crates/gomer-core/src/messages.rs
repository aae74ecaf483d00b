//! Wire model for the playground channel.
//!
//! Every frame is a JSON text frame. The client sends exactly one shape,
//! [`OutboundMessage`] (`{"goCode": ...}`). The server sends
//! [`InboundMessage`] frames tagged by a `type` discriminant with a `data`
//! payload:
//!
//! ```text
//! {"type":"codeUpdate","data":{"goCode":"..."}}
//! {"type":"runResult","data":{"output":"..."}}
//! ```
//!
//! Parsing an inbound frame yields `Ok(Some(_))` for a recognized
//! discriminant, `Ok(None)` for an unknown or absent one, and a
//! [`ParseError`] for text that is not a well-formed frame.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ParseError;

/// The only frame the client sends: the full Go source to share.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Full source text, forwarded verbatim.
    #[serde(rename = "goCode")]
    pub go_code: String,
}

impl OutboundMessage {
    /// Wrap source text in an outbound message.
    pub fn new(go_code: impl Into<String>) -> Self {
        Self {
            go_code: go_code.into(),
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse an outbound frame, as the server does on receipt.
    pub fn from_frame(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Recognized inbound discriminants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `codeUpdate`: full replacement of the editor text.
    CodeUpdate,
    /// `runResult`: captured output of a run.
    RunResult,
}

impl MessageKind {
    /// Wire tag for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodeUpdate => "codeUpdate",
            Self::RunResult => "runResult",
        }
    }

    /// Exact, case-sensitive match against the wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "codeUpdate" => Some(Self::CodeUpdate),
            "runResult" => Some(Self::RunResult),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message pushed by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum InboundMessage {
    /// Another party (or the server itself) replaced the source text.
    #[serde(rename = "codeUpdate")]
    CodeUpdate {
        /// The new source text.
        #[serde(rename = "goCode")]
        go_code: String,
    },
    /// A run (or format) finished and produced output.
    #[serde(rename = "runResult")]
    RunResult {
        /// Combined stdout/stderr.
        output: String,
    },
}

#[derive(Deserialize)]
struct CodeUpdateData {
    #[serde(rename = "goCode")]
    go_code: String,
}

#[derive(Deserialize)]
struct RunResultData {
    output: String,
}

impl InboundMessage {
    /// Build a `codeUpdate` message.
    pub fn code_update(go_code: impl Into<String>) -> Self {
        Self::CodeUpdate {
            go_code: go_code.into(),
        }
    }

    /// Build a `runResult` message.
    pub fn run_result(output: impl Into<String>) -> Self {
        Self::RunResult {
            output: output.into(),
        }
    }

    /// Discriminant of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::CodeUpdate { .. } => MessageKind::CodeUpdate,
            Self::RunResult { .. } => MessageKind::RunResult,
        }
    }

    /// Parse one inbound text frame.
    ///
    /// Unknown, absent, or non-string `type` values are not errors: they
    /// return `Ok(None)`. Extra fields are ignored.
    pub fn from_frame(raw: &str) -> Result<Option<Self>, ParseError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(mut fields) = value else {
            return Err(ParseError::NotAnObject);
        };

        let Some(kind) = fields
            .get("type")
            .and_then(Value::as_str)
            .and_then(MessageKind::from_tag)
        else {
            return Ok(None);
        };

        let data = fields.remove("data").unwrap_or(Value::Null);
        let message = match kind {
            MessageKind::CodeUpdate => {
                let payload: CodeUpdateData = serde_json::from_value(data)
                    .map_err(|source| ParseError::InvalidPayload { kind, source })?;
                Self::CodeUpdate {
                    go_code: payload.go_code,
                }
            }
            MessageKind::RunResult => {
                let payload: RunResultData = serde_json::from_value(data)
                    .map_err(|source| ParseError::InvalidPayload { kind, source })?;
                Self::RunResult {
                    output: payload.output,
                }
            }
        };
        Ok(Some(message))
    }

    /// Serialize to a JSON text frame, as the server sends it.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
