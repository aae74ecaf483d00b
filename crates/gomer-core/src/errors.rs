//! Error types shared by the transport and the router.
//!
//! - [`TransportError`]: the connection could not be opened, or a frame was
//!   handed to it while it was not open
//! - [`ParseError`]: an inbound frame was not a well-formed message
//!
//! An unknown discriminant has no variant here because it is not an error;
//! see [`crate::InboundMessage::from_frame`].

use thiserror::Error;

use crate::connection::ConnectionState;
use crate::messages::MessageKind;

/// Connection-level failures. Never recovered automatically.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The handshake with the endpoint failed.
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect {
        /// Endpoint URL that was dialed.
        endpoint: String,
        /// Underlying failure.
        reason: String,
    },

    /// `send` was called while the connection was not open.
    #[error("connection is {state}, cannot send")]
    NotOpen {
        /// State observed at the time of the call.
        state: ConnectionState,
    },

    /// The IO task is gone.
    #[error("connection closed")]
    Closed,
}

/// An inbound frame that could not be turned into a message.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The frame is not valid JSON.
    #[error("invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame is valid JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// The discriminant is recognized but `data` lacks its required field.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        /// Discriminant that was matched.
        kind: MessageKind,
        /// Why the payload did not deserialize.
        #[source]
        source: serde_json::Error,
    },
}
