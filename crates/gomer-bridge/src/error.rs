//! Umbrella error for bridge operations.

use gomer_core::TransportError;
use thiserror::Error;

use crate::actions::ActionError;

/// Any failure surfaced by the bridge to its caller.
///
/// Inbound parse failures never appear here: the router drops them.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The connection failed or was not open.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A run or format request failed.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// An outbound message could not be serialized.
    #[error("failed to serialize outbound frame: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use gomer_core::ConnectionState;

    #[test]
    fn transport_error_is_transparent() {
        let err: BridgeError = TransportError::NotOpen {
            state: ConnectionState::Connecting,
        }
        .into();
        assert_eq!(err.to_string(), "connection is connecting, cannot send");
    }
}
