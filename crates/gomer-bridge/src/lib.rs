//! # gomer-bridge
//!
//! Client side of the gomer playground channel.
//!
//! - [`transport`]: one WebSocket connection, split into a [`TransportSender`]
//!   handle and a [`TransportReceiver`] frame stream
//! - [`router`]: [`MessageRouter`] serializes outbound source text and
//!   dispatches inbound frames to an [`InboundSink`]
//! - [`actions`]: [`PlaygroundClient`] triggers the server's run and format
//!   endpoints over HTTP; their results come back through the router
//!
//! ```no_run
//! # async fn demo() -> Result<(), gomer_bridge::BridgeError> {
//! use gomer_core::ChannelSink;
//!
//! let (sink, _events) = ChannelSink::new();
//! let (router, _frames) =
//!     gomer_bridge::connect_router("ws://127.0.0.1:8080/conn", sink).await?;
//! router.forward("package main".to_string())?;
//! # Ok(()) }
//! ```

#![deny(unsafe_code)]

pub mod actions;
pub mod error;
pub mod router;
pub mod transport;

pub use actions::{Action, ActionError, FORMAT_SUCCESS, PlaygroundClient};
pub use error::BridgeError;
pub use router::{Dispatch, MessageRouter, RouterExit};
pub use transport::{FrameReceiver, FrameSender, TransportChannel, TransportReceiver, TransportSender};

use gomer_core::{InboundSink, TransportError};

/// Connect to `endpoint` and wire a router around the new connection.
///
/// The router owns the sending half; drive the returned receiver with
/// [`MessageRouter::run`] or feed its frames to [`MessageRouter::dispatch`].
pub async fn connect_router<S: InboundSink>(
    endpoint: &str,
    sink: S,
) -> Result<(MessageRouter<TransportSender, S>, TransportReceiver), TransportError> {
    let (sender, receiver) = TransportChannel::connect(endpoint).await?.into_split();
    Ok((MessageRouter::new(sender, sink), receiver))
}
