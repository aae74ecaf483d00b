//! # gomer-core
//!
//! Shared vocabulary for the gomer playground bridge.
//!
//! - **Wire model**: [`OutboundMessage`] and the [`InboundMessage`] sum type,
//!   with frame parsing and serialization
//! - **Connection states**: [`ConnectionState`]
//! - **Errors**: [`TransportError`] and [`ParseError`] via `thiserror`
//! - **Ports**: [`OutboundSource`] and [`InboundSink`], the application-facing
//!   boundary, plus channel-backed adapters

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod messages;
pub mod ports;

pub use connection::ConnectionState;
pub use errors::{ParseError, TransportError};
pub use messages::{InboundMessage, MessageKind, OutboundMessage};
pub use ports::{AppEvent, ChannelSink, InboundSink, OutboundSource};
