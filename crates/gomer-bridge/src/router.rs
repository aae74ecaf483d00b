//! Message router. Translates between the application's ports and the
//! wire's JSON text frames.
//!
//! Outbound: every source event becomes exactly one `{"goCode": ...}` frame.
//! Inbound: each frame is parsed and delivered to at most one sink callback.
//! Malformed frames are logged and dropped; frames with an unrecognized
//! `type` are ignored. Neither reaches the application or closes the
//! connection.

use gomer_core::{InboundMessage, InboundSink, MessageKind, OutboundMessage, OutboundSource};
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::transport::{FrameReceiver, FrameSender};

/// What happened to one inbound frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Delivered to the sink callback for this kind.
    Delivered(MessageKind),
    /// Unknown or absent discriminant; nothing delivered.
    Ignored,
    /// Not a well-formed frame; logged and dropped.
    Malformed,
}

/// Why [`MessageRouter::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouterExit {
    /// The outbound source is exhausted.
    SourceClosed,
    /// The transport closed; every frame received before that was dispatched.
    ConnectionClosed,
}

/// Stateless per-message dispatcher between a transport and a sink.
pub struct MessageRouter<T, S> {
    transport: T,
    sink: S,
}

impl<T: FrameSender, S: InboundSink> MessageRouter<T, S> {
    /// Wire a transport handle to an application sink.
    pub fn new(transport: T, sink: S) -> Self {
        Self { transport, sink }
    }

    /// The transport handle.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The application sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Take the sink back, dropping the transport handle.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Serialize `go_code` and send it as one frame. No validation.
    pub fn forward(&self, go_code: String) -> Result<(), BridgeError> {
        let frame = OutboundMessage::new(go_code).to_frame()?;
        debug!(bytes = frame.len(), "forwarding code");
        self.transport.send_text(frame)?;
        Ok(())
    }

    /// Parse one inbound frame and deliver it.
    pub fn dispatch(&mut self, raw: &str) -> Dispatch {
        match InboundMessage::from_frame(raw) {
            Ok(Some(message)) => {
                let kind = message.kind();
                debug!(kind = kind.as_str(), "dispatching frame");
                match message {
                    InboundMessage::CodeUpdate { go_code } => self.sink.on_code_update(go_code),
                    InboundMessage::RunResult { output } => self.sink.on_run_result(output),
                }
                Dispatch::Delivered(kind)
            }
            Ok(None) => {
                debug!(bytes = raw.len(), "ignoring frame with unrecognized type");
                Dispatch::Ignored
            }
            Err(e) => {
                warn!(error = %e, bytes = raw.len(), "dropping malformed frame");
                Dispatch::Malformed
            }
        }
    }

    /// Drive both directions until the source or the connection ends.
    ///
    /// One event is handled to completion before the next is awaited, so
    /// sink callbacks never overlap. A failed send ends the loop with the
    /// transport error.
    pub async fn run<R, O>(&mut self, frames: &mut R, source: &mut O) -> Result<RouterExit, BridgeError>
    where
        R: FrameReceiver + ?Sized,
        O: OutboundSource + ?Sized,
    {
        loop {
            tokio::select! {
                code = source.next_code() => {
                    let Some(code) = code else {
                        debug!("outbound source closed");
                        return Ok(RouterExit::SourceClosed);
                    };
                    self.forward(code)?;
                }
                frame = frames.next_frame() => {
                    let Some(frame) = frame else {
                        info!("connection closed, router stopping");
                        return Ok(RouterExit::ConnectionClosed);
                    };
                    let _ = self.dispatch(&frame);
                }
            }
        }
    }
}
