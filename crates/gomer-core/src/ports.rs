//! Application-facing boundary of the bridge.
//!
//! The application feeds the bridge through an [`OutboundSource`] (one event
//! per "send code" action) and receives inbound messages through an
//! [`InboundSink`]. Both are narrow so they can be backed by callbacks,
//! channels, or streams.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Source of "user requested send" events, each carrying the full source.
///
/// `next_code` must be cancel-safe: the router polls it inside `select!`.
#[async_trait]
pub trait OutboundSource: Send {
    /// Next source text to forward, or `None` once the application stops.
    async fn next_code(&mut self) -> Option<String>;
}

#[async_trait]
impl OutboundSource for mpsc::Receiver<String> {
    async fn next_code(&mut self) -> Option<String> {
        self.recv().await
    }
}

#[async_trait]
impl OutboundSource for mpsc::UnboundedReceiver<String> {
    async fn next_code(&mut self) -> Option<String> {
        self.recv().await
    }
}

/// Delivery target for inbound messages.
///
/// Each callback is invoked at most once per inbound frame, synchronously,
/// in wire order.
pub trait InboundSink: Send {
    /// The shared source text was replaced.
    fn on_code_update(&mut self, go_code: String);

    /// A run finished with the given output.
    fn on_run_result(&mut self, output: String);
}

impl<T: InboundSink + ?Sized> InboundSink for Box<T> {
    fn on_code_update(&mut self, go_code: String) {
        (**self).on_code_update(go_code);
    }

    fn on_run_result(&mut self, output: String) {
        (**self).on_run_result(output);
    }
}

/// An inbound message as seen by the application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppEvent {
    /// Delivered through [`InboundSink::on_code_update`].
    CodeUpdated(String),
    /// Delivered through [`InboundSink::on_run_result`].
    RunResultReceived(String),
}

/// Records events in delivery order.
impl InboundSink for Vec<AppEvent> {
    fn on_code_update(&mut self, go_code: String) {
        self.push(AppEvent::CodeUpdated(go_code));
    }

    fn on_run_result(&mut self, output: String) {
        self.push(AppEvent::RunResultReceived(output));
    }
}

/// Sink that forwards every delivery to an unbounded channel.
///
/// Deliveries after the receiver is dropped are discarded.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver the application reads from.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl InboundSink for ChannelSink {
    fn on_code_update(&mut self, go_code: String) {
        let _ = self.tx.send(AppEvent::CodeUpdated(go_code));
    }

    fn on_run_result(&mut self, output: String) {
        let _ = self.tx.send(AppEvent::RunResultReceived(output));
    }
}
