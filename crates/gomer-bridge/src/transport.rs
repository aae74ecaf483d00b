//! WebSocket transport channel, a thin client over `tokio-tungstenite`.
//!
//! One IO task owns the socket. Senders hand text frames to it over an
//! unbounded channel; it pushes inbound text frames, in wire order, onto a
//! second channel read by the [`TransportReceiver`]. The connection state is
//! published through a `watch` channel and ends at
//! [`ConnectionState::Closed`]; nothing reconnects.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use gomer_core::{ConnectionState, TransportError};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Synchronous, non-blocking hand-off of one text frame.
pub trait FrameSender: Send {
    /// Transmit one text frame. Fails unless the connection is open.
    fn send_text(&self, frame: String) -> Result<(), TransportError>;
}

/// Ordered stream of inbound text frames.
///
/// `next_frame` must be cancel-safe: the router polls it inside `select!`.
#[async_trait]
pub trait FrameReceiver: Send {
    /// Next inbound frame, or `None` once the connection is closed.
    async fn next_frame(&mut self) -> Option<String>;
}

/// Commands for the IO task.
#[derive(Debug)]
enum Outgoing {
    Text(String),
    Close,
}

/// A single open WebSocket connection.
#[derive(Debug)]
pub struct TransportChannel {
    sender: TransportSender,
    receiver: TransportReceiver,
}

impl TransportChannel {
    /// Perform the handshake with `endpoint` and start the IO task.
    ///
    /// No retry: a failed handshake is returned as
    /// [`TransportError::Connect`].
    pub async fn connect(endpoint: &str) -> Result<Self, TransportError> {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        debug!(endpoint, "connecting");

        let (ws, _response) = connect_async(endpoint).await.map_err(|e| {
            let _ = state_tx.send_replace(ConnectionState::Closed);
            TransportError::Connect {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        })?;

        let _ = state_tx.send_replace(ConnectionState::Open);
        info!(endpoint, "connection open");

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let io = tokio::spawn(io_loop(ws, out_rx, in_tx, state_tx, endpoint.to_string()));

        Ok(Self {
            sender: TransportSender {
                outgoing: out_tx,
                state: state_rx,
            },
            receiver: TransportReceiver {
                inbound: in_rx,
                _io: io,
            },
        })
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.sender.state()
    }

    /// Transmit one text frame. See [`TransportSender::send`].
    pub fn send(&self, raw: impl Into<String>) -> Result<(), TransportError> {
        self.sender.send(raw)
    }

    /// Next inbound text frame, in wire order.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// A cloned sending handle.
    pub fn sender(&self) -> TransportSender {
        self.sender.clone()
    }

    /// Split into the sending handle and the inbound frame stream.
    pub fn into_split(self) -> (TransportSender, TransportReceiver) {
        (self.sender, self.receiver)
    }
}

/// Cloneable handle for sending frames and observing the connection.
///
/// The connection closes once every handle is dropped or [`Self::close`] is
/// called.
#[derive(Clone, Debug)]
pub struct TransportSender {
    outgoing: mpsc::UnboundedSender<Outgoing>,
    state: watch::Receiver<ConnectionState>,
}

impl TransportSender {
    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        if self.outgoing.is_closed() {
            return ConnectionState::Closed;
        }
        *self.state.borrow()
    }

    /// Hand one text frame to the IO task.
    ///
    /// Returns immediately. Fails with [`TransportError::NotOpen`] while the
    /// connection is not open; nothing is queued in that case.
    pub fn send(&self, raw: impl Into<String>) -> Result<(), TransportError> {
        let state = self.state();
        if !state.is_open() {
            return Err(TransportError::NotOpen { state });
        }
        self.outgoing
            .send(Outgoing::Text(raw.into()))
            .map_err(|_| TransportError::Closed)
    }

    /// Ask the IO task to send a Close frame and stop.
    pub fn close(&self) {
        let _ = self.outgoing.send(Outgoing::Close);
    }

    /// Resolve once the connection reaches [`ConnectionState::Closed`].
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| s.is_terminal()).await;
    }
}

impl FrameSender for TransportSender {
    fn send_text(&self, frame: String) -> Result<(), TransportError> {
        self.send(frame)
    }
}

/// Hand-off into a plain channel, used to drive a router without a socket.
impl FrameSender for mpsc::UnboundedSender<String> {
    fn send_text(&self, frame: String) -> Result<(), TransportError> {
        self.send(frame).map_err(|_| TransportError::Closed)
    }
}

/// Inbound text frames of one connection.
pub struct TransportReceiver {
    inbound: mpsc::UnboundedReceiver<String>,
    _io: JoinHandle<()>,
}

impl std::fmt::Debug for TransportReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportReceiver").finish_non_exhaustive()
    }
}

impl TransportReceiver {
    /// Next inbound text frame, or `None` once the connection is closed and
    /// every earlier frame has been returned.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }
}

#[async_trait]
impl FrameReceiver for TransportReceiver {
    async fn next_frame(&mut self) -> Option<String> {
        self.recv().await
    }
}

#[async_trait]
impl FrameReceiver for mpsc::UnboundedReceiver<String> {
    async fn next_frame(&mut self) -> Option<String> {
        self.recv().await
    }
}

async fn io_loop(
    ws: WsStream,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    inbound: mpsc::UnboundedSender<String>,
    state: watch::Sender<ConnectionState>,
    endpoint: String,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            cmd = outgoing.recv() => {
                match cmd {
                    Some(Outgoing::Text(text)) => {
                        let bytes = text.len();
                        if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                            warn!(endpoint = %endpoint, error = %e, "send failed, closing");
                            break;
                        }
                        debug!(bytes, "frame sent");
                    }
                    // Close requested, or every sender dropped.
                    Some(Outgoing::Close) | None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        debug!(endpoint = %endpoint, "closing connection");
                        break;
                    }
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!(bytes = text.len(), "frame received");
                        if inbound.send(text.as_str().to_owned()).is_err() {
                            debug!("receiver dropped, discarding frame");
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(endpoint = %endpoint, ?frame, "server closed connection");
                        break;
                    }
                    // Binary, ping, pong: not part of the protocol. Pings are
                    // answered by tungstenite.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(endpoint = %endpoint, error = %e, "connection error");
                        break;
                    }
                    None => {
                        info!(endpoint = %endpoint, "connection ended");
                        break;
                    }
                }
            }
        }
    }

    // Closed must be observable before the frame stream ends.
    let _ = state.send_replace(ConnectionState::Closed);
    drop(outgoing);
    drop(inbound);
}
