//! End-to-end tests against an in-process WebSocket server.

use std::future::Future;
use std::time::Duration;

use assert_matches::assert_matches;
use futures::{SinkExt, StreamExt};
use gomer_bridge::{BridgeError, Dispatch, RouterExit, TransportChannel, connect_router};
use gomer_core::{AppEvent, ChannelSink, ConnectionState, MessageKind, TransportError};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

type ServerWs = WebSocketStream<TcpStream>;

const WAIT: Duration = Duration::from_secs(5);

/// Accept one connection on an ephemeral port and run `script` on it.
async fn serve_one<F, Fut, T>(script: F) -> (String, JoinHandle<T>)
where
    F: FnOnce(ServerWs) -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        script(ws).await
    });
    (format!("ws://{addr}/conn"), handle)
}

async fn send_text(ws: &mut ServerWs, text: impl Into<String>) {
    let text: String = text.into();
    ws.send(Message::Text(text.into())).await.unwrap();
}

/// Next text frame from the client, or `None` once it closes.
async fn next_text(ws: &mut ServerWs) -> Option<String> {
    while let Some(msg) = ws.next().await {
        match msg {
            Ok(Message::Text(text)) => return Some(text.as_str().to_owned()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
    None
}

fn code_update(go_code: &str) -> String {
    json!({"type": "codeUpdate", "data": {"goCode": go_code}}).to_string()
}

fn run_result(output: &str) -> String {
    json!({"type": "runResult", "data": {"output": output}}).to_string()
}

#[tokio::test]
async fn playground_round_trip() {
    let (endpoint, server) = serve_one(|mut ws| async move {
        // Current source on connect, like the playground server.
        send_text(&mut ws, code_update("package main\n")).await;
        let received = next_text(&mut ws).await;
        send_text(&mut ws, run_result("hello\n")).await;
        send_text(&mut ws, r#"{"type":"ping"}"#).await;
        let _ = ws.close(None).await;
        received
    })
    .await;

    let (mut router, mut frames) = connect_router(&endpoint, Vec::<AppEvent>::new())
        .await
        .unwrap();
    assert_eq!(router.transport().state(), ConnectionState::Open);

    let (code_tx, mut code_rx) = mpsc::unbounded_channel();
    code_tx.send("package main".to_string()).unwrap();

    let exit = timeout(WAIT, router.run(&mut frames, &mut code_rx))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, RouterExit::ConnectionClosed);

    let received = server.await.unwrap().unwrap();
    let value: Value = serde_json::from_str(&received).unwrap();
    assert_eq!(value, json!({"goCode": "package main"}));

    assert_eq!(
        router.into_sink(),
        vec![
            AppEvent::CodeUpdated("package main\n".into()),
            AppEvent::RunResultReceived("hello\n".into()),
        ]
    );
}

#[tokio::test]
async fn malformed_frames_keep_connection_open() {
    let (endpoint, server) = serve_one(|mut ws| async move {
        send_text(&mut ws, "this is not json").await;
        send_text(&mut ws, "[1, 2, 3]").await;
        send_text(&mut ws, r#"{"type":"runResult","data":{}}"#).await;
        send_text(&mut ws, r#"{"type":"ping"}"#).await;
        send_text(&mut ws, run_result("still here")).await;
        // Proves the client can still talk after the bad frames.
        next_text(&mut ws).await
    })
    .await;

    let (sink, mut events) = ChannelSink::new();
    let (mut router, mut frames) = connect_router(&endpoint, sink).await.unwrap();

    let mut outcomes = Vec::new();
    for _ in 0..5 {
        let frame = timeout(WAIT, frames.recv()).await.unwrap().unwrap();
        outcomes.push(router.dispatch(&frame));
    }
    assert_eq!(
        outcomes,
        vec![
            Dispatch::Malformed,
            Dispatch::Malformed,
            Dispatch::Malformed,
            Dispatch::Ignored,
            Dispatch::Delivered(MessageKind::RunResult),
        ]
    );
    assert_eq!(
        events.try_recv().unwrap(),
        AppEvent::RunResultReceived("still here".into())
    );
    assert!(events.try_recv().is_err());

    assert_eq!(router.transport().state(), ConnectionState::Open);
    router.forward("package main".into()).unwrap();
    let echoed = timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(echoed.as_deref(), Some(r#"{"goCode":"package main"}"#));
}

#[tokio::test]
async fn send_after_server_close_is_not_open() {
    let (endpoint, server) = serve_one(|mut ws| async move {
        let _ = ws.close(None).await;
        // Drain until the client's close reply or EOF.
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;

    let (router, mut frames) = connect_router(&endpoint, Vec::<AppEvent>::new())
        .await
        .unwrap();

    assert_eq!(timeout(WAIT, frames.recv()).await.unwrap(), None);
    assert_eq!(router.transport().state(), ConnectionState::Closed);
    assert_matches!(
        router.forward("package main".into()),
        Err(BridgeError::Transport(TransportError::NotOpen {
            state: ConnectionState::Closed
        }))
    );
    timeout(WAIT, server).await.unwrap().unwrap();
}

#[tokio::test]
async fn frames_keep_wire_order_both_ways() {
    const COUNT: usize = 50;

    let (endpoint, server) = serve_one(|mut ws| async move {
        for i in 0..COUNT {
            send_text(&mut ws, run_result(&i.to_string())).await;
        }
        let mut received = Vec::with_capacity(COUNT);
        for _ in 0..COUNT {
            received.push(next_text(&mut ws).await.unwrap());
        }
        let _ = ws.close(None).await;
        received
    })
    .await;

    let (mut router, mut frames) = connect_router(&endpoint, Vec::<AppEvent>::new())
        .await
        .unwrap();
    for i in 0..COUNT {
        router.forward(format!("// rev {i}")).unwrap();
    }
    while let Some(frame) = timeout(WAIT, frames.recv()).await.unwrap() {
        let _ = router.dispatch(&frame);
    }

    let expected_out: Vec<String> = (0..COUNT)
        .map(|i| json!({"goCode": format!("// rev {i}")}).to_string())
        .collect();
    assert_eq!(server.await.unwrap(), expected_out);

    let expected_in: Vec<AppEvent> = (0..COUNT)
        .map(|i| AppEvent::RunResultReceived(i.to_string()))
        .collect();
    assert_eq!(router.into_sink(), expected_in);
}

#[tokio::test]
async fn client_close_reaches_server_and_resolves_closed() {
    let (endpoint, server) = serve_one(|mut ws| async move { next_text(&mut ws).await }).await;

    let mut channel = TransportChannel::connect(&endpoint).await.unwrap();
    let sender = channel.sender();
    assert_eq!(channel.state(), ConnectionState::Open);

    sender.close();
    timeout(WAIT, sender.closed()).await.unwrap();
    assert_eq!(channel.state(), ConnectionState::Closed);
    assert_matches!(
        channel.send("late"),
        Err(TransportError::NotOpen {
            state: ConnectionState::Closed
        })
    );
    assert_eq!(timeout(WAIT, channel.next_frame()).await.unwrap(), None);

    // The server saw a close, not a text frame.
    assert_eq!(timeout(WAIT, server).await.unwrap().unwrap(), None);
}
