//! Subcommand implementations.

use std::io::{self, BufReader, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use gomer_bridge::{
    Action, FORMAT_SUCCESS, MessageRouter, PlaygroundClient, TransportReceiver, TransportSender,
    connect_router,
};
use gomer_core::{AppEvent, ChannelSink, InboundSink};
use gomer_settings::ServerSettings;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::input::{HINT, Input, SessionCommand, spawn_line_reader};
use crate::sink::SessionSink;

/// Bound on the close handshake when leaving.
const CLOSE_WAIT: Duration = Duration::from_secs(2);

async fn connect<S: InboundSink>(
    server: &ServerSettings,
    sink: S,
) -> Result<(MessageRouter<TransportSender, S>, TransportReceiver)> {
    let endpoint = server.endpoint_url()?;
    let limit = Duration::from_millis(server.connect_timeout_ms);
    let connected = timeout(limit, connect_router(&endpoint, sink))
        .await
        .with_context(|| format!("timed out connecting to {endpoint}"))??;
    info!(endpoint = %endpoint, "connected");
    Ok(connected)
}

async fn read_source(file: &Path) -> Result<String> {
    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))
}

async fn close(sender: &TransportSender) {
    sender.close();
    if timeout(CLOSE_WAIT, sender.closed()).await.is_err() {
        warn!("close handshake timed out");
    }
}

/// Connect, forward the file once, close.
pub async fn send(server: &ServerSettings, file: &Path) -> Result<()> {
    let code = read_source(file).await?;
    let (router, _frames) = connect(server, Vec::<AppEvent>::new()).await?;
    router.forward(code).context("failed to send source")?;
    close(router.transport()).await;
    eprintln!("sent {}", file.display());
    Ok(())
}

/// What an action produced on the channel.
#[derive(Debug, PartialEq, Eq)]
pub struct Outcome {
    /// Last source update seen before the result.
    pub code: Option<String>,
    /// The run result.
    pub output: String,
}

/// Collect events until the next run result.
///
/// Returns `None` if the channel ends first.
pub async fn next_outcome(events: &mut mpsc::UnboundedReceiver<AppEvent>) -> Option<Outcome> {
    let mut code = None;
    while let Some(event) = events.recv().await {
        match event {
            AppEvent::CodeUpdated(update) => code = Some(update),
            AppEvent::RunResultReceived(output) => return Some(Outcome { code, output }),
        }
    }
    None
}

/// Trigger `action`, wait for its result, print it. A successful format
/// also rewrites the file with the formatted source.
pub async fn one_shot(server: &ServerSettings, file: &Path, action: Action) -> Result<()> {
    let client = PlaygroundClient::from_settings(server)?;
    one_shot_with(&client, server, file, action, &mut io::stdout()).await
}

pub async fn one_shot_with<W: Write>(
    client: &PlaygroundClient,
    server: &ServerSettings,
    file: &Path,
    action: Action,
    out: &mut W,
) -> Result<()> {
    let code = read_source(file).await?;

    let (sink, mut events) = ChannelSink::new();
    let (mut router, mut frames) = connect(server, sink).await?;
    let sender = router.transport().clone();
    let pump = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            let _ = router.dispatch(&frame);
        }
    });

    let exchanged = exchange(client, server, &code, action, &mut events).await;
    close(&sender).await;
    pump.abort();
    let outcome = exchanged?;

    write!(out, "{}", outcome.output)?;
    if !outcome.output.ends_with('\n') {
        writeln!(out)?;
    }
    out.flush()?;

    if action != Action::Format {
        return Ok(());
    }
    if outcome.output.trim_end() != FORMAT_SUCCESS {
        bail!("format failed; {} left unchanged", file.display());
    }
    match outcome.code {
        Some(formatted) => {
            tokio::fs::write(file, formatted)
                .await
                .with_context(|| format!("failed to write {}", file.display()))?;
            eprintln!("rewrote {}", file.display());
        }
        None => warn!("format succeeded without a source update"),
    }
    Ok(())
}

/// Wait out the greeting, trigger `action`, and collect its outcome.
async fn exchange(
    client: &PlaygroundClient,
    server: &ServerSettings,
    code: &str,
    action: Action,
    events: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<Outcome> {
    // Every connection is greeted with the current source. It must be
    // consumed before triggering so it cannot pass for the formatted source.
    let greeting_limit = Duration::from_millis(server.connect_timeout_ms);
    match timeout(greeting_limit, events.recv()).await {
        Ok(Some(event)) => debug!(?event, "skipping greeting"),
        Ok(None) => bail!("connection closed before the {action} was triggered"),
        Err(_) => warn!(
            limit_ms = server.connect_timeout_ms,
            "no greeting from server; triggering anyway"
        ),
    }
    while let Ok(event) = events.try_recv() {
        debug!(?event, "skipping update from before the {action}");
    }

    client.trigger(action, code).await?;

    let limit = Duration::from_millis(server.result_timeout_ms);
    timeout(limit, next_outcome(events))
        .await
        .with_context(|| format!("no {action} result within {}ms", server.result_timeout_ms))?
        .with_context(|| format!("connection closed before the {action} result arrived"))
}

/// Follow the shared source until stdin ends, `quit`, or the connection
/// closes.
pub async fn session(server: &ServerSettings, file: &Path) -> Result<()> {
    let client = PlaygroundClient::from_settings(server)?;
    let lines = spawn_line_reader(BufReader::new(io::stdin()));
    session_with(&client, server, file, lines, io::stdout()).await
}

pub async fn session_with<W>(
    client: &PlaygroundClient,
    server: &ServerSettings,
    file: &Path,
    mut lines: mpsc::UnboundedReceiver<io::Result<String>>,
    out: W,
) -> Result<()>
where
    W: Write + Send + 'static,
{
    let sink = SessionSink::new(file.to_path_buf(), out);
    let (mut router, mut frames) = connect(server, sink).await?;
    let sender = router.transport().clone();

    let (code_tx, mut code_rx) = mpsc::unbounded_channel::<String>();
    let mut router_task =
        tokio::spawn(async move { router.run(&mut frames, &mut code_rx).await });
    eprintln!("connected; mirroring into {}. {HINT}", file.display());

    let finished = loop {
        tokio::select! {
            joined = &mut router_task => break Some(joined),
            line = lines.recv() => {
                let Some(line) = line else { break None };
                let line = line.context("failed to read stdin")?;
                let command = match Input::parse(&line) {
                    Input::Command(SessionCommand::Quit) => break None,
                    Input::Command(command) => command,
                    Input::Blank => continue,
                    Input::Unknown(word) => {
                        eprintln!("unknown command {word:?}; {HINT}");
                        continue;
                    }
                };
                // An unreadable file skips this command, not the session.
                let code = match read_source(file).await {
                    Ok(code) => code,
                    Err(e) => {
                        eprintln!("{e:#}");
                        continue;
                    }
                };
                match command {
                    SessionCommand::Send => {
                        if code_tx.send(code).is_err() {
                            debug!("router stopped before send");
                        }
                    }
                    SessionCommand::Run => {
                        if let Err(e) = client.run(&code).await {
                            eprintln!("{e}");
                        }
                    }
                    SessionCommand::Format => {
                        if let Err(e) = client.format(&code).await {
                            eprintln!("{e}");
                        }
                    }
                    SessionCommand::Quit => break None,
                }
            }
        }
    };

    match finished {
        Some(joined) => {
            let exit = joined.context("router task failed")??;
            info!(?exit, "router stopped");
            eprintln!("connection closed");
        }
        None => {
            drop(code_tx);
            close(&sender).await;
            let _ = router_task.await.context("router task failed")??;
        }
    }
    Ok(())
}
