use std::sync::mpsc;
use std::time::Duration;

use chrono::Utc;
use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::{SinkExt, StreamExt};
use narrator_core::ConnectionId;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::tungstenite::Message;

use crate::{ChannelEvent, EngineEvent};

#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub url: String,
    pub connect_timeout: Duration,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000/ws/progress".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Instructions for a running connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCommand {
    Send(String),
    Close,
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Drives one physical connection until it ends.
///
/// Every outcome except a requested close is reported through `sink`:
/// `Opened` once the handshake completes, one `Frame` per text message,
/// then exactly one of `Closed` or `Failed`. A `Close` command, or the
/// command sender being dropped, ends the connection silently.
pub async fn run_connection(
    connection: ConnectionId,
    settings: ChannelSettings,
    mut commands: UnboundedReceiver<ChannelCommand>,
    sink: &dyn EventSink,
) {
    let mut queued = Vec::new();
    let connect = tokio::time::timeout(
        settings.connect_timeout,
        tokio_tungstenite::connect_async(settings.url.as_str()),
    );
    tokio::pin!(connect);

    let mut ws = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok(Ok((ws, _response))) => break ws,
                Ok(Err(err)) => {
                    fail(sink, connection, format!("connect failed: {err}"));
                    return;
                }
                Err(_) => {
                    fail(
                        sink,
                        connection,
                        format!("connect timed out after {:?}", settings.connect_timeout),
                    );
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(ChannelCommand::Send(text)) => queued.push(text),
                Some(ChannelCommand::Close) | None => {
                    engine_debug!("Connection {connection} closed before handshake");
                    return;
                }
            },
        }
    };

    engine_info!("Connection {connection} open to {}", settings.url);
    sink.emit(EngineEvent::Channel(ChannelEvent::Opened { connection }));

    for text in queued {
        if let Err(err) = ws.send(Message::Text(text)).await {
            fail(sink, connection, format!("send failed: {err}"));
            return;
        }
    }

    loop {
        tokio::select! {
            incoming = ws.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    sink.emit(EngineEvent::Channel(ChannelEvent::Frame {
                        connection,
                        text,
                        received_at: Utc::now(),
                    }));
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => sink.emit(EngineEvent::Channel(ChannelEvent::Frame {
                        connection,
                        text,
                        received_at: Utc::now(),
                    })),
                    Err(_) => engine_warn!("Connection {connection} dropped a non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|frame| frame.reason.to_string())
                        .filter(|reason| !reason.is_empty());
                    engine_info!("Connection {connection} closed by peer: {reason:?}");
                    sink.emit(EngineEvent::Channel(ChannelEvent::Closed { connection, reason }));
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    fail(sink, connection, err.to_string());
                    return;
                }
                None => {
                    sink.emit(EngineEvent::Channel(ChannelEvent::Closed {
                        connection,
                        reason: None,
                    }));
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(ChannelCommand::Send(text)) => {
                    engine_debug!("Connection {connection} sending {text}");
                    if let Err(err) = ws.send(Message::Text(text)).await {
                        fail(sink, connection, format!("send failed: {err}"));
                        return;
                    }
                }
                Some(ChannelCommand::Close) | None => {
                    engine_debug!("Connection {connection} closing on request");
                    let _ = ws.close(None).await;
                    return;
                }
            },
        }
    }
}

fn fail(sink: &dyn EventSink, connection: ConnectionId, message: String) {
    engine_warn!("Connection {connection} failed: {message}");
    sink.emit(EngineEvent::Channel(ChannelEvent::Failed {
        connection,
        message,
    }));
}
