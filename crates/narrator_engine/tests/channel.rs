use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use narrator_core::RemoteManifest;
use narrator_engine::{
    run_connection, ChannelCommand, ChannelEvent, ChannelSettings, EngineEvent, EngineHandle,
    EngineSettings, EventSink, FetchError, ManifestFetcher,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc::unbounded_channel;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

#[derive(Default, Clone)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

async fn listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

fn settings(url: String) -> ChannelSettings {
    ChannelSettings {
        url,
        connect_timeout: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn connection_reports_open_frames_and_peer_close() {
    engine_logging::initialize_for_tests();
    let (listener, url) = listener().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let subscribe = ws.next().await.unwrap().unwrap();
        ws.send(Message::Text(
            json!({"job_id": "abc", "status": "processing", "progress": 0.5}).to_string(),
        ))
        .await
        .unwrap();
        ws.close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "job finished".into(),
        }))
        .await
        .unwrap();
        subscribe
    });

    let sink = TestSink::default();
    let (tx, rx) = unbounded_channel();
    tx.send(ChannelCommand::Send(r#"{"action":"subscribe","job_id":"abc"}"#.into()))
        .unwrap();
    run_connection(7, settings(url), rx, &sink).await;

    let received = server.await.unwrap();
    assert_eq!(
        received,
        Message::Text(r#"{"action":"subscribe","job_id":"abc"}"#.into())
    );

    let events = sink.take();
    assert_eq!(events.len(), 3, "{events:?}");
    assert_eq!(
        events[0],
        EngineEvent::Channel(ChannelEvent::Opened { connection: 7 })
    );
    match &events[1] {
        EngineEvent::Channel(ChannelEvent::Frame {
            connection, text, ..
        }) => {
            assert_eq!(*connection, 7);
            assert!(text.contains("\"progress\":0.5"));
        }
        other => panic!("expected frame, got {other:?}"),
    }
    assert_eq!(
        events[2],
        EngineEvent::Channel(ChannelEvent::Closed {
            connection: 7,
            reason: Some("job finished".into()),
        })
    );
}

#[tokio::test]
async fn requested_close_ends_without_an_event() {
    let (listener, url) = listener().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if message.is_close() {
                return true;
            }
        }
        false
    });

    let sink = TestSink::default();
    let (tx, rx) = unbounded_channel();
    let client_sink = sink.clone();
    let client = tokio::spawn(async move {
        run_connection(1, settings(url), rx, &client_sink).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(ChannelCommand::Close).unwrap();
    client.await.unwrap();

    assert!(server.await.unwrap(), "server saw a close frame");
    assert_eq!(
        sink.take(),
        vec![EngineEvent::Channel(ChannelEvent::Opened { connection: 1 })]
    );
}

#[tokio::test]
async fn unreachable_endpoint_reports_failure() {
    let (listener, url) = listener().await;
    drop(listener);

    let sink = TestSink::default();
    let (_tx, rx) = unbounded_channel();
    run_connection(3, settings(url), rx, &sink).await;

    let events = sink.take();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        EngineEvent::Channel(ChannelEvent::Failed { connection: 3, .. })
    ));
}

struct FixedFetcher;

#[async_trait::async_trait]
impl ManifestFetcher for FixedFetcher {
    async fn fetch_manifest(&self, job_id: &str) -> Result<RemoteManifest, FetchError> {
        Ok(RemoteManifest::from_value(
            json!({"job_id": job_id, "items": []}),
        ))
    }
}

fn engine() -> EngineHandle {
    EngineHandle::with_fetcher(EngineSettings::default(), Arc::new(FixedFetcher)).unwrap()
}

#[test]
fn engine_fires_scheduled_retries() {
    let engine = engine();
    engine.schedule_retry(4, Duration::from_millis(20));
    assert_eq!(
        engine.recv_timeout(Duration::from_secs(2)),
        Some(EngineEvent::RetryElapsed { timer: 4 })
    );
}

#[test]
fn engine_cancelled_retry_never_fires() {
    let engine = engine();
    engine.schedule_retry(5, Duration::from_millis(200));
    engine.cancel_retry(5);
    assert_eq!(engine.recv_timeout(Duration::from_millis(500)), None);
}

#[test]
fn engine_reports_fetched_manifests() {
    let engine = engine();
    engine.fetch_manifest("abc");
    match engine.recv_timeout(Duration::from_secs(2)) {
        Some(EngineEvent::ManifestFetched { job_id, result }) => {
            assert_eq!(job_id, "abc");
            assert_eq!(result.unwrap().job_id().as_deref(), Some("abc"));
        }
        other => panic!("expected manifest, got {other:?}"),
    }
}
