//! Native collaboration WS client — `tokio-tungstenite`.
//!
//! A background tokio task owns the connection: keepalive pings, bounded
//! exponential-backoff reconnection, and resubscription of tracked channels
//! after a reconnect. The public API talks to it over mpsc channels and
//! consumes events as a stream.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream, Stream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::WsError;
use crate::ws::{Kind, MessageIn, MessageOut, SubscribeParams, UnsubscribeParams, WsConfig, WsEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

enum Command {
    Send(MessageOut),
    Disconnect,
}

/// Why the connected loop ended, deciding whether to reconnect.
enum Hangup {
    UserRequested,
    ServerClosed { code: Option<u16>, reason: String },
    Lost(String),
}

struct RelayTask {
    config: WsConfig,
    event_tx: mpsc::Sender<WsEvent>,
    cmd_rx: mpsc::Receiver<Command>,
    tracked: Vec<SubscribeParams>,
    attempts: u32,
    connected: Arc<AtomicBool>,
}

impl RelayTask {
    fn emit(&self, event: WsEvent) {
        let _ = self.event_tx.try_send(event);
    }
}

/// Native WebSocket client for the collaboration relay.
pub struct WsClient {
    config: WsConfig,
    cmd_tx: Option<mpsc::Sender<Command>>,
    event_rx: tokio::sync::Mutex<mpsc::Receiver<WsEvent>>,
    event_tx: mpsc::Sender<WsEvent>,
    task_handle: Option<JoinHandle<()>>,
    connected: Arc<AtomicBool>,
}

impl WsClient {
    /// Create a new WS client. Does not connect yet.
    pub fn new(config: WsConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            config,
            cmd_tx: None,
            event_rx: tokio::sync::Mutex::new(event_rx),
            event_tx,
            task_handle: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Connect to the relay. Spawns the background task; idempotent while a
    /// task is already running.
    pub async fn connect(&mut self) -> Result<(), WsError> {
        if self.cmd_tx.is_some() {
            return Ok(());
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        self.cmd_tx = Some(cmd_tx);

        let task = RelayTask {
            config: self.config.clone(),
            event_tx: self.event_tx.clone(),
            cmd_rx,
            tracked: Vec::new(),
            attempts: 0,
            connected: Arc::clone(&self.connected),
        };
        self.task_handle = Some(tokio::spawn(run_relay(task)));
        Ok(())
    }

    /// Disconnect gracefully and wait for the background task to finish.
    pub async fn disconnect(&mut self) -> Result<(), WsError> {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(Command::Disconnect).await;
        }
        if let Some(handle) = self.task_handle.take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Send a message to the relay.
    pub fn send(&self, msg: MessageOut) -> Result<(), WsError> {
        match &self.cmd_tx {
            Some(tx) => tx.try_send(Command::Send(msg)).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    WsError::SendFailed("Command channel full".into())
                }
                mpsc::error::TrySendError::Closed(_) => WsError::NotConnected,
            }),
            None => Err(WsError::NotConnected),
        }
    }

    pub fn subscribe(&self, params: SubscribeParams) -> Result<(), WsError> {
        self.send(MessageOut::Subscribe { params })
    }

    pub fn unsubscribe(&self, params: UnsubscribeParams) -> Result<(), WsError> {
        self.send(MessageOut::Unsubscribe { params })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Stream of events from the relay. Borrows `self`; drop the stream
    /// before calling `disconnect()`.
    pub fn events(&self) -> Pin<Box<dyn Stream<Item = WsEvent> + Send + '_>> {
        Box::pin(futures_util::stream::unfold(
            &self.event_rx,
            |rx| async move {
                let mut guard = rx.lock().await;
                guard.recv().await.map(|event| (event, rx))
            },
        ))
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_relay(mut task: RelayTask) {
    loop {
        let (sink, stream) = match dial(&task.config.connect_url()).await {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!("Relay connection failed: {}", e);
                task.emit(WsEvent::Error(format!("Connection failed: {}", e)));
                if reconnectable(&task) {
                    backoff(&mut task).await;
                    continue;
                }
                task.emit(WsEvent::ReconnectGaveUp);
                return;
            }
        };

        task.attempts = 0;
        task.connected.store(true, Ordering::SeqCst);
        task.emit(WsEvent::Connected);

        let mut sink = sink;
        resubscribe(&mut sink, &task.tracked).await;

        let reason = run_connected(&mut task, sink, stream).await;
        task.connected.store(false, Ordering::SeqCst);

        match reason {
            Hangup::UserRequested => return,
            Hangup::ServerClosed { code: Some(1000), .. } => return,
            Hangup::ServerClosed { .. } | Hangup::Lost(_) => {
                if reconnectable(&task) {
                    backoff(&mut task).await;
                    continue;
                }
                task.emit(WsEvent::ReconnectGaveUp);
                return;
            }
        }
    }
}

async fn run_connected(
    task: &mut RelayTask,
    mut sink: WsSink,
    mut stream: SplitStream<WsStream>,
) -> Hangup {
    let mut ping_interval =
        tokio::time::interval(Duration::from_millis(task.config.ping_interval_ms));
    ping_interval.reset(); // skip the immediate first tick
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let raw: &str = text.as_ref();
                        match serde_json::from_str::<MessageIn>(raw) {
                            Ok(inbound) => {
                                if matches!(inbound.kind, Kind::Pong) {
                                    awaiting_pong = false;
                                }
                                task.emit(WsEvent::Message(inbound.kind));
                            }
                            Err(e) => {
                                tracing::warn!("Relay message did not parse: {} — raw: {}", e, raw);
                                task.emit(WsEvent::Error(format!("Deserialization error: {}", e)));
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                            None => (None, String::new()),
                        };
                        task.emit(WsEvent::Disconnected { code, reason: reason.clone() });
                        return Hangup::ServerClosed { code, reason };
                    }
                    Some(Ok(_)) => {} // Binary, ws-level Pong — ignore
                    Some(Err(e)) => {
                        let reason = e.to_string();
                        task.emit(WsEvent::Disconnected { code: None, reason: reason.clone() });
                        return Hangup::Lost(reason);
                    }
                    None => {
                        task.emit(WsEvent::Disconnected { code: None, reason: "Stream ended".into() });
                        return Hangup::Lost("Stream ended".into());
                    }
                }
            }

            cmd = task.cmd_rx.recv() => {
                match cmd {
                    Some(Command::Send(msg)) => {
                        track_subscription(&mut task.tracked, &msg);
                        if let Err(e) = send_msg(&mut sink, &msg).await {
                            tracing::warn!("Relay send failed: {}", e);
                        }
                    }
                    Some(Command::Disconnect) | None => {
                        let _ = sink.send(Message::Close(None)).await;
                        return Hangup::UserRequested;
                    }
                }
            }

            _ = ping_interval.tick() => {
                if awaiting_pong {
                    tracing::warn!("Relay missed a pong; dropping connection");
                    task.emit(WsEvent::Disconnected { code: None, reason: "Pong timeout".into() });
                    let _ = sink.close().await;
                    return Hangup::Lost("Pong timeout".into());
                }
                if send_msg(&mut sink, &MessageOut::Ping).await.is_ok() {
                    awaiting_pong = true;
                }
            }
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn dial(url: &str) -> Result<(WsSink, SplitStream<WsStream>), String> {
    let (ws_stream, _) = tokio::time::timeout(Duration::from_secs(15), connect_async(url))
        .await
        .map_err(|_| "Connection timeout".to_string())?
        .map_err(|e| e.to_string())?;
    Ok(ws_stream.split())
}

async fn send_msg(sink: &mut WsSink, msg: &MessageOut) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json.into()))
        .await
        .map_err(|e| e.to_string())
}

fn reconnectable(task: &RelayTask) -> bool {
    task.config.reconnect && task.attempts < task.config.max_reconnect_attempts
}

async fn backoff(task: &mut RelayTask) {
    task.attempts += 1;
    let exp = (task.attempts - 1).min(6);
    let base = task.config.base_reconnect_delay_ms.saturating_mul(1u32 << exp);
    let jitter = rand::random::<u32>() % 250;
    let delay = base.saturating_add(jitter).min(30_000);
    tracing::info!(
        "Relay reconnect attempt {}/{} in {}ms",
        task.attempts,
        task.config.max_reconnect_attempts,
        delay
    );
    tokio::time::sleep(Duration::from_millis(delay as u64)).await;
}

fn track_subscription(tracked: &mut Vec<SubscribeParams>, msg: &MessageOut) {
    match msg {
        MessageOut::Subscribe { params } => {
            if !tracked.iter().any(|s| s.channel_key() == params.channel_key()) {
                tracked.push(params.clone());
            }
        }
        MessageOut::Unsubscribe { params } => {
            tracked.retain(|s| !s.matches_unsubscribe(params));
        }
        MessageOut::Ping => {}
    }
}

async fn resubscribe(sink: &mut WsSink, tracked: &[SubscribeParams]) {
    if tracked.is_empty() {
        return;
    }
    tracing::info!("Resubscribing to {} relay channel(s)", tracked.len());
    for params in tracked {
        let msg = MessageOut::Subscribe {
            params: params.clone(),
        };
        if let Err(e) = send_msg(sink, &msg).await {
            tracing::warn!("Failed to resubscribe: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study_sub(id: &str) -> MessageOut {
        MessageOut::Subscribe {
            params: SubscribeParams::Study {
                study_id: id.into(),
            },
        }
    }

    #[test]
    fn test_new_client_is_disconnected() {
        let client = WsClient::new(WsConfig::default());
        assert!(!client.is_connected());
        assert!(client.cmd_tx.is_none());
    }

    #[test]
    fn test_send_when_not_connected() {
        let client = WsClient::new(WsConfig::default());
        let result = client.send(MessageOut::Ping);
        assert!(matches!(result, Err(WsError::NotConnected)));
    }

    #[test]
    fn test_track_subscription_dedups() {
        let mut tracked = Vec::new();
        track_subscription(&mut tracked, &study_sub("s-1"));
        track_subscription(&mut tracked, &study_sub("s-1"));
        assert_eq!(tracked.len(), 1);

        track_subscription(&mut tracked, &study_sub("s-2"));
        assert_eq!(tracked.len(), 2);
    }

    #[test]
    fn test_track_subscription_removes_on_unsubscribe() {
        let mut tracked = Vec::new();
        track_subscription(&mut tracked, &study_sub("s-1"));
        track_subscription(
            &mut tracked,
            &MessageOut::Unsubscribe {
                params: UnsubscribeParams::Study {
                    study_id: "s-1".into(),
                },
            },
        );
        assert!(tracked.is_empty());
    }

    #[test]
    fn test_track_subscription_ping_noop() {
        let mut tracked = Vec::new();
        track_subscription(&mut tracked, &MessageOut::Ping);
        assert!(tracked.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_when_not_connected() {
        let mut client = WsClient::new(WsConfig::default());
        assert!(client.disconnect().await.is_ok());
    }
}
