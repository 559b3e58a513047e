//! Client side of the realtime channel.
//!
//! One persistent websocket per session. The connection lifecycle is
//! `Connecting -> Connected -> {Disconnected -> Reconnecting ->
//! Connected}* -> Closed`; reconnection uses exponential backoff and
//! `Closed` is terminal. Delivery is at-most-once: nothing missed while
//! disconnected is replayed, so consumers refetch authoritative state
//! through the query path after a reconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::domain::ChannelError;
use crate::shared::retry::RetryConfig;
use crate::shared::shutdown::ShutdownSignal;

use super::events::{ClientIntent, EventEnvelope};
use super::registry::{HandlerRegistry, Subscription};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bound on intents queued while the channel is down. The channel is
/// best-effort with no replay, so holding more than this is pointless;
/// emits fail with `QueueFull` once it overflows.
const OUTBOUND_QUEUE_CAP: usize = 64;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
    Closed,
}

/// Realtime client configuration.
#[derive(Debug, Clone)]
pub struct RealtimeClientConfig {
    /// Channel endpoint, e.g. `ws://host:port/ws`.
    pub url: String,
    /// Bearer credential attached to the handshake when signed in.
    pub auth_token: Option<String>,
    /// Reconnect backoff schedule (`max_attempts` is unused; the client
    /// reconnects until closed).
    pub retry: RetryConfig,
}

impl RealtimeClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            retry: RetryConfig {
                initial_delay: Duration::from_millis(500),
                max_delay: Duration::from_secs(30),
                ..Default::default()
            },
        }
    }
}

/// Persistent event channel to the server.
pub struct RealtimeClient {
    config: RealtimeClientConfig,
    registry: Arc<HandlerRegistry>,
    connected: Arc<AtomicBool>,
    state: Arc<Mutex<ChannelState>>,
    outbound_tx: mpsc::Sender<String>,
    outbound_rx: Mutex<Option<mpsc::Receiver<String>>>,
    started: AtomicBool,
    closed: ShutdownSignal,
}

impl RealtimeClient {
    pub fn new(config: RealtimeClientConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAP);
        Self {
            config,
            registry: Arc::new(HandlerRegistry::new()),
            connected: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(ChannelState::Connecting)),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            started: AtomicBool::new(false),
            closed: ShutdownSignal::new(),
        }
    }

    /// Spawn the connection driver. Idempotent; only the first call
    /// starts a driver, and a closed client stays closed.
    pub fn connect(&self) {
        if self.closed.is_triggered() || self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let rx = self
            .outbound_rx
            .lock()
            .expect("client lock poisoned")
            .take()
            .expect("outbound receiver already taken");

        let driver = Driver {
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
            connected: Arc::clone(&self.connected),
            state: Arc::clone(&self.state),
            closed: self.closed.clone(),
        };
        tokio::spawn(driver.run(rx));
    }

    /// Register a handler for one event type. Handlers for the same
    /// type run in registration order; drop the guard to unsubscribe.
    pub fn on(
        &self,
        event_type: impl Into<String>,
        handler: impl Fn(&EventEnvelope) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    ) -> Subscription {
        self.registry.on(event_type, handler)
    }

    /// Queue a client-initiated intent for the server. Intents queued
    /// while reconnecting are delivered once the channel is back; the
    /// queue is bounded, so emits fail once it overflows.
    pub fn emit(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), ChannelError> {
        if self.closed.is_triggered() {
            return Err(ChannelError::Closed);
        }
        let frame = serde_json::json!({ "type": event_type, "data": payload });
        enqueue(&self.outbound_tx, frame.to_string())
    }

    /// Subscribe to one station's updates.
    pub fn join_station(&self, station_id: impl Into<String>) -> Result<(), ChannelError> {
        self.send_intent(&ClientIntent::JoinStation {
            station_id: station_id.into(),
        })
    }

    pub fn leave_station(&self, station_id: impl Into<String>) -> Result<(), ChannelError> {
        self.send_intent(&ClientIntent::LeaveStation {
            station_id: station_id.into(),
        })
    }

    fn send_intent(&self, intent: &ClientIntent) -> Result<(), ChannelError> {
        if self.closed.is_triggered() {
            return Err(ChannelError::Closed);
        }
        let frame = serde_json::to_string(intent).expect("intent serialization cannot fail");
        enqueue(&self.outbound_tx, frame)
    }

    /// Whether event delivery can currently be relied on.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ChannelState {
        *self.state.lock().expect("client lock poisoned")
    }

    /// Tear the channel down. Terminal: no reconnection afterwards.
    pub fn close(&self) {
        self.closed.trigger();
        self.connected.store(false, Ordering::SeqCst);
        *self.state.lock().expect("client lock poisoned") = ChannelState::Closed;
    }
}

fn enqueue(tx: &mpsc::Sender<String>, frame: String) -> Result<(), ChannelError> {
    tx.try_send(frame).map_err(|e| match e {
        mpsc::error::TrySendError::Full(_) => ChannelError::QueueFull,
        mpsc::error::TrySendError::Closed(_) => ChannelError::Closed,
    })
}

struct Driver {
    config: RealtimeClientConfig,
    registry: Arc<HandlerRegistry>,
    connected: Arc<AtomicBool>,
    state: Arc<Mutex<ChannelState>>,
    closed: ShutdownSignal,
}

impl Driver {
    fn set_state(&self, state: ChannelState) {
        *self.state.lock().expect("client lock poisoned") = state;
    }

    async fn run(self, mut outbound: mpsc::Receiver<String>) {
        let mut delay = self.config.retry.initial_delay;
        let mut first_attempt = true;

        loop {
            if self.closed.is_triggered() {
                break;
            }
            self.set_state(if first_attempt {
                ChannelState::Connecting
            } else {
                ChannelState::Reconnecting
            });

            let request = match self.build_request() {
                Ok(request) => request,
                Err(e) => {
                    error!(error = %e, "invalid channel endpoint, closing channel");
                    self.closed.trigger();
                    break;
                }
            };

            match connect_async(request).await {
                Ok((stream, _response)) => {
                    info!(url = %self.config.url, "realtime channel connected");
                    self.set_state(ChannelState::Connected);
                    self.connected.store(true, Ordering::SeqCst);
                    delay = self.config.retry.initial_delay;
                    first_attempt = false;

                    self.pump(stream, &mut outbound).await;

                    self.connected.store(false, Ordering::SeqCst);
                    if self.closed.is_triggered() {
                        break;
                    }
                    self.set_state(ChannelState::Disconnected);
                    warn!("realtime channel lost, scheduling reconnect");
                }
                Err(e) => {
                    first_attempt = false;
                    warn!(error = %e, retry_in_ms = delay.as_millis() as u64,
                        "realtime channel connect failed");
                }
            }

            self.set_state(ChannelState::Reconnecting);
            tokio::select! {
                _ = self.closed.wait() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = self.config.retry.next_delay(delay);
        }

        self.connected.store(false, Ordering::SeqCst);
        self.set_state(ChannelState::Closed);
        debug!("realtime channel driver stopped");
    }

    fn build_request(
        &self,
    ) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, ChannelError> {
        let mut request = self
            .config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;
        if let Some(token) = &self.config.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;
            request.headers_mut().insert("Authorization", value);
        }
        Ok(request)
    }

    /// Shuttle frames until the transport drops or the client closes.
    async fn pump(&self, stream: WsStream, outbound: &mut mpsc::Receiver<String>) {
        let (mut sink, mut source) = stream.split();

        loop {
            tokio::select! {
                _ = self.closed.wait() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
                frame = outbound.recv() => {
                    match frame {
                        Some(text) => {
                            if let Err(e) = sink.send(Message::Text(text)).await {
                                warn!(error = %e, "failed to send intent");
                                return;
                            }
                        }
                        None => return, // client dropped
                    }
                }
                message = source.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => self.deliver(&text),
                        Some(Ok(Message::Ping(payload))) => {
                            if sink.send(Message::Pong(payload)).await.is_err() {
                                return;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => return,
                        Some(Ok(_)) => {} // binary/pong frames are ignored
                        Some(Err(e)) => {
                            warn!(error = %e, "websocket read error");
                            return;
                        }
                    }
                }
            }
        }
    }

    fn deliver(&self, text: &str) {
        match serde_json::from_str::<EventEnvelope>(text) {
            Ok(envelope) => self.registry.dispatch(&envelope),
            Err(e) => debug!(error = %e, "ignoring non-event frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::events::{RealtimeEvent, StationEvent};
    use futures_util::SinkExt;
    use tokio::net::TcpListener;

    fn test_config(url: String) -> RealtimeClientConfig {
        RealtimeClientConfig {
            url,
            auth_token: None,
            retry: RetryConfig {
                initial_delay: Duration::from_millis(20),
                max_delay: Duration::from_millis(100),
                ..Default::default()
            },
        }
    }

    fn envelope_json() -> String {
        serde_json::to_string(&EventEnvelope::new(RealtimeEvent::StationCreated(
            StationEvent {
                station_id: "st-1".into(),
                ..Default::default()
            },
        )))
        .unwrap()
    }

    async fn bind_test_server() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        (listener, url)
    }

    #[tokio::test]
    async fn connects_and_delivers_events() {
        let (listener, url) = bind_test_server().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(envelope_json())).await.unwrap();
            // keep the connection open until the test ends
            while ws.next().await.is_some() {}
        });

        let client = RealtimeClient::new(test_config(url));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = client.on("station-created", move |envelope| {
            let _ = tx.send(envelope.event.event_type().to_string());
            Ok(())
        });

        client.connect();
        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no event delivered")
            .unwrap();
        assert_eq!(received, "station-created");
        assert!(client.connected());
        assert_eq!(client.state(), ChannelState::Connected);

        client.close();
        assert_eq!(client.state(), ChannelState::Closed);
        assert!(!client.connected());
    }

    #[tokio::test]
    async fn reconnects_after_transport_loss() {
        let (listener, url) = bind_test_server().await;

        tokio::spawn(async move {
            // first connection: drop immediately
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            drop(ws);

            // second connection: deliver an event
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(envelope_json())).await.unwrap();
            while ws.next().await.is_some() {}
        });

        let client = RealtimeClient::new(test_config(url));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = client.on("station-created", move |_| {
            let _ = tx.send(());
            Ok(())
        });

        client.connect();
        tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("event after reconnect")
            .unwrap();

        client.close();
    }

    #[tokio::test]
    async fn emit_after_close_is_rejected() {
        let client = RealtimeClient::new(test_config("ws://127.0.0.1:1/ws".into()));
        client.close();
        assert!(matches!(
            client.emit("join-station", serde_json::json!({"stationId": "st-1"})),
            Err(ChannelError::Closed)
        ));
        assert!(matches!(
            client.join_station("st-1"),
            Err(ChannelError::Closed)
        ));
        // connect after close stays closed
        client.connect();
        assert_eq!(client.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn outbound_queue_is_bounded_while_unreachable() {
        // no driver started, so nothing drains the queue
        let client = RealtimeClient::new(test_config("ws://127.0.0.1:1/ws".into()));
        for i in 0..OUTBOUND_QUEUE_CAP {
            client.join_station(format!("st-{}", i)).unwrap();
        }
        assert!(matches!(
            client.join_station("st-overflow"),
            Err(ChannelError::QueueFull)
        ));
    }

    #[tokio::test]
    async fn intents_reach_the_server() {
        let (listener, url) = bind_test_server().await;
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = seen_tx.send(text);
            }
        });

        let client = RealtimeClient::new(test_config(url));
        client.connect();
        client.join_station("st-42").unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(2), seen_rx.recv())
            .await
            .expect("intent not delivered")
            .unwrap();
        let intent: ClientIntent = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            intent,
            ClientIntent::JoinStation {
                station_id: "st-42".into()
            }
        );

        client.close();
    }
}
