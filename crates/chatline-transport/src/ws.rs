//! WebSocket implementation of the live event channel.
//!
//! A background task owns the socket. It feeds decoded frames into an
//! [`EventRouter`] and keeps reconnecting with exponential backoff until the
//! channel is closed. Connection failures never surface as errors to
//! subscribers; they only show up as [`Connectivity::Disconnected`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use chatline_core::Message;

use crate::error::ChannelError;
use crate::live::{Connectivity, EventRouter, LiveChannel, Subscription};

/// One live event as sent over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveFrame {
    /// Event name, e.g. `chat:general:messages`.
    pub event: String,
    /// The full message record.
    pub payload: Message,
}

impl LiveFrame {
    /// Decode a text frame.
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Backoff schedule for reconnect attempts.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
    /// Growth factor per failed attempt.
    pub multiplier: f64,
    /// Randomize each delay into `[delay / 2, delay]`.
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (0-based), without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Delay before retry number `attempt`, jittered if configured.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let low = base / 2;
        rand::thread_rng().gen_range(low..=base)
    }
}

/// A live channel backed by a single WebSocket connection.
pub struct WsLiveChannel {
    router: Arc<EventRouter>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WsLiveChannel {
    /// Start connecting to `url` in the background.
    ///
    /// Returns immediately; the channel reports `Disconnected` until the
    /// first handshake succeeds. Must be called within a Tokio runtime.
    pub fn connect(url: &str, policy: ReconnectPolicy) -> Result<Self, ChannelError> {
        let url = Url::parse(url).map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ChannelError::InvalidUrl(format!(
                "expected ws:// or wss://, got {}://",
                url.scheme()
            )));
        }

        let router = Arc::new(EventRouter::new(Connectivity::Disconnected));
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(
            url,
            policy,
            Arc::clone(&router),
            shutdown.clone(),
        ));

        Ok(Self {
            router,
            shutdown,
            task: Mutex::new(Some(task)),
        })
    }

    /// Close the connection and stop reconnecting.
    pub async fn close(&self) {
        self.shutdown.cancel();
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "live channel task ended abnormally");
            }
        }
    }
}

impl LiveChannel for WsLiveChannel {
    fn connectivity(&self) -> watch::Receiver<Connectivity> {
        self.router.connectivity()
    }

    fn subscribe(&self, event: &str) -> Subscription {
        self.router.subscribe(event)
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.router.unsubscribe(subscription);
    }
}

impl Drop for WsLiveChannel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Connection loop: connect, pump frames, back off, repeat.
async fn run(url: Url, policy: ReconnectPolicy, router: Arc<EventRouter>, shutdown: CancellationToken) {
    let mut attempt: u32 = 0;

    loop {
        let connected = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = connect_async(url.as_str()) => result,
        };

        match connected {
            Ok((stream, _)) => {
                attempt = 0;
                router.set_connectivity(Connectivity::Connected);
                tracing::info!(%url, "live channel connected");

                let result = pump(stream, &router, &shutdown).await;
                router.set_connectivity(Connectivity::Disconnected);

                match result {
                    Ok(()) => break,
                    Err(e) => tracing::warn!(error = %e, "live channel dropped"),
                }
            }
            Err(e) => {
                let e = ChannelError::from(e);
                tracing::warn!(attempt, error = %e, "live channel connect failed");
            }
        }

        let delay = policy.delay_for(attempt);
        attempt = attempt.saturating_add(1);
        tracing::debug!(?delay, attempt, "reconnecting live channel");

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    router.set_connectivity(Connectivity::Disconnected);
    tracing::debug!("live channel stopped");
}

/// Read frames until the socket fails or shutdown is requested.
///
/// `Ok(())` means shutdown; every other exit is an error.
async fn pump(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    router: &EventRouter,
    shutdown: &CancellationToken,
) -> Result<(), ChannelError> {
    let (mut sink, mut frames) = stream.split();

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.send(WsMessage::Close(None)).await;
                return Ok(());
            }
            frame = frames.next() => frame,
        };

        match frame {
            Some(Ok(WsMessage::Text(text))) => route_frame(&text, router),
            Some(Ok(WsMessage::Close(_))) | None => return Err(ChannelError::Closed),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

fn route_frame(text: &str, router: &EventRouter) {
    match LiveFrame::decode(text) {
        Ok(frame) => {
            router.dispatch(&frame.event, frame.payload);
        }
        Err(e) => tracing::warn!(error = %e, "undecodable live frame skipped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter: false,
        };

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_secs(1));
        assert_eq!(policy.delay_for(40), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = ReconnectPolicy::default();
        for attempt in 0..8 {
            let base = policy.base_delay(attempt);
            let delay = policy.delay_for(attempt);
            assert!(delay <= base);
            assert!(delay >= base / 2);
        }
    }

    #[test]
    fn test_decode_frame() {
        let text = json!({
            "event": "chat:general:messages",
            "payload": { "id": "m1", "content": "hey" }
        })
        .to_string();

        let frame = LiveFrame::decode(&text).unwrap();
        assert_eq!(frame.event, "chat:general:messages");
        assert_eq!(frame.payload.id.as_str(), "m1");

        assert!(LiveFrame::decode("{\"event\":\"x\"}").is_err());
    }

    #[test]
    fn test_rejects_http_url() {
        let result = WsLiveChannel::connect("http://chat.test/socket", ReconnectPolicy::default());
        assert!(matches!(result, Err(ChannelError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_receives_frames_and_reports_drop() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(WsMessage::Text("not json".to_string())).await.unwrap();
            let frame = json!({
                "event": "chat:general:messages",
                "payload": { "id": "m1" }
            });
            ws.send(WsMessage::Text(frame.to_string())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let channel = WsLiveChannel::connect(
            &format!("ws://{addr}"),
            ReconnectPolicy {
                initial_delay: Duration::from_secs(60),
                ..ReconnectPolicy::default()
            },
        )
        .unwrap();
        let mut sub = channel.subscribe("chat:general:messages");
        let mut connectivity = channel.connectivity();
        assert!(!channel.is_connected());

        let received = tokio::time::timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.id.as_str(), "m1");

        server.await.unwrap();
        tokio::time::timeout(
            Duration::from_secs(5),
            connectivity.wait_for(|c| !c.is_connected()),
        )
        .await
        .unwrap()
        .unwrap();

        channel.close().await;
    }
}
