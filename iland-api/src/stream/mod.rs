//! Long-lived event socket consumer.
//!
//! One supervisor task per [`EventStream`] owns the socket: it dials,
//! authenticates in-band, reads envelopes, and after any failure waits the
//! reconnect delay and starts over with a freshly checked token. Events reach
//! the caller through an unbounded channel; failures never do.

mod handshake;

pub use handshake::{authorization_line, handshake, AUTHORIZATION_PROMPT};

use crate::client::Client;
use crate::error::{ApiError, ApiResult};
use crate::models::event::{Envelope, Event, EVENT_TYPE};
use futures_util::{SinkExt, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reconnection policy for an event stream
#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// Wait after a failed dial or a dropped connection
    pub reconnect_delay: Duration,
    /// Give up after this many dial failures in a row. `None` redials forever.
    pub max_consecutive_failures: Option<u32>,
    /// Limit on connecting and receiving the authorization prompt
    pub handshake_timeout: Duration,
    /// Drop the connection after this long without any frame from the server.
    /// A ping goes out every half of it.
    pub idle_timeout: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            max_consecutive_failures: None,
            handshake_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Caller's end of an event subscription.
///
/// Dropping it stops the background supervisor.
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
    supervisor: JoinHandle<()>,
}

impl EventStream {
    /// Next event, or `None` once the stream is closed
    pub async fn next_event(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Stop reconnecting and close the socket. Buffered events stay readable.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Token that stops this stream when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The supervisor has exited and no more events will arrive
    pub fn is_finished(&self) -> bool {
        self.supervisor.is_finished()
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum Disconnect {
    Cancelled,
    ConsumerGone,
    Lost(String),
}

impl Client {
    /// Subscribe to the event socket, optionally scoped to a company.
    ///
    /// Returns at once; the connection is made in the background.
    pub fn open_event_stream(&self, scope: Option<&str>) -> EventStream {
        let options = StreamOptions {
            reconnect_delay: self.config().reconnect_delay,
            ..StreamOptions::default()
        };
        self.open_event_stream_with(scope, options)
    }

    pub fn open_event_stream_with(&self, scope: Option<&str>, options: StreamOptions) -> EventStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let supervisor = tokio::spawn(supervise(
            self.clone(),
            scope.map(str::to_string),
            options,
            sender,
            cancel.clone(),
        ));

        EventStream {
            receiver,
            cancel,
            supervisor,
        }
    }

    /// Dial the event socket and authenticate. The token is checked and
    /// renewed if necessary before every dial.
    pub async fn dial_event_stream(&self, scope: Option<&str>) -> ApiResult<Socket> {
        self.dial_event_stream_within(scope, StreamOptions::default().handshake_timeout)
            .await
    }

    /// Like [`Client::dial_event_stream`], failing if the socket is not
    /// connected and prompting for authorization within `limit`
    pub async fn dial_event_stream_within(
        &self,
        scope: Option<&str>,
        limit: Duration,
    ) -> ApiResult<Socket> {
        let token = self.ensure_token().await?;
        let dial = async {
            let (mut socket, _) = connect_async(self.config().event_url.as_str()).await?;
            handshake(&mut socket, &token, scope).await?;
            Ok::<_, ApiError>(socket)
        };
        match tokio::time::timeout(limit, dial).await {
            Ok(dialed) => dialed,
            Err(_) => Err(ApiError::Protocol(format!(
                "no authorization prompt within {}ms",
                limit.as_millis()
            ))),
        }
    }
}

async fn supervise(
    client: Client,
    scope: Option<String>,
    options: StreamOptions,
    sender: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
) {
    let mut failures: u32 = 0;

    loop {
        let dialed = tokio::select! {
            _ = cancel.cancelled() => break,
            dialed = client.dial_event_stream_within(scope.as_deref(), options.handshake_timeout) => dialed,
        };

        match dialed {
            Ok(socket) => {
                failures = 0;
                tracing::info!(target: "api::events", scope = ?scope, "Event stream connected");

                match read_events(socket, &sender, &cancel, options.idle_timeout).await {
                    Disconnect::Cancelled | Disconnect::ConsumerGone => break,
                    Disconnect::Lost(reason) => {
                        tracing::warn!(
                            target: "api::events",
                            reason = %reason,
                            delay_ms = options.reconnect_delay.as_millis() as u64,
                            "Event stream lost, reconnecting"
                        );
                    }
                }
            }
            Err(e) => {
                failures += 1;
                if options
                    .max_consecutive_failures
                    .is_some_and(|max| failures >= max)
                {
                    tracing::error!(target: "api::events", error = %e, failures, "Giving up on event stream");
                    break;
                }
                tracing::warn!(
                    target: "api::events",
                    error = %e,
                    failures,
                    delay_ms = options.reconnect_delay.as_millis() as u64,
                    "Failed to dial event stream, retrying"
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sender.closed() => break,
            _ = tokio::time::sleep(options.reconnect_delay) => {}
        }
    }

    tracing::debug!(target: "api::events", "Event stream supervisor stopped");
}

async fn read_events(
    mut socket: Socket,
    sender: &mpsc::UnboundedSender<Event>,
    cancel: &CancellationToken,
    idle_timeout: Duration,
) -> Disconnect {
    let ping_every = (idle_timeout / 2).max(Duration::from_millis(1));
    let mut keepalive = tokio::time::interval_at(Instant::now() + ping_every, ping_every);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_seen = Instant::now();

    let outcome = loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break Disconnect::Cancelled,
            _ = sender.closed() => break Disconnect::ConsumerGone,
            _ = keepalive.tick() => {
                if last_seen.elapsed() >= idle_timeout {
                    break Disconnect::Lost(format!(
                        "no frame from server for {}ms",
                        idle_timeout.as_millis()
                    ));
                }
                if let Err(e) = socket.send(Message::Ping(Vec::new())).await {
                    break Disconnect::Lost(e.to_string());
                }
                continue;
            }
            frame = socket.next() => frame,
        };
        last_seen = Instant::now();

        let payload = match frame {
            None => break Disconnect::Lost("socket closed".to_string()),
            Some(Err(e)) => break Disconnect::Lost(e.to_string()),
            Some(Ok(Message::Close(_))) => break Disconnect::Lost("server closed the socket".to_string()),
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(e) => break Disconnect::Lost(format!("binary frame is not UTF-8: {e}")),
            },
            Some(Ok(_)) => continue,
        };

        match decode_frame(&payload) {
            Ok(Some(event)) => {
                tracing::trace!(target: "api::events", event_id = %event.id, kind = %event.kind, "Received event");
                if sender.send(event).is_err() {
                    break Disconnect::ConsumerGone;
                }
            }
            Ok(None) => {}
            Err(e) => break Disconnect::Lost(e.to_string()),
        }
    };

    let _ = socket.close(None).await;
    outcome
}

/// Decode one socket frame. Non-`EVENT` envelopes yield `None`; an envelope
/// that cannot be parsed at all is a protocol error.
pub fn decode_frame(payload: &str) -> ApiResult<Option<Event>> {
    let envelope: Envelope = serde_json::from_str(payload)
        .map_err(|e| ApiError::Protocol(format!("malformed envelope: {e}")))?;

    if envelope.kind != EVENT_TYPE {
        tracing::trace!(target: "api::events", kind = %envelope.kind, "Ignoring envelope");
        return Ok(None);
    }

    match serde_json::from_value::<Event>(envelope.data) {
        Ok(event) => Ok(Some(event)),
        Err(e) => {
            tracing::warn!(target: "api::events", error = %e, "Skipping undecodable event payload");
            Ok(None)
        }
    }
}
