//! Streaming market-data feed.
//!
//! One supervisor loop owns the connection lifecycle:
//!
//! ```text
//! CONNECTING ──handshake+connect+subscribe──> OPEN ──ping──> AWAITING_PONG
//!     ^                                         ^                 │
//!     │                                         └──────pong───────┘
//!     │                                                           │
//!     └──fixed delay── RECONNECTING <── error / close / pong deadline
//!
//! shutdown from any state ──> CLOSED
//! ```
//!
//! A session ends before the next one starts, so there is never more than one
//! live connection per feed, and each failure arms exactly one reconnect
//! delay. [`ConnectionAttempts`] is handed in by the caller and may be shared
//! by several feeds; it caps how many attempts are in flight across all of
//! them. A refused attempt waits out the same reconnect delay.

use std::sync::Arc;
use std::sync::atomic::{ AtomicU64, AtomicUsize, Ordering };
use std::time::Duration;

use anyhow::{ anyhow, Context, Result };
use futures::{ SinkExt, StreamExt };
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{ mpsc, watch };
use tokio::time::{ Instant, MissedTickBehavior };
use tungstenite::protocol::Message;
use tracing::{ debug, error, info, warn };
use uuid::Uuid;

use crate::enums::connection_state::ConnectionState;
use crate::exchange::client::ExchangeClient;
use crate::exchange::connector::{ stream_url, StreamConnector, WsSink, WsSource };
use crate::exchange::error::FrameError;
use crate::models::kucoin_models::{
    InstanceServer,
    PingRequest,
    SubscribeRequest,
    Ticker,
    WsFrame,
};
use crate::models::quote::QuoteUpdate;
use crate::utils::shutdown::{ is_shutdown, wait_for_shutdown };

/// KuCoin topic carrying best bid/ask for every pair
pub const ALL_TICKERS_TOPIC: &str = "/market/ticker:all";

/// Shortest ping interval accepted from the server
const MIN_PING_INTERVAL: Duration = Duration::from_millis(100);

/// How much of a bad frame to echo into the log
const FRAME_PREVIEW_CHARS: usize = 200;

/// Warn about a full engine queue once per this many dropped quotes
const DROP_WARN_EVERY: u64 = 1000;

/// Events flowing from the feeds into the engine task
#[derive(Debug, Clone)]
pub enum MarketEvent {
    /// Full REST snapshot; triggers a catalog rebuild
    Snapshot(Vec<Ticker>),
    /// Streamed change for one pair
    Quote(QuoteUpdate),
}

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub topic: String,
    pub reconnect_delay: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            topic: ALL_TICKERS_TOPIC.to_string(),
            reconnect_delay: Duration::from_millis(5000),
        }
    }
}

/// Counts connection attempts in flight and refuses new ones past the cap
#[derive(Debug)]
pub struct ConnectionAttempts {
    active: AtomicUsize,
    cap: usize,
}

/// Holds one attempt slot until dropped
#[derive(Debug)]
pub struct AttemptGuard {
    attempts: Arc<ConnectionAttempts>,
}

impl ConnectionAttempts {
    pub fn new(cap: usize) -> Arc<Self> {
        Arc::new(Self { active: AtomicUsize::new(0), cap: cap.max(1) })
    }

    pub fn try_acquire(self: &Arc<Self>) -> Option<AttemptGuard> {
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= self.cap {
                return None;
            }
            match
                self.active.compare_exchange_weak(
                    current,
                    current + 1,
                    Ordering::AcqRel,
                    Ordering::Acquire
                )
            {
                Ok(_) => {
                    return Some(AttemptGuard { attempts: Arc::clone(self) });
                }
                Err(actual) => {
                    current = actual;
                }
            }
        }
    }

    #[inline]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    #[inline]
    pub fn cap(&self) -> usize {
        self.cap
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        self.attempts.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Ping cadence negotiated with the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Heartbeat {
    pub fn from_server(server: &InstanceServer) -> Self {
        Self {
            interval: Duration::from_millis(server.ping_interval).max(MIN_PING_INTERVAL),
            timeout: Duration::from_millis(server.ping_timeout),
        }
    }

    /// Time allowed without a pong before the connection is declared dead
    #[inline]
    pub fn deadline(&self) -> Duration {
        self.interval + self.timeout
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Shutdown,
    PongTimeout,
    Closed,
}

/// What a decoded text frame means to the session
#[derive(Debug, PartialEq)]
pub enum Inbound {
    Quote(QuoteUpdate),
    Pong,
    Welcome,
    Ack,
    ServerError(String),
    Ignored,
}

/// Decode a text frame from the public stream
pub fn decode_frame(text: &str) -> Result<Inbound, FrameError> {
    let frame: WsFrame = serde_json::from_str(text)?;

    Ok(match frame {
        WsFrame::Message { subject, data, .. } => {
            if subject.is_empty() {
                return Err(FrameError::MissingSubject);
            }
            let update = QuoteUpdate::new(subject.as_str(), data.best_bid, data.best_ask);
            if update.is_empty() {
                return Err(FrameError::EmptyQuote(subject));
            }
            Inbound::Quote(update)
        }
        WsFrame::Pong { .. } => Inbound::Pong,
        WsFrame::Welcome { .. } => Inbound::Welcome,
        WsFrame::Ack { .. } => Inbound::Ack,
        WsFrame::Error { code, data } =>
            Inbound::ServerError(
                format!(
                    "{} {}",
                    code.map(|c| c.to_string()).unwrap_or_default(),
                    data.map(|d| d.to_string()).unwrap_or_default()
                )
            ),
        WsFrame::Other => Inbound::Ignored,
    })
}

#[inline]
fn preview(text: &str) -> &str {
    match text.char_indices().nth(FRAME_PREVIEW_CHARS) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

pub struct MarketDataFeed {
    client: Arc<dyn ExchangeClient>,
    connector: Arc<dyn StreamConnector>,
    settings: FeedSettings,
    attempts: Arc<ConnectionAttempts>,
    events: mpsc::Sender<MarketEvent>,
    state: watch::Sender<ConnectionState>,
    /// Quotes discarded because the engine queue was full
    dropped_quotes: AtomicU64,
}

impl MarketDataFeed {
    pub fn new(
        client: Arc<dyn ExchangeClient>,
        connector: Arc<dyn StreamConnector>,
        settings: FeedSettings,
        attempts: Arc<ConnectionAttempts>,
        events: mpsc::Sender<MarketEvent>
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);

        Self {
            client,
            connector,
            settings,
            attempts,
            events,
            state,
            dropped_quotes: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    #[inline]
    pub fn attempts(&self) -> &Arc<ConnectionAttempts> {
        &self.attempts
    }

    #[inline]
    pub fn dropped_quotes(&self) -> u64 {
        self.dropped_quotes.load(Ordering::Relaxed)
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });

        if changed {
            match next {
                ConnectionState::Open | ConnectionState::AwaitingPong => {
                    debug!(state = %next, "Connection state changed");
                }
                _ => info!(state = %next, "Connection state changed"),
            }
        }
    }

    /// Keep a streaming connection alive until shutdown is requested
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            topic = %self.settings.topic,
            client = self.client.name(),
            "Establishing streaming connection. Please wait..."
        );

        loop {
            if is_shutdown(&shutdown) {
                break;
            }

            self.set_state(ConnectionState::Connecting);

            let outcome = match self.attempts.try_acquire() {
                Some(_guard) => self.run_session(&mut shutdown).await,
                None =>
                    Err(
                        anyhow!(
                            "connection attempt refused: {} of {} already in flight",
                            self.attempts.active(),
                            self.attempts.cap()
                        )
                    ),
            };

            match outcome {
                Ok(SessionEnd::Shutdown) => {
                    break;
                }
                Ok(SessionEnd::PongTimeout) => {
                    warn!("No pong within the heartbeat deadline, forcing reconnect");
                }
                Ok(SessionEnd::Closed) => {
                    warn!("Streaming connection closed by peer");
                }
                Err(e) => {
                    error!("Streaming connection failed: {:#}", e);
                }
            }

            self.set_state(ConnectionState::Reconnecting);
            info!("Reconnecting in {:?}", self.settings.reconnect_delay);

            tokio::select! {
                _ = tokio::time::sleep(self.settings.reconnect_delay) => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }

        self.set_state(ConnectionState::Closed);
        info!("Streaming feed stopped");
    }

    /// Handshake, connect, subscribe and drive one connection to its end
    async fn run_session(&self, shutdown: &mut watch::Receiver<bool>) -> Result<SessionEnd> {
        let token = self.client.get_public_token().await.context("Stream handshake failed")?;

        // Fresh id per attempt; the server echoes it on acks and pongs
        let connect_id = Uuid::new_v4().simple().to_string();
        let url = stream_url(&token.server.endpoint, &token.token, &connect_id)?;
        let heartbeat = Heartbeat::from_server(&token.server);

        let (mut sink, source) =
            tokio::select! {
            connected = self.connector.connect(&url) => connected?,
            _ = wait_for_shutdown(shutdown) => return Ok(SessionEnd::Shutdown),
        };

        self.set_state(ConnectionState::Open);

        let subscribe = serde_json::to_string(
            &SubscribeRequest::new(&connect_id, &self.settings.topic)
        )?;
        sink.send(Message::Text(subscribe.into())).await.context("Failed to send subscription")?;

        info!(
            topic = %self.settings.topic,
            %connect_id,
            ping_interval = ?heartbeat.interval,
            "Subscribed to all tickers, streaming connection ready"
        );

        self.drive_session(sink, source, &connect_id, heartbeat, shutdown).await
    }

    /// Pump one open connection: heartbeat, pong deadline, inbound frames
    pub(crate) async fn drive_session(
        &self,
        mut sink: WsSink,
        mut source: WsSource,
        connect_id: &str,
        heartbeat: Heartbeat,
        shutdown: &mut watch::Receiver<bool>
    ) -> Result<SessionEnd> {
        let ping = serde_json::to_string(&PingRequest::new(connect_id))?;

        let mut ping_ticker = tokio::time::interval_at(
            Instant::now() + heartbeat.interval,
            heartbeat.interval
        );
        ping_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let pong_deadline = tokio::time::sleep(heartbeat.deadline());
        tokio::pin!(pong_deadline);

        loop {
            tokio::select! {
                _ = wait_for_shutdown(shutdown) => {
                    let _ = sink.close().await;
                    return Ok(SessionEnd::Shutdown);
                }
                _ = &mut pong_deadline => {
                    warn!(deadline = ?heartbeat.deadline(), "Heartbeat deadline elapsed without pong");
                    return Ok(SessionEnd::PongTimeout);
                }
                _ = ping_ticker.tick() => {
                    sink.send(Message::Text(ping.clone().into())).await.context("Failed to send ping")?;
                    self.set_state(ConnectionState::AwaitingPong);
                }
                frame = source.next() => {
                    let message = match frame {
                        None => return Ok(SessionEnd::Closed),
                        Some(Err(e)) => return Err(anyhow::Error::new(e).context("WebSocket transport error")),
                        Some(Ok(message)) => message,
                    };

                    match message {
                        Message::Text(text) => match decode_frame(&text) {
                            Ok(Inbound::Quote(update)) => {
                                // Never wait on the engine here or the heartbeat stalls;
                                // the next tick for the pair supersedes a dropped one
                                match self.events.try_send(MarketEvent::Quote(update)) {
                                    Ok(()) => {}
                                    Err(TrySendError::Full(_)) => {
                                        let dropped = self.dropped_quotes.fetch_add(1, Ordering::Relaxed) + 1;
                                        if dropped % DROP_WARN_EVERY == 1 {
                                            warn!(dropped, "Engine queue full, dropping quotes");
                                        }
                                    }
                                    Err(TrySendError::Closed(_)) => {
                                        warn!("Quote pipeline closed, stopping feed");
                                        return Ok(SessionEnd::Shutdown);
                                    }
                                }
                            }
                            Ok(Inbound::Pong) => {
                                pong_deadline.as_mut().reset(Instant::now() + heartbeat.deadline());
                                self.set_state(ConnectionState::Open);
                            }
                            Ok(Inbound::Welcome) => debug!("Server welcome received"),
                            Ok(Inbound::Ack) => debug!("Subscription acknowledged"),
                            Ok(Inbound::ServerError(detail)) => warn!(%detail, "Server reported an error"),
                            Ok(Inbound::Ignored) => {}
                            Err(e) => warn!(error = %e, frame = preview(&text), "Discarding malformed frame"),
                        },
                        Message::Pong(_) => {
                            pong_deadline.as_mut().reset(Instant::now() + heartbeat.deadline());
                            self.set_state(ConnectionState::Open);
                        }
                        Message::Ping(data) => {
                            sink.send(Message::Pong(data)).await.context("Failed to answer ping")?;
                        }
                        Message::Close(frame) => {
                            info!(?frame, "Server closed the stream");
                            return Ok(SessionEnd::Closed);
                        }
                        Message::Binary(_) | Message::Frame(_) => {}
                    }
                }
            }
        }
    }
}
