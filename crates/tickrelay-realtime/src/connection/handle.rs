//! A single subscriber connection: transport handle plus lifecycle state.

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicI64, AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use tickrelay_core::types::ConnectionId;

use crate::error::RelayError;
use crate::message::OutboundFrame;

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ConnectionState {
    /// Transport accepted, registration not yet complete.
    Connecting = 0,
    /// Registered and eligible for broadcast.
    Open = 1,
    /// Close initiated; no longer eligible for broadcast.
    Closing = 2,
    /// Terminal. Transport released and removed from the registry.
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Why a connection left the `Open` state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum CloseReason {
    /// The peer closed the channel or the stream ended.
    PeerClosed,
    /// Nothing was received within the idle timeout.
    HeartbeatTimeout,
    /// A send to this connection failed or timed out.
    DeliveryFailure(String),
    /// The transport reported an error.
    TransportFault(String),
    /// The server is shutting down.
    Shutdown,
    /// Registration was refused.
    Rejected(String),
}

impl CloseReason {
    /// WebSocket close code the socket writer sends for this reason.
    pub fn close_code(&self) -> u16 {
        match self {
            Self::PeerClosed => 1000,
            Self::HeartbeatTimeout | Self::Shutdown | Self::Rejected(_) => 1001,
            Self::DeliveryFailure(_) | Self::TransportFault(_) => 1011,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => write!(f, "peer closed"),
            Self::HeartbeatTimeout => write!(f, "heartbeat timeout"),
            Self::DeliveryFailure(detail) => write!(f, "delivery failure: {detail}"),
            Self::TransportFault(detail) => write!(f, "transport fault: {detail}"),
            Self::Shutdown => write!(f, "server shutdown"),
            Self::Rejected(detail) => write!(f, "rejected: {detail}"),
        }
    }
}

/// One subscriber (or producer) connection.
///
/// The outbound queue and the cancellation token together form the
/// transport handle: frames are pushed into the queue and drained by the
/// socket writer, and cancelling the token makes the writer flush, send a
/// close frame, and release the socket.
#[derive(Debug)]
pub struct Connection {
    /// Unique connection ID.
    pub id: ConnectionId,
    sender: mpsc::Sender<OutboundFrame>,
    cancel: CancellationToken,
    state: AtomicU8,
    close_reason: OnceLock<CloseReason>,
    connected_at: DateTime<Utc>,
    /// Unix millis of the last successful send or received frame.
    last_activity: AtomicI64,
    created: Instant,
    /// Millis since `created` of the last frame received from the peer.
    last_seen: AtomicU64,
}

impl Connection {
    /// Creates a connection in the `Connecting` state.
    ///
    /// Returns the connection and the receiving end of its outbound queue,
    /// which the socket writer owns.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        Self::with_id(ConnectionId::new(), buffer)
    }

    /// Like [`Connection::new`] with a caller-chosen id.
    pub fn with_id(id: ConnectionId, buffer: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let now = Utc::now();
        let connection = Self {
            id,
            sender,
            cancel: CancellationToken::new(),
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            close_reason: OnceLock::new(),
            connected_at: now,
            last_activity: AtomicI64::new(now.timestamp_millis()),
            created: Instant::now(),
            last_seen: AtomicU64::new(0),
        };
        (connection, receiver)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the connection is eligible for broadcast.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// `Connecting → Open`. Returns `false` if the connection was not
    /// `Connecting` (e.g. it was closed during registration).
    pub(crate) fn promote(&self) -> bool {
        self.transition(ConnectionState::Connecting, ConnectionState::Open)
    }

    /// `Connecting | Open → Closing`, recording the reason.
    ///
    /// Returns the state the connection left, or `None` if it was already
    /// closing or closed.
    pub(crate) fn begin_close(&self, reason: CloseReason) -> Option<ConnectionState> {
        for from in [ConnectionState::Open, ConnectionState::Connecting] {
            if self.transition(from, ConnectionState::Closing) {
                let _ = self.close_reason.set(reason);
                self.cancel.cancel();
                return Some(from);
            }
        }
        None
    }

    /// `Closing → Closed`.
    pub(crate) fn mark_closed(&self) -> bool {
        self.transition(ConnectionState::Closing, ConnectionState::Closed)
    }

    fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Reason recorded when the connection started closing.
    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.close_reason.get()
    }

    /// Resolves once the connection starts closing.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Whether close has been requested.
    pub fn is_closing(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the socket writer has dropped the outbound queue.
    pub fn transport_released(&self) -> bool {
        self.sender.is_closed()
    }

    /// Queues a frame for the socket writer, waiting at most `timeout` for
    /// queue space.
    ///
    /// Fails with [`RelayError::DeliveryFailure`] when the connection is not
    /// `Connecting`/`Open`, the writer is gone, the queue stays full past
    /// the timeout, or the connection starts closing while waiting.
    pub async fn deliver(&self, frame: OutboundFrame, timeout: Duration) -> Result<(), RelayError> {
        match self.state() {
            ConnectionState::Connecting | ConnectionState::Open => {}
            state => {
                return Err(RelayError::delivery(
                    self.id,
                    format!("connection is {state:?}"),
                ));
            }
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                Err(RelayError::delivery(self.id, "connection closed during send"))
            }
            sent = self.sender.send_timeout(frame, timeout) => match sent {
                Ok(()) => {
                    self.touch();
                    Ok(())
                }
                Err(SendTimeoutError::Timeout(_)) => Err(RelayError::delivery(
                    self.id,
                    format!("outbound queue full for {}ms", timeout.as_millis()),
                )),
                Err(SendTimeoutError::Closed(_)) => {
                    Err(RelayError::delivery(self.id, "transport closed"))
                }
            },
        }
    }

    /// Queues a frame without waiting.
    ///
    /// A full queue is backpressure and fails with
    /// [`RelayError::DeliveryFailure`] like a closed transport does.
    pub fn try_deliver(&self, frame: OutboundFrame) -> Result<(), RelayError> {
        if !self.is_open() {
            return Err(RelayError::delivery(
                self.id,
                format!("connection is {:?}", self.state()),
            ));
        }

        match self.sender.try_send(frame) {
            Ok(()) => {
                self.touch();
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(RelayError::delivery(self.id, "outbound queue full")),
            Err(TrySendError::Closed(_)) => Err(RelayError::delivery(self.id, "transport closed")),
        }
    }

    /// When the connection was accepted.
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Records a successful send or a received frame.
    pub fn touch(&self) {
        self.last_activity
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Last successful send or received frame.
    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_activity.load(Ordering::Relaxed))
            .unwrap_or(self.connected_at)
    }

    /// Records a frame received from the peer (liveness evidence).
    pub fn record_seen(&self) {
        let elapsed = self.created.elapsed().as_millis() as u64;
        self.last_seen.store(elapsed, Ordering::Relaxed);
        self.touch();
    }

    /// Time since the peer was last heard from.
    pub fn idle_for(&self) -> Duration {
        let seen = Duration::from_millis(self.last_seen.load(Ordering::Relaxed));
        self.created.elapsed().saturating_sub(seen)
    }
}
