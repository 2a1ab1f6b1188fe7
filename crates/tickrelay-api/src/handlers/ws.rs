//! WebSocket upgrade handler and per-connection socket pump.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Extension;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tickrelay_realtime::message::{InboundFrame, OutboundFrame};
use tickrelay_realtime::{CloseReason, Connection, RealtimeEngine};

use crate::error::ApiError;
use crate::handlers::health;
use crate::state::AppState;

/// GET / and GET /ws
///
/// Upgrades to a WebSocket when asked to; a plain GET gets the health
/// summary instead.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    peer: Option<Extension<ConnectInfo<SocketAddr>>>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match upgrade {
        Ok(ws) => ws,
        Err(_) => return health::health(State(state)).await.into_response(),
    };

    if !state.realtime.is_accepting() {
        return ApiError::ShuttingDown.into_response();
    }

    let peer = peer.map(|Extension(ConnectInfo(addr))| addr);
    let engine = state.realtime.clone();
    let send_timeout = state.config.realtime.send_timeout();

    ws.max_message_size(state.config.realtime.max_message_bytes)
        .on_upgrade(move |socket| {
            let session = run_session(engine.clone(), socket, peer, send_timeout);
            engine.track(session)
        })
}

/// Drives one upgraded socket until the connection closes.
async fn run_session(
    engine: Arc<RealtimeEngine>,
    mut socket: WebSocket,
    peer: Option<SocketAddr>,
    send_timeout: Duration,
) {
    let (connection, outbound) = match engine.open_connection().await {
        Ok(pair) => pair,
        Err(err) => {
            warn!(error = %err, "WebSocket connection refused");
            let reason = CloseReason::Rejected(err.to_string());
            let _ = socket.send(close_message(&reason)).await;
            return;
        }
    };

    info!(
        conn_id = %connection.id,
        peer = ?peer,
        "WebSocket connection established"
    );

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_loop(
        engine.clone(),
        connection.clone(),
        outbound,
        sink,
        send_timeout,
    ));
    let heartbeat = engine.spawn_heartbeat(connection.clone());

    loop {
        let next = tokio::select! {
            biased;
            _ = connection.closed() => break,
            next = stream.next() => next,
        };

        if let Some(reason) = engine.handle_frame(&connection, inbound_frame(next)).await {
            engine.close_connection(&connection, reason);
            break;
        }
    }

    let _ = writer.await;
    let _ = heartbeat.await;
    drop(stream);
    engine.release_connection(&connection);

    debug!(
        conn_id = %connection.id,
        reason = ?connection.close_reason(),
        "WebSocket session ended"
    );
}

/// Maps a socket read to a transport event.
fn inbound_frame(next: Option<Result<Message, axum::Error>>) -> InboundFrame {
    match next {
        None | Some(Ok(Message::Close(_))) => InboundFrame::Close,
        Some(Err(err)) => InboundFrame::Fault(err.to_string()),
        Some(Ok(Message::Text(text))) => InboundFrame::Text(text.as_str().to_owned()),
        Some(Ok(Message::Binary(data))) => {
            InboundFrame::Text(String::from_utf8_lossy(&data).into_owned())
        }
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => InboundFrame::Heartbeat,
    }
}

/// Moves frames from the connection's queue onto the socket.
///
/// When the connection starts closing, frames already queued are flushed,
/// then a close frame carrying the close reason is sent.
async fn write_loop(
    engine: Arc<RealtimeEngine>,
    connection: Arc<Connection>,
    mut outbound: mpsc::Receiver<OutboundFrame>,
    mut sink: SplitSink<WebSocket, Message>,
    send_timeout: Duration,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = connection.closed() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        if let Err(reason) = send_message(&mut sink, outbound_message(frame), send_timeout).await {
            engine.close_connection(&connection, CloseReason::TransportFault(reason));
            return;
        }
    }

    while let Ok(frame) = outbound.try_recv() {
        if send_message(&mut sink, outbound_message(frame), send_timeout)
            .await
            .is_err()
        {
            return;
        }
    }

    let reason = connection
        .close_reason()
        .cloned()
        .unwrap_or(CloseReason::PeerClosed);
    let _ = send_message(&mut sink, close_message(&reason), send_timeout).await;
    let _ = tokio::time::timeout(send_timeout, sink.close()).await;
}

fn outbound_message(frame: OutboundFrame) -> Message {
    match frame {
        OutboundFrame::Text(text) => Message::Text(text.as_ref().into()),
        OutboundFrame::Ping => Message::Ping(Bytes::new()),
    }
}

fn close_message(reason: &CloseReason) -> Message {
    Message::Close(Some(CloseFrame {
        code: reason.close_code(),
        reason: reason.to_string().into(),
    }))
}

async fn send_message(
    sink: &mut SplitSink<WebSocket, Message>,
    message: Message,
    timeout: Duration,
) -> Result<(), String> {
    match tokio::time::timeout(timeout, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!("socket write timed out after {}ms", timeout.as_millis())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_mapping() {
        assert_eq!(inbound_frame(None), InboundFrame::Close);
        assert_eq!(
            inbound_frame(Some(Ok(Message::Text("{}".into())))),
            InboundFrame::Text("{}".to_string())
        );
        assert_eq!(
            inbound_frame(Some(Ok(Message::Binary(Bytes::from_static(b"{\"data\":[]}"))))),
            InboundFrame::Text("{\"data\":[]}".to_string())
        );
        assert_eq!(
            inbound_frame(Some(Ok(Message::Pong(Bytes::new())))),
            InboundFrame::Heartbeat
        );
    }

    #[test]
    fn test_close_frame_carries_reason_code() {
        let Message::Close(Some(frame)) = close_message(&CloseReason::Shutdown) else {
            panic!("expected close frame");
        };
        assert_eq!(frame.code, 1001);
        assert_eq!(frame.reason.as_str(), "server shutdown");
    }
}
