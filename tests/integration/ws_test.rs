//! Integration tests for WebSocket connections and fan-out.

mod helpers;

use axum::http::StatusCode;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use helpers::{TestServer, WAIT, next_json, test_config};

const EURUSD: &str = r#"{"data":[{"symbol":"EURUSD","bid":1.0842,"ask":1.0844}]}"#;

#[tokio::test]
async fn test_broadcast_reaches_every_subscriber() {
    let server = TestServer::start().await;
    let mut s1 = server.connect().await;
    let mut s2 = server.connect().await;
    server.wait_for_clients(2).await;

    let response = server.post_ticker(EURUSD).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["clients_notified"], 2);

    for client in [&mut s1, &mut s2] {
        let tick = next_json(client).await.expect("tick");
        assert_eq!(tick["data"][0]["symbol"], "EURUSD");
        assert!(tick["server_timestamp"].is_string());
        assert_eq!(tick["server_received"], true);
    }

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_ws_path_also_upgrades() {
    let server = TestServer::start().await;

    let (mut client, _) = tokio_tungstenite::connect_async(server.ws_url("/ws"))
        .await
        .unwrap();
    let welcome = next_json(&mut client).await.unwrap();
    assert_eq!(welcome["status"], "connected");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_abrupt_disconnect_is_removed() {
    let server = TestServer::start().await;
    let s1 = server.connect().await;
    let mut s2 = server.connect().await;
    server.wait_for_clients(2).await;

    drop(s1);
    server.wait_for_clients(1).await;

    let response = server.post_ticker(EURUSD).await;
    assert_eq!(response.body["clients_notified"], 1);
    assert_eq!(response.body["delivery"]["failed"], 0);
    assert_eq!(
        next_json(&mut s2).await.unwrap()["data"][0]["symbol"],
        "EURUSD"
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_streamed_update_skips_sender() {
    let server = TestServer::start().await;
    let mut producer = server.connect().await;
    let mut subscriber = server.connect().await;
    server.wait_for_clients(2).await;

    producer.send(Message::text(EURUSD)).await.unwrap();

    let tick = next_json(&mut subscriber).await.unwrap();
    assert_eq!(tick["data"][0]["symbol"], "EURUSD");

    // The producer's next frame is the reply to a bad frame, not its own tick.
    producer.send(Message::text("not json")).await.unwrap();
    let reply = next_json(&mut producer).await.unwrap();
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "MALFORMED_ENCODING");
    assert_eq!(server.state.realtime.connected_clients(), 2);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_during_broadcast_closes_everyone() {
    let server = TestServer::start().await;
    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(server.connect().await);
    }
    server.wait_for_clients(3).await;

    let engine = server.state.realtime.clone();
    let router = server.router();
    let post = async move { helpers::send(&router, "POST", "/api/ticker", Some(EURUSD)).await };
    let (response, stopped) = tokio::join!(post, server.stop());
    stopped.unwrap();
    assert!(matches!(
        response.status,
        StatusCode::OK | StatusCode::SERVICE_UNAVAILABLE
    ));

    assert_eq!(engine.connected_clients(), 0);
    assert!(!engine.is_accepting());
    let report = engine.shutdown().await;
    assert_eq!(report.closed, 3);
    assert!(!report.timed_out);

    for mut client in clients {
        // Either the tick then a close, or just a close.
        let mut saw_close = false;
        while let Ok(Some(message)) = tokio::time::timeout(WAIT, client.next()).await {
            match message {
                Ok(Message::Text(text)) => assert!(text.as_str().contains("EURUSD")),
                Ok(Message::Close(frame)) => {
                    if let Some(frame) = frame {
                        assert_eq!(u16::from(frame.code), 1001);
                    }
                    saw_close = true;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        assert!(saw_close, "client never saw a close frame");
    }
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    let mut config = test_config();
    config.realtime.max_message_bytes = 1024;
    let server = TestServer::start_with(config).await;
    let mut producer = server.connect().await;
    server.wait_for_clients(1).await;

    let frame = format!(r#"{{"data":[{{"symbol":"{}"}}]}}"#, "X".repeat(4096));
    let _ = producer.send(Message::text(frame)).await;

    assert!(next_json(&mut producer).await.is_none());
    server.wait_for_clients(0).await;

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_upgrade_refused_while_shutting_down() {
    let server = TestServer::start().await;
    server.state.realtime.shutdown().await;

    match tokio_tungstenite::connect_async(server.ws_url("/")).await {
        Err(WsError::Http(response)) => {
            assert_eq!(response.status().as_u16(), 503);
        }
        other => panic!("expected HTTP 503, got {other:?}"),
    }

    server.stop().await.unwrap();
}
