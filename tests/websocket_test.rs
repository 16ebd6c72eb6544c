//! WebSocket status channel against a live server

mod common;

use common::{app_state, Scripted};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve() -> (String, autotrader::AppState) {
    let state = app_state(vec![Arc::new(Scripted::new("momentum"))]);
    let _forwarder = state.notifier.spawn_forwarder();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = autotrader::app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("ws://{}/ws", addr), state)
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_status_on_connect() {
    let (url, _state) = serve().await;
    let (mut client, _) = connect_async(url.as_str()).await.unwrap();

    let msg = next_json(&mut client).await;
    assert_eq!(msg["type"], "bot_status");
    assert_eq!(msg["status"], "Inactive");
    assert_eq!(msg["isAnalyzing"], false);
}

#[tokio::test]
async fn test_transitions_are_pushed() {
    let (url, state) = serve().await;
    let (mut client, _) = connect_async(url.as_str()).await.unwrap();
    next_json(&mut client).await;

    state.scheduler.start("u1", 0.1, "momentum", 5).unwrap();
    let msg = next_json(&mut client).await;
    assert_eq!(msg["status"], "Active");

    state.scheduler.stop().unwrap();
    let msg = next_json(&mut client).await;
    assert_eq!(msg["status"], "Inactive");
}

#[tokio::test]
async fn test_get_status_and_bad_messages() {
    let (url, _state) = serve().await;
    let (mut client, _) = connect_async(url.as_str()).await.unwrap();
    next_json(&mut client).await;

    client
        .send(Message::Text(r#"{"type":"get_status"}"#.to_string()))
        .await
        .unwrap();
    let msg = next_json(&mut client).await;
    assert_eq!(msg["type"], "bot_status");

    client
        .send(Message::Text(r#"{"type":"subscribe"}"#.to_string()))
        .await
        .unwrap();
    let msg = next_json(&mut client).await;
    assert_eq!(msg["type"], "error");
    assert!(msg["error"].as_str().unwrap().starts_with("Invalid message"));
}

#[tokio::test]
async fn test_disconnected_clients_are_dropped() {
    let (url, state) = serve().await;
    let (mut client, _) = connect_async(url.as_str()).await.unwrap();
    next_json(&mut client).await;
    assert_eq!(state.notifier.client_count(), 1);

    client.close(None).await.unwrap();
    for _ in 0..50 {
        if state.notifier.client_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state.notifier.client_count(), 0);
}
