//! End-to-end relay tests over real WebSockets

use callrelay::domain::agent::StaticAgent;
use callrelay::interface::api::{build_router, AppState};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_relay(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state, None);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}{path}")).await.unwrap();
    client
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection ended")
            .unwrap();
        if let Message::Text(text) = message {
            return text;
        }
    }
}

async fn next_json(client: &mut Client) -> Value {
    serde_json::from_str(&next_text(client).await).unwrap()
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_session_config_and_ping_pong() {
    let state = AppState::new(Arc::new(StaticAgent::default()));
    let addr = start_relay(state.clone()).await;

    let mut observer = connect(addr, "/realtime").await;
    let registry = Arc::clone(&state.registry);
    wait_until(|| {
        let registry = Arc::clone(&registry);
        async move { registry.subscriber_count().await == 1 }
    })
    .await;

    let mut session = connect(addr, "/llm-websocket/abc123").await;
    let config = next_json(&mut session).await;
    assert_eq!(config["response_type"], "config");
    assert_eq!(config["response_id"], 1);
    assert_eq!(config["config"]["call_details"], true);

    session
        .send(Message::Text(
            json!({"interaction_type": "ping_pong", "timestamp": 42}).to_string(),
        ))
        .await
        .unwrap();
    let pong = next_json(&mut session).await;
    assert_eq!(pong, json!({"response_type": "ping_pong", "timestamp": 42}));

    let nothing = tokio::time::timeout(Duration::from_millis(150), observer.next()).await;
    assert!(nothing.is_err(), "observer should not see ping traffic");
}

#[tokio::test]
async fn test_update_only_reaches_observer_verbatim() {
    let state = AppState::new(Arc::new(StaticAgent::default()));
    let addr = start_relay(state.clone()).await;

    let mut observer = connect(addr, "/realtime").await;
    let registry = Arc::clone(&state.registry);
    wait_until(|| {
        let registry = Arc::clone(&registry);
        async move { registry.subscriber_count().await == 1 }
    })
    .await;

    let mut session = connect(addr, "/llm-websocket/abc123").await;
    next_json(&mut session).await;

    let raw = r#"{"interaction_type":"update_only","text":"hello"}"#;
    session.send(Message::Text(raw.to_string())).await.unwrap();

    assert_eq!(next_text(&mut observer).await, raw);
    let extra = tokio::time::timeout(Duration::from_millis(150), observer.next()).await;
    assert!(extra.is_err(), "observer should receive exactly one message");
}

#[tokio::test]
async fn test_call_details_greeting_from_configured_agent() {
    let agent = StaticAgent::new(Some("Welcome to the bank.".to_string()));
    let state = AppState::new(Arc::new(agent));
    let addr = start_relay(state).await;

    let mut session = connect(addr, "/llm-websocket/abc123").await;
    next_json(&mut session).await;

    session
        .send(Message::Text(
            json!({
                "interaction_type": "call_details",
                "call": {"call_id": "abc123", "from_number": "+14155550123"}
            })
            .to_string(),
        ))
        .await
        .unwrap();

    let greeting = next_json(&mut session).await;
    assert_eq!(greeting["response_type"], "response");
    assert_eq!(greeting["content"], "Welcome to the bank.");
    assert_eq!(greeting["content_complete"], true);
}

#[tokio::test]
async fn test_reconnect_supersedes_previous_session() {
    let state = AppState::new(Arc::new(StaticAgent::default()));
    let addr = start_relay(state.clone()).await;

    let mut first = connect(addr, "/llm-websocket/abc123").await;
    next_json(&mut first).await;

    let mut second = connect(addr, "/llm-websocket/abc123").await;
    next_json(&mut second).await;

    // The first connection is closed by the relay
    loop {
        match tokio::time::timeout(Duration::from_secs(2), first.next())
            .await
            .expect("first session should be closed")
        {
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
            Some(Ok(_)) => continue,
        }
    }

    second
        .send(Message::Text(
            json!({"interaction_type": "ping_pong", "timestamp": 7}).to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(next_json(&mut second).await["timestamp"], 7);

    let sessions = Arc::clone(&state.sessions);
    wait_until(|| {
        let sessions = Arc::clone(&sessions);
        async move { sessions.active_count().await == 1 }
    })
    .await;
}

#[tokio::test]
async fn test_observer_disconnect_deregisters() {
    let state = AppState::new(Arc::new(StaticAgent::default()));
    let addr = start_relay(state.clone()).await;

    let mut observer = connect(addr, "/realtime").await;
    let registry = Arc::clone(&state.registry);
    wait_until(|| {
        let registry = Arc::clone(&registry);
        async move { registry.subscriber_count().await == 1 }
    })
    .await;

    observer.close(None).await.unwrap();

    let registry = Arc::clone(&state.registry);
    wait_until(|| {
        let registry = Arc::clone(&registry);
        async move { registry.subscriber_count().await == 0 }
    })
    .await;
}
