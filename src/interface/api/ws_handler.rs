//! Observer WebSocket endpoint (`/realtime`)
//!
//! Dashboards connect here to receive every broadcast. Anything they send
//! is read and discarded; the read loop only exists to notice disconnects.

use super::app_state::AppState;
use crate::infrastructure::broadcast::{ObserverHandle, SubscriberRegistry};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

/// WebSocket handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sender, receiver) = socket.split();
    serve_observer(state.registry, state.observer_queue_capacity, receiver, sender).await;
}

/// Register an observer, pump broadcasts to it until either direction
/// stops or the registry evicts it, then deregister it.
pub async fn serve_observer<S, E, K>(
    registry: Arc<SubscriberRegistry>,
    queue_capacity: usize,
    mut receiver: S,
    mut sender: K,
) where
    S: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Send + 'static,
    K: Sink<Message> + Unpin + Send + 'static,
{
    let (handle, mut rx) = ObserverHandle::channel(queue_capacity);
    let observer_id = handle.id();
    registry.register(Arc::clone(&handle)).await;

    info!(observer_id = %observer_id, "Observer connected");

    // Spawn a task to forward broadcasts to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sender.send(Message::Text(message.to_string())).await.is_err() {
                debug!(observer_id = %observer_id, "Failed to send to observer");
                break;
            }
        }
    });

    // Spawn a task to drain whatever the client sends
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => {
                    debug!(observer_id = %observer_id, "Observer requested close");
                    break;
                }
                Message::Text(text) => {
                    debug!(observer_id = %observer_id, len = text.len(), "Ignoring observer message");
                }
                _ => {}
            }
        }
    });

    // Wait for either task to finish, or for the registry to give up on us
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
        _ = handle.evicted() => {
            info!(observer_id = %observer_id, "Observer fell behind, closing connection");
            send_task.abort();
            recv_task.abort();
        }
    }

    registry.deregister(observer_id).await;
    info!(observer_id = %observer_id, "Observer disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc::{channel, unbounded};
    use std::convert::Infallible;
    use std::time::Duration;

    async fn wait_for_count(registry: &SubscriberRegistry, expected: usize) {
        for _ in 0..100 {
            if registry.subscriber_count().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("registry never reached {expected} observers");
    }

    #[tokio::test]
    async fn test_observer_receives_broadcasts_until_disconnect() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (client_tx, client_rx) = unbounded::<Result<Message, Infallible>>();
        let (sink, mut delivered) = unbounded::<Message>();

        let observer = tokio::spawn(serve_observer(Arc::clone(&registry), 8, client_rx, sink));
        wait_for_count(&registry, 1).await;

        registry.broadcast(r#"{"event":"call_started"}"#).await;
        match tokio::time::timeout(Duration::from_secs(2), delivered.next()).await.unwrap() {
            Some(Message::Text(text)) => assert_eq!(text, r#"{"event":"call_started"}"#),
            other => panic!("unexpected delivery: {:?}", other),
        }

        // Inbound chatter is ignored
        client_tx
            .unbounded_send(Ok(Message::Text("hello?".to_string())))
            .unwrap();

        client_tx.close_channel();
        observer.await.unwrap();
        assert_eq!(registry.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_broken_sender_deregisters_observer() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (_client_tx, client_rx) = unbounded::<Result<Message, Infallible>>();
        let (sink, delivered) = unbounded::<Message>();
        drop(delivered);

        let observer = tokio::spawn(serve_observer(Arc::clone(&registry), 8, client_rx, sink));
        wait_for_count(&registry, 1).await;

        registry.broadcast("anything").await;
        tokio::time::timeout(Duration::from_secs(2), observer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(registry.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_lagging_observer_is_disconnected_not_starved() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (_client_tx, client_rx) = unbounded::<Result<Message, Infallible>>();
        // Nobody reads this socket, so the writer stalls after one frame
        let (sink, mut delivered) = channel::<Message>(0);

        let observer = tokio::spawn(serve_observer(Arc::clone(&registry), 4, client_rx, sink));
        wait_for_count(&registry, 1).await;

        for i in 0..20 {
            registry.broadcast(format!("m{i}")).await;
        }

        tokio::time::timeout(Duration::from_secs(2), observer)
            .await
            .expect("lagging observer was never disconnected")
            .unwrap();
        assert_eq!(registry.subscriber_count().await, 0);

        // The client sees an in-order prefix and then the connection ends
        let mut received = Vec::new();
        while let Some(message) = tokio::time::timeout(Duration::from_secs(2), delivered.next())
            .await
            .unwrap()
        {
            match message {
                Message::Text(text) => received.push(text),
                other => panic!("unexpected delivery: {:?}", other),
            }
        }
        assert!(received.len() < 20);
        for (i, text) in received.iter().enumerate() {
            assert_eq!(text, &format!("m{i}"));
        }
    }
}
