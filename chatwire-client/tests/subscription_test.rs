//! Subscription and message dispatch integration tests

mod common;

use common::{fast_config, message_frame, wait_until, MockBroker};
use chatwire_client::ChatClient;
use chatwire_core::{Message, UNKNOWN_SENDER};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn test_subscribe_sends_frame_and_registers_topic() {
    let mut broker = MockBroker::start().await;
    let client = ChatClient::new(fast_config()).unwrap();

    assert!(client.connect(&broker.url(), None, None).await.unwrap());
    let mut conn = broker.accept().await;

    let sub = client.subscribe("general").await.expect("subscribe failed");
    assert_eq!(sub.topic(), "general");
    assert_eq!(client.subscriptions(), vec!["general".to_string()]);

    let frame: Value = serde_json::from_str(&conn.next_frame().await).unwrap();
    assert_eq!(frame["type"], "subscribe");
    assert_eq!(frame["topic"], "general");

    client.disconnect().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn test_subscribe_is_idempotent_single_frame() {
    let mut broker = MockBroker::start().await;
    let client = ChatClient::new(fast_config()).unwrap();

    assert!(client.connect(&broker.url(), None, None).await.unwrap());
    let mut conn = broker.accept().await;

    let first = client.subscribe("general").await.unwrap();
    let second = client.subscribe("general").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(client.subscriptions().len(), 1);

    // Exactly one subscribe frame reaches the broker.
    let frame: Value = serde_json::from_str(&conn.next_frame().await).unwrap();
    assert_eq!(frame["type"], "subscribe");
    assert!(conn.try_next_frame(Duration::from_millis(200)).await.is_none());

    client.disconnect().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn test_unsubscribe_sends_frame_and_clears_topic() {
    let mut broker = MockBroker::start().await;
    let client = ChatClient::new(fast_config()).unwrap();

    assert!(client.connect(&broker.url(), None, None).await.unwrap());
    let mut conn = broker.accept().await;

    client.subscribe("general").await.unwrap();
    let _subscribe = conn.next_frame().await;

    client.unsubscribe("general").await;
    let frame: Value = serde_json::from_str(&conn.next_frame().await).unwrap();
    assert_eq!(frame["type"], "unsubscribe");
    assert_eq!(frame["topic"], "general");
    assert!(client.subscriptions().is_empty());

    client.disconnect().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn test_subscription_handle_cancel() {
    let mut broker = MockBroker::start().await;
    let client = ChatClient::new(fast_config()).unwrap();

    assert!(client.connect(&broker.url(), None, None).await.unwrap());
    let mut conn = broker.accept().await;

    let sub = client.subscribe("random").await.unwrap();
    let _subscribe = conn.next_frame().await;

    sub.cancel().await;
    let frame: Value = serde_json::from_str(&conn.next_frame().await).unwrap();
    assert_eq!(frame["type"], "unsubscribe");
    assert!(client.subscriptions().is_empty());

    client.disconnect().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn test_inbound_message_reaches_all_handlers() {
    let mut broker = MockBroker::start().await;
    let client = ChatClient::new(fast_config()).unwrap();

    let received: Arc<Mutex<Vec<Message>>> = Arc::new(Mutex::new(Vec::new()));
    let count = Arc::new(AtomicUsize::new(0));

    let received_clone = Arc::clone(&received);
    client.on_message(move |msg| {
        received_clone.lock().unwrap().push(msg);
    });
    let count_clone = Arc::clone(&count);
    client.on_message(move |_| {
        count_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert!(client.connect(&broker.url(), None, None).await.unwrap());
    let mut conn = broker.accept().await;

    client.subscribe("general").await.unwrap();
    let _subscribe = conn.next_frame().await;

    let envelope = serde_json::json!({
        "name": "bob",
        "message": "hi there",
        "timestamp": "2026-08-30T12:00:00Z",
        "userId": "user-bob12345",
    })
    .to_string();
    conn.send_text(message_frame("general", &envelope)).await;

    assert!(
        wait_until(|| count.load(Ordering::SeqCst) == 1, Duration::from_secs(2)).await
    );
    let messages = received.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].username, "bob");
    assert_eq!(messages[0].content, "hi there");
    assert_eq!(messages[0].topic, "general");
    assert_eq!(messages[0].user_id, "user-bob12345");
    drop(messages);

    client.disconnect().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn test_plain_text_payload_falls_back_to_unknown_sender() {
    let mut broker = MockBroker::start().await;
    let client = ChatClient::new(fast_config()).unwrap();

    let received: Arc<Mutex<Vec<Message>>> = Arc::new(Mutex::new(Vec::new()));
    let received_clone = Arc::clone(&received);
    client.on_message(move |msg| {
        received_clone.lock().unwrap().push(msg);
    });

    assert!(client.connect(&broker.url(), None, None).await.unwrap());
    let mut conn = broker.accept().await;

    client.subscribe("general").await.unwrap();
    let _subscribe = conn.next_frame().await;

    conn.send_text(message_frame("general", "not json at all")).await;

    let received_check = Arc::clone(&received);
    assert!(
        wait_until(move || !received_check.lock().unwrap().is_empty(), Duration::from_secs(2))
            .await
    );
    let messages = received.lock().unwrap();
    assert_eq!(messages[0].username, UNKNOWN_SENDER);
    assert_eq!(messages[0].content, "not json at all");
    drop(messages);

    client.disconnect().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn test_removed_handler_no_longer_fires() {
    let mut broker = MockBroker::start().await;
    let client = ChatClient::new(fast_config()).unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = Arc::clone(&count);
    let keep = Arc::new(AtomicUsize::new(0));
    let keep_clone = Arc::clone(&keep);

    let removed_id = client.on_message(move |_| {
        count_clone.fetch_add(1, Ordering::SeqCst);
    });
    client.on_message(move |_| {
        keep_clone.fetch_add(1, Ordering::SeqCst);
    });
    assert!(client.remove_message_handler(removed_id));

    assert!(client.connect(&broker.url(), None, None).await.unwrap());
    let mut conn = broker.accept().await;

    client.subscribe("general").await.unwrap();
    let _subscribe = conn.next_frame().await;

    conn.send_text(message_frame("general", "payload")).await;
    assert!(
        wait_until(|| keep.load(Ordering::SeqCst) == 1, Duration::from_secs(2)).await
    );
    assert_eq!(count.load(Ordering::SeqCst), 0);

    client.disconnect().await;
    broker.shutdown().await;
}
