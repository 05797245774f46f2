//! Publishing, redelivery and consumption against an in-process broker.

use std::sync::Arc;
use std::time::Duration;

use chat_threads::application::dto::{RedeliveryReport, SendMessageRequest};
use chat_threads::application::services::MessageService;
use chat_threads::infrastructure::broker::{
    consume, BrokerError, ConsumeStats, ConsumerOptions, Delivery, MessageBroker, NotificationEvent,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::watch;

use crate::common::*;

fn options() -> ConsumerOptions {
    ConsumerOptions {
        prefetch: 2,
        poll_interval: Duration::from_millis(5),
    }
}

#[tokio::test]
async fn test_send_publishes_camel_case_payloads() {
    let app = TestApp::new();
    let sent = app
        .service
        .send_message(ALICE, SendMessageRequest::new(BOB.to_string(), "hello bob"))
        .await
        .unwrap();
    let id: i64 = sent.id.parse().unwrap();

    let messages = app.broker.queued("messages");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["messageId"], json!(id));
    assert_eq!(messages[0]["senderId"], json!(ALICE));
    assert_eq!(messages[0]["receiverId"], json!(BOB));
    assert_eq!(messages[0]["threadId"], json!("1001_1002"));
    assert_eq!(messages[0]["content"], json!("hello bob"));

    let notifications = app.broker.queued("notifications");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], json!("NEW_MESSAGE"));
    assert_eq!(notifications[0]["receiverId"], json!(BOB));
    assert_eq!(notifications[0]["message"], json!("hello bob"));
}

#[tokio::test]
async fn test_outage_does_not_lose_sends() {
    let app = TestApp::new();
    app.broker.set_down(true);

    let sent = app
        .service
        .send_message(ALICE, SendMessageRequest::new(BOB.to_string(), fake_content()))
        .await
        .unwrap();

    assert_eq!(app.repo.len(), 1);
    assert!(app.broker.queued("messages").is_empty());
    assert_eq!(app.service.cache().pending_publishes(), 2);

    app.broker.set_down(false);
    let report = app.service.flush_pending_publishes().await;

    assert_eq!(
        report,
        RedeliveryReport {
            delivered: 2,
            rescheduled: 0,
            dropped: 0,
        }
    );
    let id: i64 = sent.id.parse().unwrap();
    assert_eq!(app.broker.queued("messages")[0]["messageId"], json!(id));
    assert_eq!(app.broker.queued("notifications").len(), 1);
    assert_eq!(app.service.cache().pending_publishes(), 0);
}

#[tokio::test]
async fn test_long_outage_drops_after_max_attempts() {
    let app = TestApp::new();
    app.broker.set_down(true);
    app.service
        .send_message(ALICE, SendMessageRequest::new(BOB.to_string(), fake_content()))
        .await
        .unwrap();

    let first = app.service.flush_pending_publishes().await;
    let second = app.service.flush_pending_publishes().await;

    assert_eq!(first.rescheduled, 2);
    assert_eq!(second.dropped, 2);
    assert_eq!(app.service.cache().pending_publishes(), 0);
    assert_eq!(app.repo.len(), 1);
}

#[tokio::test]
async fn test_consumer_acks_every_notification() {
    let app = TestApp::new();
    for _ in 0..3 {
        app.service
            .send_message(ALICE, SendMessageRequest::new(BOB.to_string(), fake_content()))
            .await
            .unwrap();
    }

    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(consume(
        app.broker.clone(),
        "notifications".to_string(),
        options(),
        |delivery: Delivery| async move { delivery.json::<NotificationEvent>().map(|_| ()) },
        rx,
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(true).unwrap();
    let stats = task.await.unwrap();

    assert_eq!(stats, ConsumeStats { acked: 3, rejected: 0 });
    assert!(app.broker.queued("notifications").is_empty());
    assert_eq!(app.broker.in_flight("notifications"), 0);
}

#[tokio::test]
async fn test_rejected_delivery_returns_on_redeclare() {
    let app = TestApp::new();
    app.service
        .send_message(ALICE, SendMessageRequest::new(BOB.to_string(), fake_content()))
        .await
        .unwrap();

    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(consume(
        app.broker.clone(),
        "notifications".to_string(),
        options(),
        |_: Delivery| async { Err::<(), _>(BrokerError::Rejected("push gateway offline".into())) },
        rx,
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();
    let stats = task.await.unwrap();

    assert_eq!(stats, ConsumeStats { acked: 0, rejected: 1 });
    assert_eq!(app.broker.in_flight("notifications"), 1);

    app.broker.declare_queue("notifications").await.unwrap();

    assert_eq!(app.broker.in_flight("notifications"), 0);
    assert_eq!(app.broker.queued("notifications").len(), 1);
}

#[tokio::test]
async fn test_consumer_survives_outage() {
    let broker = Arc::new(RecordingBroker::new());
    broker.set_down(true);

    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(consume(
        broker.clone(),
        "notifications".to_string(),
        options(),
        |_: Delivery| async { Ok::<(), BrokerError>(()) },
        rx,
    ));

    tokio::time::sleep(Duration::from_millis(20)).await;
    broker.set_down(false);
    assert!(broker.publish("notifications", &json!({"type": "NEW_MESSAGE"})).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();

    assert_eq!(task.await.unwrap().acked, 1);
}
