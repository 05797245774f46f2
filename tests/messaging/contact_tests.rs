//! Contact graph and cache warm-up across service instances.

use chat_threads::application::dto::SendMessageRequest;
use chat_threads::application::services::MessageService;
use pretty_assertions::assert_eq;

use crate::common::*;

async fn send(app: &TestApp, from: i64, to: i64) {
    app.service
        .send_message(from, SendMessageRequest::new(to.to_string(), fake_content()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_contacts_are_undirected() {
    let app = TestApp::new();
    send(&app, ALICE, BOB).await;
    send(&app, CAROL, BOB).await;
    send(&app, BOB, ALICE).await;

    assert_eq!(app.service.get_contacts(BOB), vec![ALICE, CAROL]);
    assert_eq!(app.service.get_contacts(ALICE), vec![BOB]);
    assert!(app.service.get_contacts(DAVE).is_empty());
}

#[tokio::test]
async fn test_shortest_conversation_path() {
    let app = TestApp::new();
    send(&app, ALICE, BOB).await;
    send(&app, BOB, CAROL).await;

    assert_eq!(
        app.service.find_conversation_path(ALICE, CAROL),
        Some(vec![ALICE, BOB, CAROL])
    );
    assert_eq!(app.service.find_conversation_path(CAROL, ALICE), Some(vec![CAROL, BOB, ALICE]));
    assert_eq!(app.service.find_conversation_path(ALICE, DAVE), None);

    send(&app, ALICE, CAROL).await;
    assert_eq!(app.service.find_conversation_path(ALICE, CAROL), Some(vec![ALICE, CAROL]));
}

#[tokio::test]
async fn test_notifications_drain_in_send_order() {
    let app = TestApp::new();
    send(&app, ALICE, BOB).await;
    send(&app, CAROL, BOB).await;
    send(&app, BOB, DAVE).await;

    let senders: Vec<i64> = app
        .service
        .drain_notifications(2)
        .iter()
        .map(|n| n.sender_id)
        .collect();
    assert_eq!(senders, vec![ALICE, CAROL]);

    let rest = app.service.drain_notifications(10);
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].receiver_id, DAVE);
    assert!(app.service.drain_notifications(10).is_empty());
}

#[tokio::test]
async fn test_restart_warms_caches_from_store() {
    let before = TestApp::new();
    send(&before, ALICE, BOB).await;
    send(&before, BOB, CAROL).await;
    send(&before, CAROL, DAVE).await;

    let after = TestApp::with_repo(before.repo.clone());
    assert!(after.service.get_contacts(BOB).is_empty());

    let replayed = after.service.warm_caches(100).await.unwrap();

    assert_eq!(replayed, 3);
    assert_eq!(after.service.get_contacts(BOB), vec![ALICE, CAROL]);
    assert_eq!(
        after.service.find_conversation_path(ALICE, DAVE),
        Some(vec![ALICE, BOB, CAROL, DAVE])
    );
    let newest: Vec<String> = after
        .service
        .recent_activity(2)
        .into_iter()
        .map(|m| m.sender_id)
        .collect();
    assert_eq!(newest, vec![CAROL.to_string(), BOB.to_string()]);
}

#[tokio::test]
async fn test_warm_start_respects_limit() {
    let before = TestApp::new();
    send(&before, ALICE, BOB).await;
    send(&before, CAROL, DAVE).await;

    let after = TestApp::with_repo(before.repo.clone());
    let replayed = after.service.warm_caches(1).await.unwrap();

    assert_eq!(replayed, 1);
    assert_eq!(after.service.get_contacts(CAROL), vec![DAVE]);
    assert!(after.service.get_contacts(ALICE).is_empty());
}
