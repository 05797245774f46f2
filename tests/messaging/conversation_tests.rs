//! Send and view flows.

use chat_threads::application::dto::{SendMessageRequest, ViewMessagesQuery};
use chat_threads::application::services::{MessageError, MessageService};
use chat_threads::domain::ThreadId;
use pretty_assertions::assert_eq;

use crate::common::*;

#[tokio::test]
async fn test_view_returns_message_marked_read() {
    let app = TestApp::new();
    let content = fake_content();
    let sent = app
        .service
        .send_message(ALICE, SendMessageRequest::new(BOB.to_string(), content.clone()))
        .await
        .unwrap();

    assert!(app.service.get_unread_count(BOB).await.unwrap() >= 1);

    let page = app
        .service
        .view_messages(BOB, ViewMessagesQuery::new(ALICE.to_string()))
        .await
        .unwrap();

    let viewed = &page.messages[0].message;
    assert_eq!(viewed.id, sent.id);
    assert_eq!(viewed.content, content);
    assert!(viewed.is_read);
    assert!(viewed.read_at.is_some());
    assert_eq!(app.service.get_unread_count(BOB).await.unwrap(), 0);
}

#[tokio::test]
async fn test_viewed_messages_leave_the_notification_queue() {
    let app = TestApp::new();
    app.service
        .send_message(ALICE, SendMessageRequest::new(BOB.to_string(), fake_content()))
        .await
        .unwrap();
    assert_eq!(app.service.cache().pending_for(BOB).len(), 1);

    app.service
        .view_messages(BOB, ViewMessagesQuery::new(ALICE.to_string()))
        .await
        .unwrap();

    assert!(app.service.cache().pending_for(BOB).is_empty());
    assert!(app.service.drain_notifications(10).is_empty());
    assert!(app.service.recent_activity(1)[0].is_read);
}

#[tokio::test]
async fn test_thread_id_is_symmetric() {
    assert_eq!(
        ThreadId::for_participants("u1", "u2"),
        ThreadId::for_participants("u2", "u1")
    );

    let app = TestApp::new();
    let there = app
        .service
        .send_message(ALICE, SendMessageRequest::new(BOB.to_string(), fake_content()))
        .await
        .unwrap();
    let back = app
        .service
        .send_message(BOB, SendMessageRequest::new(ALICE.to_string(), fake_content()))
        .await
        .unwrap();

    assert_eq!(there.thread_id, back.thread_id);
    assert_eq!(app.service.get_conversations(ALICE).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_reply_on_previous_page_becomes_root() {
    let app = TestApp::new();
    let root = app
        .service
        .send_message(ALICE, SendMessageRequest::new(BOB.to_string(), "root"))
        .await
        .unwrap();
    app.service
        .send_message(BOB, SendMessageRequest::new(ALICE.to_string(), "reply").in_reply_to(root.id.clone()))
        .await
        .unwrap();

    let first = app
        .service
        .view_messages(ALICE, ViewMessagesQuery::new(BOB.to_string()).limit(1))
        .await
        .unwrap();
    assert_eq!(first.messages.len(), 1);
    assert_eq!(first.messages[0].message.content, "reply");
    assert!(first.messages[0].replies.is_empty());
    assert_eq!(first.messages[0].message.parent_message_id, Some(root.id));

    let whole = app
        .service
        .view_messages(ALICE, ViewMessagesQuery::new(BOB.to_string()))
        .await
        .unwrap();
    assert_eq!(whole.messages.len(), 1);
    assert_eq!(whole.messages[0].replies.len(), 1);
}

#[tokio::test]
async fn test_unread_counts_span_conversations() {
    let app = TestApp::new();
    for sender in [ALICE, CAROL, CAROL] {
        app.service
            .send_message(sender, SendMessageRequest::new(BOB.to_string(), fake_content()))
            .await
            .unwrap();
    }

    assert_eq!(app.service.get_unread_count(BOB).await.unwrap(), 3);

    app.service
        .view_messages(BOB, ViewMessagesQuery::new(CAROL.to_string()))
        .await
        .unwrap();

    assert_eq!(app.service.get_unread_count(BOB).await.unwrap(), 1);
    let conversations = app.service.get_conversations(BOB).await.unwrap();
    let unread: Vec<(String, i64)> = conversations
        .into_iter()
        .map(|c| (c.thread_id, c.unread_count))
        .collect();
    assert_eq!(
        unread,
        vec![("1002_1003".to_string(), 0), ("1001_1002".to_string(), 1)]
    );
}

#[tokio::test]
async fn test_rejected_send_is_not_stored() {
    let app = TestApp::new();

    let result = app
        .service
        .send_message(ALICE, SendMessageRequest::new("507f1f77bcf86cd799439011", fake_content()))
        .await;

    assert!(matches!(result, Err(MessageError::Validation(_))));
    assert!(app.repo.is_empty());
    assert!(app.broker.queued("messages").is_empty());
}

#[tokio::test]
async fn test_page_beyond_end_is_empty() {
    let app = TestApp::new();
    app.service
        .send_message(ALICE, SendMessageRequest::new(BOB.to_string(), fake_content()))
        .await
        .unwrap();

    let page = app
        .service
        .view_messages(ALICE, ViewMessagesQuery::new(BOB.to_string()).page(4))
        .await
        .unwrap();

    assert!(page.messages.is_empty());
    assert_eq!(page.pagination.total_messages, 1);
    assert_eq!(page.pagination.total_pages, 1);
    assert!(!page.pagination.has_next_page);
    assert!(page.pagination.has_prev_page);
}
