mod common;

use common::*;
use domains::Comment;
use services::{CommentListRequest, ListMode, MessageCenterType};

fn message_center(name: &str, kind: MessageCenterType) -> CommentListRequest {
    let mut request = request();
    request.name = Some(name.into());
    request.email = Some(format!("{name}@example.com"));
    request.message_type = Some(kind);
    request
}

#[tokio::test]
async fn message_center_forces_flat_mode() {
    let service = comment_service(thread_store());
    let mut request = message_center("bob", MessageCenterType::Mine);
    request.flat_mode = false;

    let response = service.list(&request).await.unwrap();

    assert_eq!(response.mode, ListMode::Flat);
    assert_eq!(ids(&response.comments), vec![4, 2]);
    assert!(response.comments[0].visible);
    assert!(!response.comments[1].visible);
}

#[tokio::test]
async fn mentions_span_pages() {
    let store = thread_store();
    store.insert_comment(Comment {
        page_key: "/y.html".into(),
        ..comment(10, 0, 1, "root on another page")
    });
    store.insert_comment(Comment {
        page_key: "/y.html".into(),
        ..comment(11, 10, 2, "reply on another page")
    });
    let service = comment_service(store);

    let response = service
        .list(&message_center("alice", MessageCenterType::Mentions))
        .await
        .unwrap();

    assert_eq!(ids(&response.comments), vec![4, 11, 2, 10]);
    assert_eq!(response.total, 2);
}

#[tokio::test]
async fn message_center_read_marks_notifications() {
    let store = thread_store();
    store.insert_notification(notification(1, 1, 4));
    store.insert_notification(notification(2, 1, 4));
    store.insert_notification(notification(3, 2, 1));
    let service = comment_service(store.clone());

    // An identity alone only reports unread notifications.
    let mut plain = request();
    plain.name = Some("alice".into());
    plain.email = Some("alice@example.com".into());
    let response = service.list(&plain).await.unwrap();
    assert_eq!(response.unread_count, 2);
    assert_eq!(response.unread[0].comment_id, 4);
    assert!(!store.notification(1).unwrap().is_read);

    let response = service
        .list(&message_center("alice", MessageCenterType::All))
        .await
        .unwrap();
    assert_eq!(response.unread_count, 0);
    assert!(response.unread.is_empty());
    assert!(store.notification(1).unwrap().is_read);
    assert!(store.notification(2).unwrap().is_read);
    assert!(!store.notification(3).unwrap().is_read);

    // Repeating the read is harmless.
    let response = service
        .list(&message_center("alice", MessageCenterType::All))
        .await
        .unwrap();
    assert_eq!(response.unread_count, 0);
}

#[tokio::test]
async fn admin_views_require_admin() {
    let store = thread_store();
    store.insert_comment(Comment {
        is_pending: true,
        ..comment(5, 0, 2, "held for moderation")
    });
    let service = comment_service(store);

    let response = service
        .list(&message_center("bob", MessageCenterType::AdminPending))
        .await
        .unwrap();
    assert!(response.comments.is_empty());
    assert_eq!(response.total, 0);

    let mut admin = message_center("bob", MessageCenterType::AdminPending);
    admin.is_admin = true;
    let response = service.list(&admin).await.unwrap();
    assert_eq!(ids(&response.comments), vec![5]);

    let response = service
        .list(&message_center("bob", MessageCenterType::Pending))
        .await
        .unwrap();
    assert_eq!(ids(&response.comments), vec![5]);
}

#[tokio::test]
async fn unknown_user_sees_nothing() {
    let service = comment_service(thread_store());

    let response = service
        .list(&message_center("mallory", MessageCenterType::Mine))
        .await
        .unwrap();

    assert_eq!(response.mode, ListMode::Flat);
    assert!(response.comments.is_empty());
    assert_eq!((response.total, response.total_roots), (0, 0));
    assert!(response.unread.is_empty());
}
