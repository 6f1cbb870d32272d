use application::broadcaster::{EventBroadcaster, FeedEvent, UserEvent};
use domain::{NotificationKind, PostId, UserId};
use infrastructure::LocalEventBroadcaster;

fn post_deleted() -> FeedEvent {
    FeedEvent::PostDeleted {
        post_id: PostId::generate(),
    }
}

fn new_notification() -> UserEvent {
    UserEvent::NewNotification {
        kind: NotificationKind::NewPost,
        message: "someone posted something new".into(),
        post_id: Some(PostId::generate()),
    }
}

#[tokio::test]
async fn room_broadcast_reaches_all_subscribers() {
    let bus = LocalEventBroadcaster::new(16);
    let mut first = bus.subscribe_room();
    let mut second = bus.subscribe_room();

    let event = post_deleted();
    bus.broadcast_room(event.clone()).await.unwrap();

    assert_eq!(first.recv().await.unwrap(), event);
    assert_eq!(second.recv().await.unwrap(), event);
}

#[tokio::test]
async fn room_broadcast_without_subscribers_is_ok() {
    let bus = LocalEventBroadcaster::new(16);
    bus.broadcast_room(post_deleted()).await.unwrap();
}

#[tokio::test]
async fn user_broadcast_is_scoped_to_recipient() {
    let bus = LocalEventBroadcaster::new(16);
    let alice = UserId::generate();
    let bob = UserId::generate();
    let mut alice_rx = bus.subscribe_user(alice).await;
    let mut bob_rx = bus.subscribe_user(bob).await;

    bus.broadcast_user(alice, new_notification()).await.unwrap();

    assert!(matches!(
        alice_rx.recv().await.unwrap(),
        UserEvent::NewNotification { .. }
    ));
    assert!(bob_rx.try_recv().is_err());
}

#[tokio::test]
async fn offline_user_broadcast_is_ok_and_creates_no_channel() {
    let bus = LocalEventBroadcaster::new(16);
    let offline = UserId::generate();

    bus.broadcast_user(offline, new_notification()).await.unwrap();

    // 之后订阅只能看到新事件，发送侧没有偷偷建通道攒消息
    let mut rx = bus.subscribe_user(offline).await;
    bus.broadcast_user(offline, new_notification()).await.unwrap();
    assert!(matches!(
        rx.recv().await.unwrap(),
        UserEvent::NewNotification { .. }
    ));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn dropped_channels_are_reclaimed() {
    let bus = LocalEventBroadcaster::new(16);
    let user = UserId::generate();
    {
        let _rx = bus.subscribe_user(user).await;
    }
    bus.drop_user_channel(user).await;
    // 通道没了，发送退化为 no-op
    bus.broadcast_user(user, new_notification()).await.unwrap();
}
