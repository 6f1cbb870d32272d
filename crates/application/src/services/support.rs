//! 服务层测试的公共夹具：内存存储、记录型广播器与推送网关，
//! 以及把所有用例服务接到同一组内存依赖上的装配器。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use domain::{
    Comment, CommentId, Coordinates, GeoBounds, LikeToggle, Notification, NotificationId, Post,
    PostId, Report, ReportId, ReportStatus, RepositoryError, Timestamp, User, UserEmail, UserId,
    Username,
};

use crate::{
    broadcaster::{BroadcastError, EventBroadcaster, FeedEvent, UserEvent},
    clock::SystemClock,
    fanout::{FanOutCoordinator, FanOutCoordinatorDependencies},
    push::{PushDispatcher, PushGateway, PushGatewayError, PushMessage, PushReceipt},
    repository::{
        CommentRepository, FeedQuery, NotificationRepository, PostRepository, ReportRepository,
        UserRepository,
    },
    services::{
        CommentService, CommentServiceDependencies, EngagementService,
        EngagementServiceDependencies, NotificationService, NotificationServiceDependencies,
        PostService, PostServiceDependencies, UserService, UserServiceDependencies,
    },
};

/// 温尼伯运营区域，与默认配置一致。
pub fn winnipeg_bounds() -> GeoBounds {
    GeoBounds::new(49.7, 50.1, -97.4, -96.8).unwrap()
}

/// 市中心附近的合法坐标。
pub fn downtown() -> (f64, f64) {
    (49.8951, -97.1384)
}

pub fn sample_user(name: &str) -> User {
    User::register(
        UserId::generate(),
        format!("identity-{name}"),
        UserEmail::parse(&format!("{name}@example.com")).unwrap(),
        Username::parse(name).unwrap(),
        Utc::now(),
    )
}

/// 轮询等待后台任务产生的副作用落地。
pub async fn wait_for<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within timeout");
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<UserId, User>>,
    pub fail_updates: AtomicBool,
}

impl InMemoryUserRepository {
    pub fn seed(&self, user: User) -> User {
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    pub fn get(&self, id: UserId) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        Ok(self.seed(user))
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage("injected failure"));
        }
        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_identity_key(&self, key: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|user| user.identity_key == key)
            .cloned())
    }

    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.lock().unwrap();
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}

#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: Mutex<HashMap<PostId, Post>>,
}

impl InMemoryPostRepository {
    pub fn seed(&self, post: Post) -> Post {
        self.posts.lock().unwrap().insert(post.id, post.clone());
        post
    }

    pub fn get(&self, id: PostId) -> Option<Post> {
        self.posts.lock().unwrap().get(&id).cloned()
    }
}

fn within_window(coordinates: Coordinates, center: Coordinates, max_distance_m: f64) -> bool {
    // 城市尺度的等距矩形近似足够
    let lat_m = (coordinates.latitude - center.latitude) * 111_320.0;
    let lon_m = (coordinates.longitude - center.longitude)
        * 111_320.0
        * center.latitude.to_radians().cos();
    (lat_m * lat_m + lon_m * lon_m).sqrt() <= max_distance_m
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn create(&self, post: Post) -> Result<Post, RepositoryError> {
        Ok(self.seed(post))
    }

    async fn update(&self, post: Post) -> Result<Post, RepositoryError> {
        let mut posts = self.posts.lock().unwrap();
        if !posts.contains_key(&post.id) {
            return Err(RepositoryError::NotFound);
        }
        posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, RepositoryError> {
        Ok(self.posts.lock().unwrap().get(&id).cloned())
    }

    async fn toggle_like(
        &self,
        id: PostId,
        actor: UserId,
        now: Timestamp,
    ) -> Result<Option<LikeToggle>, RepositoryError> {
        let mut posts = self.posts.lock().unwrap();
        match posts.get_mut(&id).filter(|post| post.is_active) {
            Some(post) => Ok(Some(post.toggle_like(actor, now))),
            None => Ok(None),
        }
    }

    async fn increment_view(&self, id: PostId) -> Result<(), RepositoryError> {
        let mut posts = self.posts.lock().unwrap();
        match posts.get_mut(&id) {
            Some(post) => {
                post.record_view();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list_active(&self, query: FeedQuery) -> Result<Vec<Post>, RepositoryError> {
        let posts = self.posts.lock().unwrap();
        let mut matched: Vec<Post> = posts
            .values()
            .filter(|post| post.is_active)
            .filter(|post| !query.exclude_posts.contains(&post.id))
            .filter(|post| match query.window {
                Some(window) => {
                    within_window(post.coordinates, window.center, window.max_distance_m)
                }
                None => true,
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryCommentRepository {
    comments: Mutex<HashMap<CommentId, Comment>>,
}

impl InMemoryCommentRepository {
    pub fn seed(&self, comment: Comment) -> Comment {
        self.comments
            .lock()
            .unwrap()
            .insert(comment.id, comment.clone());
        comment
    }

    pub fn get(&self, id: CommentId) -> Option<Comment> {
        self.comments.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn create(&self, comment: Comment) -> Result<Comment, RepositoryError> {
        Ok(self.seed(comment))
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepositoryError> {
        let mut comments = self.comments.lock().unwrap();
        if !comments.contains_key(&comment.id) {
            return Err(RepositoryError::NotFound);
        }
        comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError> {
        Ok(self.comments.lock().unwrap().get(&id).cloned())
    }

    async fn toggle_like(
        &self,
        id: CommentId,
        actor: UserId,
        now: Timestamp,
    ) -> Result<Option<LikeToggle>, RepositoryError> {
        let mut comments = self.comments.lock().unwrap();
        match comments.get_mut(&id).filter(|comment| comment.is_active) {
            Some(comment) => Ok(Some(comment.toggle_like(actor, now))),
            None => Ok(None),
        }
    }

    async fn list_for_post(
        &self,
        post_id: PostId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Comment>, RepositoryError> {
        let comments = self.comments.lock().unwrap();
        let mut matched: Vec<Comment> = comments
            .values()
            .filter(|comment| {
                comment.post == post_id && comment.is_active && comment.parent.is_none()
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: Mutex<HashMap<NotificationId, Notification>>,
    pub fail_batch: AtomicBool,
}

impl InMemoryNotificationRepository {
    pub fn all_for(&self, recipient: UserId) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap()
            .values()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect()
    }

    pub fn total(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create_batch(
        &self,
        notifications: Vec<Notification>,
    ) -> Result<Vec<Notification>, RepositoryError> {
        if self.fail_batch.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage("injected batch failure"));
        }
        let mut store = self.notifications.lock().unwrap();
        for notification in &notifications {
            store.insert(notification.id, notification.clone());
        }
        Ok(notifications)
    }

    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        Ok(self.notifications.lock().unwrap().get(&id).cloned())
    }

    async fn list_for_recipient(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let store = self.notifications.lock().unwrap();
        let mut matched: Vec<Notification> = store
            .values()
            .filter(|n| n.recipient == recipient && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> Result<Option<Notification>, RepositoryError> {
        let mut store = self.notifications.lock().unwrap();
        match store.get_mut(&id).filter(|n| n.recipient == recipient) {
            Some(notification) => {
                notification.mark_read();
                Ok(Some(notification.clone()))
            }
            None => Ok(None),
        }
    }

    async fn mark_all_read(&self, recipient: UserId) -> Result<u64, RepositoryError> {
        let mut store = self.notifications.lock().unwrap();
        let mut modified = 0;
        for notification in store.values_mut() {
            if notification.recipient == recipient && !notification.is_read {
                notification.mark_read();
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn delete(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut store = self.notifications.lock().unwrap();
        let owned = store
            .get(&id)
            .is_some_and(|n| n.recipient == recipient);
        if owned {
            store.remove(&id);
        }
        Ok(owned)
    }

    async fn count_unread(&self, recipient: UserId) -> Result<u64, RepositoryError> {
        Ok(self
            .notifications
            .lock()
            .unwrap()
            .values()
            .filter(|n| n.recipient == recipient && !n.is_read)
            .count() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryReportRepository {
    reports: Mutex<HashMap<ReportId, Report>>,
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn create(&self, report: Report) -> Result<Report, RepositoryError> {
        let mut reports = self.reports.lock().unwrap();
        let duplicate = reports
            .values()
            .any(|r| r.reporter == report.reporter && r.reported_post == report.reported_post);
        if duplicate {
            return Err(RepositoryError::conflict("duplicate report"));
        }
        reports.insert(report.id, report.clone());
        Ok(report)
    }

    async fn update(&self, report: Report) -> Result<Report, RepositoryError> {
        let mut reports = self.reports.lock().unwrap();
        if !reports.contains_key(&report.id) {
            return Err(RepositoryError::NotFound);
        }
        reports.insert(report.id, report.clone());
        Ok(report)
    }

    async fn exists(&self, reporter: UserId, post: PostId) -> Result<bool, RepositoryError> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .values()
            .any(|r| r.reporter == reporter && r.reported_post == post))
    }

    async fn find_by_id(&self, id: ReportId) -> Result<Option<Report>, RepositoryError> {
        Ok(self.reports.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_status(
        &self,
        status: ReportStatus,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Report>, RepositoryError> {
        let reports = self.reports.lock().unwrap();
        let mut matched: Vec<Report> = reports
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn hidden_post_ids(&self, reporter: UserId) -> Result<Vec<PostId>, RepositoryError> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.reporter == reporter && r.status.hides_post_from_reporter())
            .map(|r| r.reported_post)
            .collect())
    }
}

/// 记录型广播器，可配置为失败以验证尽力投递语义。
#[derive(Default)]
pub struct RecordingBroadcaster {
    pub room_events: Mutex<Vec<FeedEvent>>,
    pub user_events: Mutex<Vec<(UserId, UserEvent)>>,
    pub fail: AtomicBool,
}

impl RecordingBroadcaster {
    pub fn room_event_names(&self) -> Vec<&'static str> {
        self.room_events
            .lock()
            .unwrap()
            .iter()
            .map(FeedEvent::name)
            .collect()
    }

    pub fn user_events_for(&self, user_id: UserId) -> Vec<UserEvent> {
        self.user_events
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

#[async_trait]
impl EventBroadcaster for RecordingBroadcaster {
    async fn broadcast_room(&self, event: FeedEvent) -> Result<(), BroadcastError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BroadcastError::failed("injected broadcast failure"));
        }
        self.room_events.lock().unwrap().push(event);
        Ok(())
    }

    async fn broadcast_user(
        &self,
        user_id: UserId,
        event: UserEvent,
    ) -> Result<(), BroadcastError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BroadcastError::failed("injected broadcast failure"));
        }
        self.user_events.lock().unwrap().push((user_id, event));
        Ok(())
    }
}

/// 记录型推送网关。
#[derive(Default)]
pub struct RecordingPushGateway {
    pub chunks: Mutex<Vec<Vec<PushMessage>>>,
    pub fail: AtomicBool,
}

impl RecordingPushGateway {
    pub fn sent_tokens(&self) -> Vec<String> {
        self.chunks
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|message| message.to.as_str().to_owned())
            .collect()
    }
}

#[async_trait]
impl PushGateway for RecordingPushGateway {
    async fn send_chunk(
        &self,
        messages: &[PushMessage],
    ) -> Result<Vec<PushReceipt>, PushGatewayError> {
        self.chunks.lock().unwrap().push(messages.to_vec());
        if self.fail.load(Ordering::SeqCst) {
            return Err(PushGatewayError::Provider("injected provider failure".into()));
        }
        Ok(messages
            .iter()
            .map(|_| PushReceipt {
                status: "ok".into(),
                message: None,
            })
            .collect())
    }
}

/// 一整套接在内存依赖上的服务。
pub struct Harness {
    pub users: Arc<InMemoryUserRepository>,
    pub posts: Arc<InMemoryPostRepository>,
    pub comments: Arc<InMemoryCommentRepository>,
    pub notifications: Arc<InMemoryNotificationRepository>,
    pub reports: Arc<InMemoryReportRepository>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub gateway: Arc<RecordingPushGateway>,
    pub fanout: Arc<FanOutCoordinator>,
    pub engagement: EngagementService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub notification_service: NotificationService,
    pub user_service: UserService,
}

impl Harness {
    pub fn new() -> Self {
        let users = Arc::new(InMemoryUserRepository::default());
        let posts = Arc::new(InMemoryPostRepository::default());
        let comments = Arc::new(InMemoryCommentRepository::default());
        let notifications = Arc::new(InMemoryNotificationRepository::default());
        let reports = Arc::new(InMemoryReportRepository::default());
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let gateway = Arc::new(RecordingPushGateway::default());
        let clock = Arc::new(SystemClock);

        let fanout = Arc::new(FanOutCoordinator::new(FanOutCoordinatorDependencies {
            user_repository: users.clone(),
            post_repository: posts.clone(),
            comment_repository: comments.clone(),
            notification_repository: notifications.clone(),
            push_dispatcher: PushDispatcher::new(gateway.clone(), 100),
            broadcaster: broadcaster.clone(),
            clock: clock.clone(),
        }));

        let engagement = EngagementService::new(EngagementServiceDependencies {
            user_repository: users.clone(),
            post_repository: posts.clone(),
            comment_repository: comments.clone(),
            report_repository: reports.clone(),
            fanout: fanout.clone(),
            broadcaster: broadcaster.clone(),
            clock: clock.clone(),
        });
        let post_service = PostService::new(PostServiceDependencies {
            user_repository: users.clone(),
            post_repository: posts.clone(),
            report_repository: reports.clone(),
            fanout: fanout.clone(),
            broadcaster: broadcaster.clone(),
            clock: clock.clone(),
            service_area: winnipeg_bounds(),
        });
        let comment_service = CommentService::new(CommentServiceDependencies {
            user_repository: users.clone(),
            post_repository: posts.clone(),
            comment_repository: comments.clone(),
            fanout: fanout.clone(),
            broadcaster: broadcaster.clone(),
            clock: clock.clone(),
        });
        let notification_service = NotificationService::new(NotificationServiceDependencies {
            notification_repository: notifications.clone(),
            broadcaster: broadcaster.clone(),
        });
        let user_service = UserService::new(UserServiceDependencies {
            user_repository: users.clone(),
            clock,
        });

        Self {
            users,
            posts,
            comments,
            notifications,
            reports,
            broadcaster,
            gateway,
            fanout,
            engagement,
            post_service,
            comment_service,
            notification_service,
            user_service,
        }
    }

    pub fn seed_user(&self, name: &str) -> User {
        self.users.seed(sample_user(name))
    }

    /// 建立 follower → followee 的关注关系，直接写存储。
    pub fn seed_follow(&self, follower: &User, followee: &User) {
        let now = Utc::now();
        // 以传入的副本为准，但保留存储里已累积的关注关系，
        // 让同一用户多次建立关注时不会互相覆盖。
        let mut follower = follower.clone();
        let mut followee = followee.clone();
        if let Some(stored) = self.users.get(follower.id) {
            follower.followers = stored.followers;
            follower.following = stored.following;
        }
        if let Some(stored) = self.users.get(followee.id) {
            followee.followers = stored.followers;
            followee.following = stored.following;
        }
        follower.add_following(followee.id, now).unwrap();
        followee.add_follower(follower.id, now);
        self.users.seed(follower);
        self.users.seed(followee);
    }
}
