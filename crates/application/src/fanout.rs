//! 扇出协调器。
//!
//! 把一条已提交的领域事件翻译成零或多条通知行，外加异步的推送与
//! 私有通道广播。流水线固定为：
//! 受众解析 → 通知批量落库 → (推送, 广播) 并发尽力投递。
//! 批量落库必须在触发请求返回前完成；推送与广播通过任务派生脱离
//! 请求生命周期，其中的任何失败只记日志，绝不回滚已持久化的数据。

use std::sync::Arc;

use domain::{
    DeviceToken, DomainError, DomainEvent, Notification, NotificationKind, PostId, UserId,
};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    broadcaster::{EventBroadcaster, UserEvent},
    clock::Clock,
    error::ApplicationError,
    push::PushDispatcher,
    repository::{CommentRepository, NotificationRepository, PostRepository, UserRepository},
};

/// 一次扇出的结果，仅用于调用方记录日志。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReceipt {
    pub notifications: usize,
}

/// 解析完成的受众描述：谁收通知、通知正文、推送标题与附加数据。
struct ResolvedAudience {
    recipients: Vec<UserId>,
    sender: UserId,
    kind: NotificationKind,
    post: Option<PostId>,
    message: String,
    push: Option<PushContent>,
}

struct PushContent {
    title: String,
    data: serde_json::Value,
}

pub struct FanOutCoordinatorDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub post_repository: Arc<dyn PostRepository>,
    pub comment_repository: Arc<dyn CommentRepository>,
    pub notification_repository: Arc<dyn NotificationRepository>,
    pub push_dispatcher: PushDispatcher,
    pub broadcaster: Arc<dyn EventBroadcaster>,
    pub clock: Arc<dyn Clock>,
}

pub struct FanOutCoordinator {
    deps: FanOutCoordinatorDependencies,
}

impl FanOutCoordinator {
    pub fn new(deps: FanOutCoordinatorDependencies) -> Self {
        Self { deps }
    }

    /// 处理一条领域事件。返回 Err 时调用方只应记录警告：
    /// 主数据变更在进入这里之前已经提交，通知永远是副作用而非前置条件。
    pub async fn dispatch(&self, event: DomainEvent) -> Result<FanOutReceipt, ApplicationError> {
        let audience = match self.resolve_audience(&event).await? {
            Some(audience) if !audience.recipients.is_empty() => audience,
            _ => return Ok(FanOutReceipt::default()),
        };

        let now = self.deps.clock.now();
        let notifications: Vec<Notification> = audience
            .recipients
            .iter()
            .map(|recipient| {
                Notification::new(
                    *recipient,
                    audience.sender,
                    audience.kind,
                    audience.post,
                    &audience.message,
                    now,
                )
            })
            .collect();

        // 契约要求：批量落库在触发请求返回前完成，整体成功或整体失败。
        let stored = self
            .deps
            .notification_repository
            .create_batch(notifications)
            .await?;

        info!(
            kind = %audience.kind,
            recipients = stored.len(),
            "notifications persisted"
        );

        self.spawn_push(&audience).await?;
        self.spawn_user_broadcasts(&audience);

        Ok(FanOutReceipt {
            notifications: stored.len(),
        })
    }

    async fn resolve_audience(
        &self,
        event: &DomainEvent,
    ) -> Result<Option<ResolvedAudience>, ApplicationError> {
        match event {
            DomainEvent::PostCreated { post_id, author_id } => {
                let author = self
                    .deps
                    .user_repository
                    .find_by_id(*author_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("user", author_id))?;
                if author.followers.is_empty() {
                    return Ok(None);
                }
                let name = author.display_name().to_owned();
                Ok(Some(ResolvedAudience {
                    recipients: author.followers.clone(),
                    sender: author.id,
                    kind: NotificationKind::NewPost,
                    post: Some(*post_id),
                    message: format!("{name} posted something new"),
                    push: Some(PushContent {
                        title: format!("New Post from {name}"),
                        data: json!({
                            "type": "new_post",
                            "postId": post_id.to_string(),
                            "authorName": name,
                        }),
                    }),
                }))
            }
            DomainEvent::CommentCreated {
                comment_id,
                post_id,
                commenter_id,
                parent_comment_id,
            } => {
                let commenter = self
                    .deps
                    .user_repository
                    .find_by_id(*commenter_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("user", commenter_id))?;
                let name = commenter.display_name().to_owned();

                // 回复通知父评论作者，顶层评论通知动态作者；
                // 作者评论自己的内容不产生通知。
                let (recipient, message, title) = match parent_comment_id {
                    Some(parent_id) => {
                        let parent = self
                            .deps
                            .comment_repository
                            .find_by_id(*parent_id)
                            .await?
                            .ok_or_else(|| DomainError::not_found("comment", parent_id))?;
                        if parent.author == *commenter_id {
                            return Ok(None);
                        }
                        (
                            parent.author,
                            format!("{name} replied to your comment"),
                            "New Reply".to_owned(),
                        )
                    }
                    None => {
                        let post = self
                            .deps
                            .post_repository
                            .find_by_id(*post_id)
                            .await?
                            .ok_or_else(|| DomainError::not_found("post", post_id))?;
                        if post.author == *commenter_id {
                            return Ok(None);
                        }
                        (
                            post.author,
                            format!("{name} commented on your post"),
                            "New Comment".to_owned(),
                        )
                    }
                };

                Ok(Some(ResolvedAudience {
                    recipients: vec![recipient],
                    sender: *commenter_id,
                    kind: NotificationKind::Comment,
                    post: Some(*post_id),
                    message,
                    push: Some(PushContent {
                        title,
                        data: json!({
                            "type": "comment",
                            "postId": post_id.to_string(),
                            "commentId": comment_id.to_string(),
                        }),
                    }),
                }))
            }
            DomainEvent::FollowerAdded {
                follower_id,
                followee_id,
            } => {
                let follower = self
                    .deps
                    .user_repository
                    .find_by_id(*follower_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("user", follower_id))?;
                // 新关注者的推送助手在原始产品里从未接线，这里同样
                // 只写通知行并广播，不触发推送。
                Ok(Some(ResolvedAudience {
                    recipients: vec![*followee_id],
                    sender: *follower_id,
                    kind: NotificationKind::NewFollower,
                    post: None,
                    message: format!("{} started following you", follower.display_name()),
                    push: None,
                }))
            }
        }
    }

    /// 收集受众的设备令牌并派生推送任务。令牌收集是一次读取，
    /// 失败会传播（与受众解析同级）；推送本身脱离请求生命周期。
    async fn spawn_push(&self, audience: &ResolvedAudience) -> Result<(), ApplicationError> {
        let Some(push) = &audience.push else {
            return Ok(());
        };

        let recipients = self
            .deps
            .user_repository
            .find_many(&audience.recipients)
            .await?;
        let tokens: Vec<DeviceToken> = recipients
            .iter()
            .flat_map(|user| user.push_devices.iter().map(|device| device.token.clone()))
            .collect();

        let dispatcher = self.deps.push_dispatcher.clone();
        let title = push.title.clone();
        let body = audience.message.clone();
        let data = push.data.clone();
        tokio::spawn(async move {
            // 分发器自身吸收一切供应商错误，这里只留下聚合日志。
            let summary = dispatcher.dispatch(tokens, &title, &body, data).await;
            if summary.failed_chunks > 0 {
                warn!(
                    failed_chunks = summary.failed_chunks,
                    attempted = summary.attempted,
                    "push dispatch completed with failures"
                );
            }
        });
        Ok(())
    }

    fn spawn_user_broadcasts(&self, audience: &ResolvedAudience) {
        let broadcaster = self.deps.broadcaster.clone();
        let recipients = audience.recipients.clone();
        let event = UserEvent::NewNotification {
            kind: audience.kind,
            message: audience.message.clone(),
            post_id: audience.post,
        };
        tokio::spawn(async move {
            for recipient in recipients {
                if let Err(err) = broadcaster.broadcast_user(recipient, event.clone()).await {
                    warn!(recipient = %recipient, error = %err, "user broadcast failed");
                }
            }
        });
    }
}
