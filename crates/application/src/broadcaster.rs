//! 实时广播总线抽象。
//!
//! 两种寻址方式：公共动态房间的全员广播，以及按用户 ID 寻址的私有通道。
//! 投递是 fire-and-forget 的：对当前在线的客户端至多一次，掉线客户端
//! 依赖实体存储里的通知行作为可靠回补，总线自身不做重试或确认。

use async_trait::async_trait;
use domain::{
    Comment, CommentId, Coordinates, MediaRef, NotificationKind, Post, PostId, Timestamp, User,
    UserId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 对外投影的作者信息。只暴露展示所需字段，
/// 绝不携带邮箱或外部身份键。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: UserId,
    pub username: String,
    pub avatar: Option<String>,
    pub anonymous_mode: bool,
}

impl AuthorView {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.to_string(),
            avatar: user.avatar.clone(),
            anonymous_mode: user.anonymous_mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    pub id: PostId,
    pub text: String,
    pub media: Option<MediaRef>,
    pub coordinates: Coordinates,
    pub author: AuthorView,
    pub like_count: usize,
    pub comment_count: usize,
    pub view_count: u64,
    pub created_at: Timestamp,
}

impl PostView {
    pub fn project(post: &Post, author: &User) -> Self {
        Self {
            id: post.id,
            text: post.text.as_str().to_owned(),
            media: post.media.clone(),
            coordinates: post.coordinates,
            author: AuthorView::from_user(author),
            like_count: post.like_count(),
            comment_count: post.comment_count(),
            view_count: post.view_count,
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: CommentId,
    pub post: PostId,
    pub parent: Option<CommentId>,
    pub text: String,
    pub author: AuthorView,
    pub like_count: usize,
    pub reply_count: usize,
    pub created_at: Timestamp,
}

impl CommentView {
    pub fn project(comment: &Comment, author: &User) -> Self {
        Self {
            id: comment.id,
            post: comment.post,
            parent: comment.parent,
            text: comment.text.as_str().to_owned(),
            author: AuthorView::from_user(author),
            like_count: comment.like_count(),
            reply_count: comment.reply_count(),
            created_at: comment.created_at,
        }
    }
}

/// 公共动态房间的事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum FeedEvent {
    #[serde(rename = "post:new")]
    PostNew(PostView),
    #[serde(rename = "post:deleted")]
    PostDeleted { post_id: PostId },
    #[serde(rename = "comment:new")]
    CommentNew(CommentView),
    #[serde(rename = "post:liked")]
    PostLiked { post_id: PostId, like_count: usize },
    #[serde(rename = "comment:liked")]
    CommentLiked {
        comment_id: CommentId,
        post_id: PostId,
        like_count: usize,
    },
}

impl FeedEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FeedEvent::PostNew(_) => "post:new",
            FeedEvent::PostDeleted { .. } => "post:deleted",
            FeedEvent::CommentNew(_) => "comment:new",
            FeedEvent::PostLiked { .. } => "post:liked",
            FeedEvent::CommentLiked { .. } => "comment:liked",
        }
    }
}

/// 私有通道事件，按接收用户寻址。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum UserEvent {
    #[serde(rename = "new_notification")]
    NewNotification {
        kind: NotificationKind,
        message: String,
        post_id: Option<PostId>,
    },
    #[serde(rename = "follow")]
    Follow {
        target_user_id: UserId,
        follower_id: UserId,
        follower_username: String,
        follower_count: usize,
        following_count: usize,
    },
    #[serde(rename = "unfollow")]
    Unfollow {
        target_user_id: UserId,
        follower_id: UserId,
        follower_username: String,
        follower_count: usize,
        following_count: usize,
    },
    #[serde(rename = "notifications_read")]
    NotificationsRead { user_id: UserId, modified_count: u64 },
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast failed: {0}")]
    Failed(String),
}

impl BroadcastError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[async_trait]
pub trait EventBroadcaster: Send + Sync {
    /// 公共动态房间广播。
    async fn broadcast_room(&self, event: FeedEvent) -> Result<(), BroadcastError>;
    /// 指定用户的私有通道广播。
    async fn broadcast_user(&self, user_id: UserId, event: UserEvent)
        -> Result<(), BroadcastError>;
}
