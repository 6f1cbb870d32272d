use serde::{Deserialize, Serialize};

use crate::value_objects::{NotificationId, PostId, Timestamp, UserId};

/// 通知类型。
///
/// `Like` 是历史遗留的声明：没有任何调用路径会产生该类型的通知，
/// 在产品意图澄清之前保持未接线状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewPost,
    NewFollower,
    Like,
    Comment,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewPost => "new_post",
            NotificationKind::NewFollower => "new_follower",
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 站内通知。只由扇出协调器创建，读取/删除生命周期归接收者所有。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub sender: UserId,
    pub kind: NotificationKind,
    pub post: Option<PostId>,
    pub message: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn new(
        recipient: UserId,
        sender: UserId,
        kind: NotificationKind,
        post: Option<PostId>,
        message: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            recipient,
            sender,
            kind,
            post,
            message: message.into(),
            is_read: false,
            created_at: now,
        }
    }

    pub fn mark_read(&mut self) {
        self.is_read = true;
    }
}
