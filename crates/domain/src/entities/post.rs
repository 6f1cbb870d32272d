use serde::{Deserialize, Serialize};

use crate::entities::engagement::{toggle_like_entry, LikeEntry, LikeToggle};
use crate::value_objects::{CommentId, Coordinates, PostId, PostText, Timestamp, UserId};

/// 附件媒体类型。目前只支持图片。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub kind: MediaKind,
}

/// 钉在地理坐标上的动态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub text: PostText,
    pub media: Option<MediaRef>,
    pub coordinates: Coordinates,
    pub author: UserId,
    pub likes: Vec<LikeEntry>,
    pub comments: Vec<CommentId>,
    pub is_active: bool,
    pub view_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Post {
    pub fn new(
        id: PostId,
        text: PostText,
        media: Option<MediaRef>,
        coordinates: Coordinates,
        author: UserId,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            text,
            media,
            coordinates,
            author,
            likes: Vec::new(),
            comments: Vec::new(),
            is_active: true,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// 单次原子切换：已点赞则取消，未点赞则追加，绝不产生重复记录。
    pub fn toggle_like(&mut self, actor: UserId, now: Timestamp) -> LikeToggle {
        let toggle = toggle_like_entry(&mut self.likes, actor, now);
        self.updated_at = now;
        toggle
    }

    pub fn add_comment(&mut self, comment_id: CommentId, now: Timestamp) {
        self.comments.push(comment_id);
        self.updated_at = now;
    }

    pub fn record_view(&mut self) {
        self.view_count += 1;
    }

    pub fn soft_delete(&mut self, now: Timestamp) {
        self.is_active = false;
        self.updated_at = now;
    }
}
