use serde::{Deserialize, Serialize};

use crate::value_objects::{Timestamp, UserId};

/// 点赞记录。每个用户在同一目标上至多一条。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeEntry {
    pub user: UserId,
    pub at: Timestamp,
}

/// 点赞开关的结果状态。`liked` 表示本次操作之后的最终状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: usize,
}

/// 在点赞集合上执行原子的"有则删、无则增"。
pub(crate) fn toggle_like_entry(likes: &mut Vec<LikeEntry>, actor: UserId, now: Timestamp) -> LikeToggle {
    if let Some(index) = likes.iter().position(|entry| entry.user == actor) {
        likes.remove(index);
        LikeToggle {
            liked: false,
            like_count: likes.len(),
        }
    } else {
        likes.push(LikeEntry { user: actor, at: now });
        LikeToggle {
            liked: true,
            like_count: likes.len(),
        }
    }
}
