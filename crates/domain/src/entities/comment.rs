use serde::{Deserialize, Serialize};

use crate::entities::engagement::{toggle_like_entry, LikeEntry, LikeToggle};
use crate::entities::report::ReportCategory;
use crate::errors::DomainError;
use crate::value_objects::{CommentId, CommentText, PostId, Timestamp, UserId};

/// 评论上内嵌的举报记录。每个举报人至多一条。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentReport {
    pub reporter: UserId,
    pub category: ReportCategory,
    pub description: Option<String>,
    pub at: Timestamp,
}

/// 动态下的评论。`parent` 存在时表示对另一条评论的回复，嵌套只有一层。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub text: CommentText,
    pub post: PostId,
    pub author: UserId,
    pub parent: Option<CommentId>,
    pub likes: Vec<LikeEntry>,
    pub replies: Vec<CommentId>,
    pub reports: Vec<CommentReport>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Comment {
    pub fn new(
        id: CommentId,
        text: CommentText,
        post: PostId,
        author: UserId,
        parent: Option<CommentId>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            text,
            post,
            author,
            parent,
            likes: Vec::new(),
            replies: Vec::new(),
            reports: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn reply_count(&self) -> usize {
        self.replies.len()
    }

    pub fn toggle_like(&mut self, actor: UserId, now: Timestamp) -> LikeToggle {
        let toggle = toggle_like_entry(&mut self.likes, actor, now);
        self.updated_at = now;
        toggle
    }

    pub fn add_reply(&mut self, reply_id: CommentId, now: Timestamp) {
        self.replies.push(reply_id);
        self.updated_at = now;
    }

    /// 追加举报记录。同一举报人重复举报返回 DuplicateReport。
    pub fn add_report(
        &mut self,
        reporter: UserId,
        category: ReportCategory,
        description: Option<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        if self.reports.iter().any(|report| report.reporter == reporter) {
            return Err(DomainError::DuplicateReport);
        }
        if let Some(text) = &description {
            if text.chars().count() > 500 {
                return Err(DomainError::invalid_argument("description", "too long"));
            }
        }
        self.reports.push(CommentReport {
            reporter,
            category,
            description,
            at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn soft_delete(&mut self, now: Timestamp) {
        self.is_active = false;
        self.updated_at = now;
    }
}
