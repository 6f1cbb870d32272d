//! 评论服务。
//!
//! 嵌套只有一层：回复必须指向同一动态下的顶层评论。
//! 评论落库后依次追加父文档引用、触发扇出、房间广播，后两者尽力而为。

use std::sync::Arc;

use domain::{
    Comment, CommentId, CommentText, DomainError, DomainEvent, PostId, UserId,
};
use tracing::warn;

use crate::{
    broadcaster::{CommentView, EventBroadcaster, FeedEvent},
    clock::Clock,
    error::ApplicationError,
    fanout::FanOutCoordinator,
    repository::{CommentRepository, PostRepository, UserRepository},
};

#[derive(Debug, Clone)]
pub struct CreateCommentRequest {
    pub post_id: PostId,
    pub text: String,
    pub parent_id: Option<CommentId>,
}

pub struct CommentServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub post_repository: Arc<dyn PostRepository>,
    pub comment_repository: Arc<dyn CommentRepository>,
    pub fanout: Arc<FanOutCoordinator>,
    pub broadcaster: Arc<dyn EventBroadcaster>,
    pub clock: Arc<dyn Clock>,
}

pub struct CommentService {
    deps: CommentServiceDependencies,
}

impl CommentService {
    pub fn new(deps: CommentServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create_comment(
        &self,
        author_id: UserId,
        request: CreateCommentRequest,
    ) -> Result<Comment, ApplicationError> {
        let author = self
            .deps
            .user_repository
            .find_by_id(author_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| DomainError::not_found("user", author_id))?;

        let mut post = self
            .deps
            .post_repository
            .find_by_id(request.post_id)
            .await?
            .filter(|post| post.is_active)
            .ok_or_else(|| DomainError::not_found("post", request.post_id))?;

        let text = CommentText::parse(&request.text)?;
        let now = self.deps.clock.now();

        let parent = match request.parent_id {
            Some(parent_id) => {
                let parent = self
                    .deps
                    .comment_repository
                    .find_by_id(parent_id)
                    .await?
                    .filter(|comment| comment.is_active)
                    .ok_or_else(|| DomainError::not_found("comment", parent_id))?;
                if parent.post != request.post_id {
                    return Err(DomainError::invalid_argument(
                        "parent_id",
                        "parent comment belongs to a different post",
                    )
                    .into());
                }
                if parent.parent.is_some() {
                    return Err(DomainError::invalid_argument(
                        "parent_id",
                        "replies to replies are not allowed",
                    )
                    .into());
                }
                Some(parent)
            }
            None => None,
        };

        let comment = Comment::new(
            CommentId::generate(),
            text,
            request.post_id,
            author_id,
            parent.as_ref().map(|p| p.id),
            now,
        );
        let comment = self.deps.comment_repository.create(comment).await?;

        match parent {
            Some(mut parent) => {
                parent.add_reply(comment.id, now);
                self.deps.comment_repository.update(parent).await?;
            }
            None => {
                post.add_comment(comment.id, now);
                self.deps.post_repository.update(post).await?;
            }
        }

        if let Err(err) = self
            .deps
            .fanout
            .dispatch(DomainEvent::CommentCreated {
                comment_id: comment.id,
                post_id: request.post_id,
                commenter_id: author_id,
                parent_comment_id: comment.parent,
            })
            .await
        {
            warn!(comment = %comment.id, error = %err, "comment fan-out failed, comment itself is committed");
        }

        let view = CommentView::project(&comment, &author);
        if let Err(err) = self
            .deps
            .broadcaster
            .broadcast_room(FeedEvent::CommentNew(view))
            .await
        {
            warn!(comment = %comment.id, error = %err, "room broadcast failed");
        }

        Ok(comment)
    }

    pub async fn list_comments(
        &self,
        post_id: PostId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Comment>, ApplicationError> {
        self.deps
            .post_repository
            .find_by_id(post_id)
            .await?
            .filter(|post| post.is_active)
            .ok_or_else(|| DomainError::not_found("post", post_id))?;
        Ok(self
            .deps
            .comment_repository
            .list_for_post(post_id, limit, offset)
            .await?)
    }
}
