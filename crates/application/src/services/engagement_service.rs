//! 互动引擎。
//!
//! 点赞/关注/举报/软删除的原子幂等状态迁移，是扇出的前置条件。
//! 本层错误同步传播给调用方并中止变更；扇出与广播的失败只记日志。

use std::sync::Arc;

use domain::{
    CommentId, DomainError, DomainEvent, PostId, Report, ReportCategory, ReportId, ReportStatus,
    User, UserId,
};
use tracing::warn;

use crate::{
    broadcaster::{EventBroadcaster, FeedEvent, UserEvent},
    clock::Clock,
    error::ApplicationError,
    fanout::FanOutCoordinator,
    identity::Caller,
    repository::{CommentRepository, PostRepository, ReportRepository, UserRepository},
};

/// 点赞目标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Post(PostId),
    Comment(CommentId),
}

/// 软删除目标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    Post(PostId),
    Comment(CommentId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowDirection {
    Follow,
    Unfollow,
}

/// 点赞开关的返回值。`liked` 是操作之后的最终状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub liked: bool,
    pub like_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowOutcome {
    pub follower_count: usize,
    pub following_count: usize,
}

#[derive(Debug, Clone)]
pub struct SubmitReportRequest {
    pub post_id: PostId,
    pub category: ReportCategory,
    pub description: Option<String>,
}

pub struct EngagementServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub post_repository: Arc<dyn PostRepository>,
    pub comment_repository: Arc<dyn CommentRepository>,
    pub report_repository: Arc<dyn ReportRepository>,
    pub fanout: Arc<FanOutCoordinator>,
    pub broadcaster: Arc<dyn EventBroadcaster>,
    pub clock: Arc<dyn Clock>,
}

pub struct EngagementService {
    deps: EngagementServiceDependencies,
}

impl EngagementService {
    pub fn new(deps: EngagementServiceDependencies) -> Self {
        Self { deps }
    }

    /// 点赞开关。同一用户重复调用在点赞/取消之间往返，集合里永远
    /// 至多一条记录。`like` 类型的通知在产品里从未接线，这里也
    /// 刻意不触发任何扇出。
    pub async fn toggle_like(
        &self,
        actor: UserId,
        target: LikeTarget,
    ) -> Result<LikeOutcome, ApplicationError> {
        let now = self.deps.clock.now();
        let (toggle, event) = match target {
            LikeTarget::Post(post_id) => {
                let toggle = self
                    .deps
                    .post_repository
                    .toggle_like(post_id, actor, now)
                    .await?
                    .ok_or_else(|| DomainError::not_found("post", post_id))?;
                (
                    toggle,
                    FeedEvent::PostLiked {
                        post_id,
                        like_count: toggle.like_count,
                    },
                )
            }
            LikeTarget::Comment(comment_id) => {
                let comment = self
                    .deps
                    .comment_repository
                    .find_by_id(comment_id)
                    .await?
                    .filter(|comment| comment.is_active)
                    .ok_or_else(|| DomainError::not_found("comment", comment_id))?;
                let toggle = self
                    .deps
                    .comment_repository
                    .toggle_like(comment_id, actor, now)
                    .await?
                    .ok_or_else(|| DomainError::not_found("comment", comment_id))?;
                (
                    toggle,
                    FeedEvent::CommentLiked {
                        comment_id,
                        post_id: comment.post,
                        like_count: toggle.like_count,
                    },
                )
            }
        };

        self.broadcast_room_best_effort(event).await;

        Ok(LikeOutcome {
            liked: toggle.liked,
            like_count: toggle.like_count,
        })
    }

    /// 关注开关。两个用户文档各写一次；第二次写入失败会作为可重试的
    /// 存储错误传播，不做自动修复（见 DESIGN.md 的一致性决定）。
    pub async fn toggle_follow(
        &self,
        actor_id: UserId,
        target_id: UserId,
        direction: FollowDirection,
    ) -> Result<FollowOutcome, ApplicationError> {
        if actor_id == target_id {
            return Err(DomainError::SelfFollow.into());
        }

        let mut actor = self
            .deps
            .user_repository
            .find_by_id(actor_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", actor_id))?;
        let mut target = self
            .deps
            .user_repository
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", target_id))?;

        let now = self.deps.clock.now();
        match direction {
            FollowDirection::Follow => {
                actor.add_following(target_id, now)?;
                target.add_follower(actor_id, now);
            }
            FollowDirection::Unfollow => {
                actor.remove_following(target_id, now)?;
                target.remove_follower(actor_id, now);
            }
        }

        let actor = self.deps.user_repository.update(actor).await?;
        let target = match self.deps.user_repository.update(target).await {
            Ok(target) => target,
            Err(err) => {
                // 互补集合此刻不一致，调用方应重试整个操作
                warn!(
                    actor = %actor_id,
                    target = %target_id,
                    error = %err,
                    "second follow write failed, sets are inconsistent"
                );
                return Err(err.into());
            }
        };

        let outcome = FollowOutcome {
            follower_count: target.follower_count(),
            following_count: actor.following_count(),
        };

        if matches!(direction, FollowDirection::Follow) {
            if let Err(err) = self
                .deps
                .fanout
                .dispatch(DomainEvent::FollowerAdded {
                    follower_id: actor_id,
                    followee_id: target_id,
                })
                .await
            {
                warn!(error = %err, "follow fan-out failed, follow itself is committed");
            }
        }

        // 双方私有通道收到同一份载荷
        let event = match direction {
            FollowDirection::Follow => UserEvent::Follow {
                target_user_id: target_id,
                follower_id: actor_id,
                follower_username: actor.username.to_string(),
                follower_count: outcome.follower_count,
                following_count: outcome.following_count,
            },
            FollowDirection::Unfollow => UserEvent::Unfollow {
                target_user_id: target_id,
                follower_id: actor_id,
                follower_username: actor.username.to_string(),
                follower_count: outcome.follower_count,
                following_count: outcome.following_count,
            },
        };
        self.broadcast_user_best_effort(target_id, event.clone())
            .await;
        self.broadcast_user_best_effort(actor_id, event).await;

        Ok(outcome)
    }

    /// 举报动态。(reporter, post) 唯一；重复举报返回 DuplicateReport。
    /// 已举报动态从举报人自己的动态流里消失是读取侧过滤，不改数据。
    pub async fn submit_report(
        &self,
        reporter: UserId,
        request: SubmitReportRequest,
    ) -> Result<Report, ApplicationError> {
        let post = self
            .deps
            .post_repository
            .find_by_id(request.post_id)
            .await?
            .filter(|post| post.is_active)
            .ok_or_else(|| DomainError::not_found("post", request.post_id))?;

        if self
            .deps
            .report_repository
            .exists(reporter, request.post_id)
            .await?
        {
            return Err(DomainError::DuplicateReport.into());
        }

        let report = Report::new(
            ReportId::generate(),
            reporter,
            request.post_id,
            post.author,
            request.category,
            request.description,
            self.deps.clock.now(),
        )?;

        // 并发的重复提交由存储的唯一约束兜底
        self.deps
            .report_repository
            .create(report)
            .await
            .map_err(|err| match err {
                domain::RepositoryError::Conflict(_) => DomainError::DuplicateReport.into(),
                other => ApplicationError::from(other),
            })
    }

    /// 举报评论。举报记录内嵌在评论文档上，同一举报人至多一条。
    pub async fn report_comment(
        &self,
        reporter: UserId,
        comment_id: CommentId,
        category: ReportCategory,
        description: Option<String>,
    ) -> Result<(), ApplicationError> {
        let mut comment = self
            .deps
            .comment_repository
            .find_by_id(comment_id)
            .await?
            .filter(|comment| comment.is_active)
            .ok_or_else(|| DomainError::not_found("comment", comment_id))?;

        comment.add_report(reporter, category, description, self.deps.clock.now())?;
        self.deps.comment_repository.update(comment).await?;
        Ok(())
    }

    /// 封禁用户（仅管理员）。封禁后该用户无法发帖/评论，动态流里的
    /// 既有内容不受影响。
    pub async fn ban_user(&self, caller: Caller, user_id: UserId) -> Result<User, ApplicationError> {
        if !caller.is_admin {
            return Err(ApplicationError::Authorization);
        }
        let mut user = self
            .deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))?;
        user.soft_delete(self.deps.clock.now());
        Ok(self.deps.user_repository.update(user).await?)
    }

    /// 解封用户（仅管理员）。
    pub async fn unban_user(
        &self,
        caller: Caller,
        user_id: UserId,
    ) -> Result<User, ApplicationError> {
        if !caller.is_admin {
            return Err(ApplicationError::Authorization);
        }
        let mut user = self
            .deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))?;
        user.restore(self.deps.clock.now());
        Ok(self.deps.user_repository.update(user).await?)
    }

    /// 审核举报（仅管理员）。
    pub async fn review_report(
        &self,
        caller: Caller,
        report_id: ReportId,
        status: ReportStatus,
        notes: Option<String>,
    ) -> Result<Report, ApplicationError> {
        if !caller.is_admin {
            return Err(ApplicationError::Authorization);
        }
        let mut report = self
            .deps
            .report_repository
            .find_by_id(report_id)
            .await?
            .ok_or_else(|| DomainError::not_found("report", report_id))?;

        report.transition(status, caller.user_id, notes, self.deps.clock.now());
        Ok(self.deps.report_repository.update(report).await?)
    }

    /// 软删除。作者或管理员可删；不级联——被删动态的评论保留，
    /// 只是不再能通过正常列表到达。
    pub async fn soft_delete(
        &self,
        caller: Caller,
        target: DeleteTarget,
    ) -> Result<(), ApplicationError> {
        let now = self.deps.clock.now();
        match target {
            DeleteTarget::Post(post_id) => {
                let mut post = self
                    .deps
                    .post_repository
                    .find_by_id(post_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("post", post_id))?;
                if post.author != caller.user_id && !caller.is_admin {
                    return Err(DomainError::not_authorized("delete post").into());
                }
                post.soft_delete(now);
                self.deps.post_repository.update(post).await?;
                self.broadcast_room_best_effort(FeedEvent::PostDeleted { post_id })
                    .await;
            }
            DeleteTarget::Comment(comment_id) => {
                let mut comment = self
                    .deps
                    .comment_repository
                    .find_by_id(comment_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("comment", comment_id))?;
                if comment.author != caller.user_id && !caller.is_admin {
                    return Err(DomainError::not_authorized("delete comment").into());
                }
                comment.soft_delete(now);
                self.deps.comment_repository.update(comment).await?;
            }
        }
        Ok(())
    }

    async fn broadcast_room_best_effort(&self, event: FeedEvent) {
        if let Err(err) = self.deps.broadcaster.broadcast_room(event).await {
            warn!(error = %err, "room broadcast failed");
        }
    }

    async fn broadcast_user_best_effort(&self, user_id: UserId, event: UserEvent) {
        if let Err(err) = self.deps.broadcaster.broadcast_user(user_id, event).await {
            warn!(user = %user_id, error = %err, "user broadcast failed");
        }
    }
}
