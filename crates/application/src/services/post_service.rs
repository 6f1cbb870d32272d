//! 动态服务。
//!
//! 创建校验走领域值对象，服务区域（温尼伯）检查在坐标解析之后。
//! 创建成功后的扇出与房间广播都是尽力而为，失败不影响调用方拿到动态。

use std::sync::Arc;

use domain::{
    Coordinates, DomainError, DomainEvent, GeoBounds, MediaKind, MediaRef, Post, PostId, PostText,
    UserId,
};
use tracing::warn;

use crate::{
    broadcaster::{EventBroadcaster, FeedEvent, PostView},
    clock::Clock,
    error::ApplicationError,
    fanout::FanOutCoordinator,
    repository::{FeedQuery, GeoWindow, PostRepository, ReportRepository, UserRepository},
};

#[derive(Debug, Clone)]
pub struct CreatePostRequest {
    pub text: String,
    pub latitude: f64,
    pub longitude: f64,
    pub media_url: Option<String>,
    pub media_kind: Option<MediaKind>,
}

pub struct PostServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub post_repository: Arc<dyn PostRepository>,
    pub report_repository: Arc<dyn ReportRepository>,
    pub fanout: Arc<FanOutCoordinator>,
    pub broadcaster: Arc<dyn EventBroadcaster>,
    pub clock: Arc<dyn Clock>,
    /// 允许发帖的服务区域边界框。
    pub service_area: GeoBounds,
}

pub struct PostService {
    deps: PostServiceDependencies,
}

impl PostService {
    pub fn new(deps: PostServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create_post(
        &self,
        author_id: UserId,
        request: CreatePostRequest,
    ) -> Result<Post, ApplicationError> {
        let author = self
            .deps
            .user_repository
            .find_by_id(author_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| DomainError::not_found("user", author_id))?;

        let text = PostText::parse(&request.text)?;
        let coordinates = Coordinates::parse(request.latitude, request.longitude)?;
        if !self.deps.service_area.contains(&coordinates) {
            return Err(DomainError::OutsideServiceArea.into());
        }

        let media = match (request.media_url, request.media_kind) {
            (Some(url), kind) => Some(MediaRef {
                url,
                kind: kind.unwrap_or(MediaKind::Image),
            }),
            (None, Some(_)) => {
                return Err(
                    DomainError::invalid_argument("media", "media kind given without url").into(),
                )
            }
            (None, None) => None,
        };

        let post = Post::new(
            PostId::generate(),
            text,
            media,
            coordinates,
            author_id,
            self.deps.clock.now(),
        );
        let post = self.deps.post_repository.create(post).await?;

        // 动态已提交；此后的通知与广播失败只降级为日志
        if let Err(err) = self
            .deps
            .fanout
            .dispatch(DomainEvent::PostCreated {
                post_id: post.id,
                author_id,
            })
            .await
        {
            warn!(post = %post.id, error = %err, "post fan-out failed, post itself is committed");
        }

        let view = PostView::project(&post, &author);
        if let Err(err) = self
            .deps
            .broadcaster
            .broadcast_room(FeedEvent::PostNew(view))
            .await
        {
            warn!(post = %post.id, error = %err, "room broadcast failed");
        }

        Ok(post)
    }

    /// 读取单条动态并原子累加浏览数。返回的是累加前读到的快照，
    /// 计数偏差一次以内可接受。
    pub async fn get_post(&self, id: PostId) -> Result<Post, ApplicationError> {
        let post = self
            .deps
            .post_repository
            .find_by_id(id)
            .await?
            .filter(|post| post.is_active)
            .ok_or_else(|| DomainError::not_found("post", id))?;
        self.deps.post_repository.increment_view(id).await?;
        Ok(post)
    }

    /// 动态流。调用者已举报（pending/reviewed）的动态在读取侧被过滤。
    pub async fn list_feed(
        &self,
        viewer: UserId,
        window: Option<GeoWindow>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Post>, ApplicationError> {
        let exclude_posts = self.deps.report_repository.hidden_post_ids(viewer).await?;
        let posts = self
            .deps
            .post_repository
            .list_active(FeedQuery {
                window,
                exclude_posts,
                limit,
                offset,
            })
            .await?;
        Ok(posts)
    }
}
