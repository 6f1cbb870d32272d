//! 实体存储契约。
//!
//! 存储本身是外部协作方，这里只定义应用层依赖的 CRUD/查询形状。
//! 点赞与浏览计数被表达为存储侧的原子操作，避免跨两次往返的读改写。

use async_trait::async_trait;
use domain::{
    Comment, CommentId, Coordinates, LikeToggle, Notification, NotificationId, Post, PostId,
    Report, ReportStatus, RepositoryError, Timestamp, User, UserId,
};

/// 以某个坐标为中心的近邻查询窗口（边界框近似）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoWindow {
    pub center: Coordinates,
    pub max_distance_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    pub window: Option<GeoWindow>,
    /// 查询时被排除的动态（调用者已举报的）。
    pub exclude_posts: Vec<PostId>,
    pub limit: u32,
    pub offset: u32,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_identity_key(&self, key: &str) -> Result<Option<User>, RepositoryError>;
    /// 批量取用户（受众水合用），顺序不保证。
    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: Post) -> Result<Post, RepositoryError>;
    async fn update(&self, post: Post) -> Result<Post, RepositoryError>;
    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, RepositoryError>;
    /// 存储侧原子点赞开关。目标缺失或已软删时返回 None。
    async fn toggle_like(
        &self,
        id: PostId,
        actor: UserId,
        now: Timestamp,
    ) -> Result<Option<LikeToggle>, RepositoryError>;
    /// 原子浏览计数。
    async fn increment_view(&self, id: PostId) -> Result<(), RepositoryError>;
    async fn list_active(&self, query: FeedQuery) -> Result<Vec<Post>, RepositoryError>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: Comment) -> Result<Comment, RepositoryError>;
    async fn update(&self, comment: Comment) -> Result<Comment, RepositoryError>;
    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError>;
    async fn toggle_like(
        &self,
        id: CommentId,
        actor: UserId,
        now: Timestamp,
    ) -> Result<Option<LikeToggle>, RepositoryError>;
    /// 某动态下的活跃顶层评论，按创建时间排序。
    async fn list_for_post(
        &self,
        post_id: PostId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Comment>, RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// 单次批量插入。扇出契约要求这一步在触发请求返回前完成，
    /// 且要么全部写入要么整体失败，不留部分通知集。
    async fn create_batch(
        &self,
        notifications: Vec<Notification>,
    ) -> Result<Vec<Notification>, RepositoryError>;
    async fn find_by_id(&self, id: NotificationId)
        -> Result<Option<Notification>, RepositoryError>;
    async fn list_for_recipient(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, RepositoryError>;
    /// 标记已读，按接收者限定；目标不存在或不属于该接收者时返回 None。
    async fn mark_read(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> Result<Option<Notification>, RepositoryError>;
    /// 返回实际修改的条数。
    async fn mark_all_read(&self, recipient: UserId) -> Result<u64, RepositoryError>;
    /// 接收者删除自己的通知；不存在时返回 false。
    async fn delete(&self, id: NotificationId, recipient: UserId)
        -> Result<bool, RepositoryError>;
    async fn count_unread(&self, recipient: UserId) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// 创建举报。(reporter, reported_post) 唯一约束冲突映射为
    /// `RepositoryError::Conflict`。
    async fn create(&self, report: Report) -> Result<Report, RepositoryError>;
    async fn update(&self, report: Report) -> Result<Report, RepositoryError>;
    async fn exists(&self, reporter: UserId, post: PostId) -> Result<bool, RepositoryError>;
    async fn find_by_id(
        &self,
        id: domain::ReportId,
    ) -> Result<Option<Report>, RepositoryError>;
    async fn list_by_status(
        &self,
        status: ReportStatus,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Report>, RepositoryError>;
    /// 该举报人仍处于 pending/reviewed 状态的被举报动态，用于读取侧过滤。
    async fn hidden_post_ids(&self, reporter: UserId) -> Result<Vec<PostId>, RepositoryError>;
}
