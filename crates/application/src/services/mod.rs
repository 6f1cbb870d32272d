//! 用例服务。

mod comment_service;
mod engagement_service;
mod notification_service;
mod post_service;
mod user_service;

pub use comment_service::{CommentService, CommentServiceDependencies, CreateCommentRequest};
pub use engagement_service::{
    DeleteTarget, EngagementService, EngagementServiceDependencies, FollowDirection, FollowOutcome,
    LikeOutcome, LikeTarget, SubmitReportRequest,
};
pub use notification_service::{NotificationService, NotificationServiceDependencies};
pub use post_service::{CreatePostRequest, PostService, PostServiceDependencies};
pub use user_service::{
    RegisterPushDeviceRequest, RemovePushDeviceRequest, UserService, UserServiceDependencies,
};

#[cfg(test)]
pub(crate) mod support;

#[cfg(test)]
mod user_service_tests;
