//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：互动引擎（点赞/关注/举报/软删除）、
//! 扇出协调器、推送分发器，以及对外部协作方（实体存储、身份网关、
//! 广播总线、推送供应商）的抽象接口。

pub mod broadcaster;
pub mod clock;
pub mod error;
pub mod fanout;
pub mod identity;
pub mod push;
pub mod repository;
pub mod services;

pub use broadcaster::{AuthorView, BroadcastError, CommentView, EventBroadcaster, FeedEvent, PostView, UserEvent};
pub use clock::{Clock, SystemClock};
pub use error::ApplicationError;
pub use fanout::{FanOutCoordinator, FanOutCoordinatorDependencies, FanOutReceipt};
pub use identity::{Caller, IdentityError, IdentityGate};
pub use push::{
    DispatchSummary, PushDispatcher, PushGateway, PushGatewayError, PushMessage, PushReceipt,
};
pub use repository::{
    CommentRepository, FeedQuery, GeoWindow, NotificationRepository, PostRepository,
    ReportRepository, UserRepository,
};
pub use services::{
    CommentService, CommentServiceDependencies, CreateCommentRequest, CreatePostRequest,
    DeleteTarget, EngagementService, EngagementServiceDependencies, FollowDirection,
    FollowOutcome, LikeOutcome, LikeTarget, NotificationService, NotificationServiceDependencies,
    PostService, PostServiceDependencies, RegisterPushDeviceRequest, RemovePushDeviceRequest,
    SubmitReportRequest, UserService, UserServiceDependencies,
};
