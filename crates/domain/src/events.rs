use crate::value_objects::{CommentId, PostId, UserId};

/// 已完成状态变更的事实。扇出协调器据此解析受众并产生通知。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    PostCreated {
        post_id: PostId,
        author_id: UserId,
    },
    CommentCreated {
        comment_id: CommentId,
        post_id: PostId,
        commenter_id: UserId,
        parent_comment_id: Option<CommentId>,
    },
    FollowerAdded {
        follower_id: UserId,
        followee_id: UserId,
    },
}
