pub mod comment;
pub mod engagement;
pub mod notification;
pub mod post;
pub mod report;
pub mod user;

pub use comment::{Comment, CommentReport};
pub use engagement::{LikeEntry, LikeToggle};
pub use notification::{Notification, NotificationKind};
pub use post::{MediaKind, MediaRef, Post};
pub use report::{Report, ReportCategory, ReportStatus};
pub use user::{PushDevice, User};
