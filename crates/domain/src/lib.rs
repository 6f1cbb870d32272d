//! 地理社交动态系统核心领域模型
//!
//! 包含用户、动态、评论、通知、举报等核心实体，以及相关的业务规则。
//! 领域层不做任何 I/O，持久化与投递由外层适配器实现。

pub mod entities;
pub mod errors;
pub mod events;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use events::*;
pub use value_objects::*;
