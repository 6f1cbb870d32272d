use thiserror::Error;

/// 领域层错误类型。
///
/// Validation/NotFound/NotAuthorized 以及各类冲突错误会原样传播给调用方，
/// 由外层映射为对应的响应状态（4xx 一族）。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("cannot follow yourself")]
    SelfFollow,

    #[error("already following this user")]
    AlreadyFollowing,

    #[error("not following this user")]
    NotFollowing,

    #[error("post already reported by this user")]
    DuplicateReport,

    #[error("not authorized: {action}")]
    NotAuthorized { action: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("coordinates outside the service area")]
    OutsideServiceArea,
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_authorized(action: impl Into<String>) -> Self {
        Self::NotAuthorized {
            action: action.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// 实体存储错误类型。
///
/// 存储属于外部协作方，这里只约定错误形状：NotFound 用于按 ID 更新时目标
/// 缺失，Conflict 用于唯一约束冲突（例如重复举报）。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("record not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}
