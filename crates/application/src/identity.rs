use async_trait::async_trait;
use domain::UserId;
use thiserror::Error;

/// 已解析的调用方。`is_admin` 决定软删除/审核等越权操作是否放行。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Caller {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid credential")]
    InvalidCredential,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// 身份网关。由外部身份系统实现，将请求携带的凭证解析为稳定的用户标识。
#[async_trait]
pub trait IdentityGate: Send + Sync {
    async fn resolve_caller(&self, credential: &str) -> Result<Caller, IdentityError>;
}
