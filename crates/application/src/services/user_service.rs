//! 用户服务里与本子系统相关的切片：推送设备登记与活跃时间戳。
//! 身份注册与资料编辑属于外部协作方，不在这里。

use std::sync::Arc;

use domain::{DeviceToken, DomainError, Platform, PushDevice, User, UserId};

use crate::{clock::Clock, error::ApplicationError, repository::UserRepository};

#[derive(Debug, Clone)]
pub struct RegisterPushDeviceRequest {
    pub token: String,
    pub platform: Platform,
    pub device_id: Option<String>,
}

/// 按令牌删，或按 platform(+device_id) 批量删。
#[derive(Debug, Clone)]
pub enum RemovePushDeviceRequest {
    ByToken(String),
    ByPlatform {
        platform: Platform,
        device_id: Option<String>,
    },
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register_push_device(
        &self,
        user_id: UserId,
        request: RegisterPushDeviceRequest,
    ) -> Result<User, ApplicationError> {
        let token = DeviceToken::parse(&request.token)?;
        let mut user = self.load(user_id).await?;
        user.register_push_device(
            PushDevice {
                token,
                platform: request.platform,
                device_id: request.device_id,
            },
            self.deps.clock.now(),
        );
        Ok(self.deps.user_repository.update(user).await?)
    }

    pub async fn remove_push_device(
        &self,
        user_id: UserId,
        request: RemovePushDeviceRequest,
    ) -> Result<User, ApplicationError> {
        let mut user = self.load(user_id).await?;
        let now = self.deps.clock.now();
        match request {
            RemovePushDeviceRequest::ByToken(token) => {
                let token = DeviceToken::parse(&token)?;
                user.remove_push_device_by_token(&token, now);
            }
            RemovePushDeviceRequest::ByPlatform {
                platform,
                device_id,
            } => {
                user.remove_push_devices(platform, device_id.as_deref(), now);
            }
        }
        Ok(self.deps.user_repository.update(user).await?)
    }

    pub async fn update_last_seen(&self, user_id: UserId) -> Result<(), ApplicationError> {
        let mut user = self.load(user_id).await?;
        user.touch_last_seen(self.deps.clock.now());
        self.deps.user_repository.update(user).await?;
        Ok(())
    }

    async fn load(&self, user_id: UserId) -> Result<User, ApplicationError> {
        Ok(self
            .deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| DomainError::not_found("user", user_id))?)
    }
}
