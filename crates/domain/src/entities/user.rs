use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{DeviceToken, Platform, Timestamp, UserEmail, UserId, Username};

/// 注册在某个用户名下的推送设备。
/// 同一 (platform, device_id) 组合只保留最近注册的令牌。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushDevice {
    pub token: DeviceToken,
    pub platform: Platform,
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// 外部身份系统的稳定键，唯一。
    pub identity_key: String,
    #[serde(skip_serializing)] // 邮箱不进入任何对外投影
    pub email: UserEmail,
    pub username: Username,
    pub avatar: Option<String>,
    pub anonymous_mode: bool,
    pub is_active: bool,
    pub last_seen: Timestamp,
    pub followers: Vec<UserId>,
    pub following: Vec<UserId>,
    pub push_devices: Vec<PushDevice>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn register(
        id: UserId,
        identity_key: impl Into<String>,
        email: UserEmail,
        username: Username,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            identity_key: identity_key.into(),
            email,
            username,
            avatar: None,
            anonymous_mode: false,
            is_active: true,
            last_seen: now,
            followers: Vec::new(),
            following: Vec::new(),
            push_devices: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 匿名模式下对外展示的名字。
    pub fn display_name(&self) -> &str {
        if self.anonymous_mode {
            "Anonymous"
        } else {
            self.username.as_str()
        }
    }

    pub fn follower_count(&self) -> usize {
        self.followers.len()
    }

    pub fn following_count(&self) -> usize {
        self.following.len()
    }

    pub fn is_following(&self, target: UserId) -> bool {
        self.following.contains(&target)
    }

    /// 在本用户的 following 集合上登记一次新的关注。
    /// 互补集合（对方的 followers）由应用层负责同步写入。
    pub fn add_following(&mut self, target: UserId, now: Timestamp) -> Result<(), DomainError> {
        if target == self.id {
            return Err(DomainError::SelfFollow);
        }
        if self.following.contains(&target) {
            return Err(DomainError::AlreadyFollowing);
        }
        self.following.push(target);
        self.updated_at = now;
        Ok(())
    }

    pub fn remove_following(&mut self, target: UserId, now: Timestamp) -> Result<(), DomainError> {
        let before = self.following.len();
        self.following.retain(|id| *id != target);
        if self.following.len() == before {
            return Err(DomainError::NotFollowing);
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn add_follower(&mut self, follower: UserId, now: Timestamp) {
        if !self.followers.contains(&follower) {
            self.followers.push(follower);
            self.updated_at = now;
        }
    }

    pub fn remove_follower(&mut self, follower: UserId, now: Timestamp) {
        self.followers.retain(|id| *id != follower);
        self.updated_at = now;
    }

    /// 注册推送设备。同一 (platform, device_id) 的旧令牌会被替换。
    pub fn register_push_device(&mut self, device: PushDevice, now: Timestamp) {
        self.push_devices
            .retain(|existing| {
                !(existing.platform == device.platform && existing.device_id == device.device_id)
            });
        self.push_devices.push(device);
        self.updated_at = now;
    }

    pub fn remove_push_device_by_token(&mut self, token: &DeviceToken, now: Timestamp) {
        self.push_devices.retain(|device| &device.token != token);
        self.updated_at = now;
    }

    pub fn remove_push_devices(
        &mut self,
        platform: Platform,
        device_id: Option<&str>,
        now: Timestamp,
    ) {
        self.push_devices.retain(|device| {
            device.platform != platform
                || matches!(device_id, Some(id) if device.device_id.as_deref() != Some(id))
        });
        self.updated_at = now;
    }

    pub fn touch_last_seen(&mut self, now: Timestamp) {
        self.last_seen = now;
    }

    pub fn soft_delete(&mut self, now: Timestamp) {
        self.is_active = false;
        self.updated_at = now;
    }

    pub fn restore(&mut self, now: Timestamp) {
        self.is_active = true;
        self.updated_at = now;
    }
}
