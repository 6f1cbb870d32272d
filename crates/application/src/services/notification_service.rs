//! 通知读取与已读状态。
//!
//! 所有读写都以接收者限定范围，用户只能触达自己的通知行。
//! 批量标记已读会往接收者的私有通道推一条 notifications_read，
//! 让同一账号的其他在线设备同步角标。

use std::sync::Arc;

use domain::{DomainError, Notification, NotificationId, UserId};
use tracing::warn;

use crate::{
    broadcaster::{EventBroadcaster, UserEvent},
    error::ApplicationError,
    repository::NotificationRepository,
};

pub struct NotificationServiceDependencies {
    pub notification_repository: Arc<dyn NotificationRepository>,
    pub broadcaster: Arc<dyn EventBroadcaster>,
}

pub struct NotificationService {
    deps: NotificationServiceDependencies,
}

impl NotificationService {
    pub fn new(deps: NotificationServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn list(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, ApplicationError> {
        Ok(self
            .deps
            .notification_repository
            .list_for_recipient(recipient, unread_only, limit, offset)
            .await?)
    }

    pub async fn unread_count(&self, recipient: UserId) -> Result<u64, ApplicationError> {
        Ok(self
            .deps
            .notification_repository
            .count_unread(recipient)
            .await?)
    }

    pub async fn mark_read(
        &self,
        recipient: UserId,
        id: NotificationId,
    ) -> Result<Notification, ApplicationError> {
        self.deps
            .notification_repository
            .mark_read(id, recipient)
            .await?
            .ok_or_else(|| DomainError::not_found("notification", id).into())
    }

    pub async fn mark_all_read(&self, recipient: UserId) -> Result<u64, ApplicationError> {
        let modified_count = self
            .deps
            .notification_repository
            .mark_all_read(recipient)
            .await?;

        if let Err(err) = self
            .deps
            .broadcaster
            .broadcast_user(
                recipient,
                UserEvent::NotificationsRead {
                    user_id: recipient,
                    modified_count,
                },
            )
            .await
        {
            warn!(recipient = %recipient, error = %err, "notifications_read broadcast failed");
        }

        Ok(modified_count)
    }

    pub async fn delete(
        &self,
        recipient: UserId,
        id: NotificationId,
    ) -> Result<(), ApplicationError> {
        if !self.deps.notification_repository.delete(id, recipient).await? {
            return Err(DomainError::not_found("notification", id).into());
        }
        Ok(())
    }
}
