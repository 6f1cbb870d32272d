//! 进程内广播总线。
//!
//! 房间是一条全局 broadcast 通道；私有通道按用户懒创建，保存在
//! RwLock<HashMap> 里。发送是 fire-and-forget：没有订阅者时直接返回 Ok，
//! 发送侧永远不会为离线用户创建通道。

use std::collections::HashMap;

use application::broadcaster::{BroadcastError, EventBroadcaster, FeedEvent, UserEvent};
use async_trait::async_trait;
use domain::UserId;
use tokio::sync::{broadcast, RwLock};

pub struct LocalEventBroadcaster {
    room: broadcast::Sender<FeedEvent>,
    user_channels: RwLock<HashMap<UserId, broadcast::Sender<UserEvent>>>,
    capacity: usize,
}

impl LocalEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (room, _) = broadcast::channel(capacity);
        Self {
            room,
            user_channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// 订阅公共动态房间。
    pub fn subscribe_room(&self) -> broadcast::Receiver<FeedEvent> {
        self.room.subscribe()
    }

    /// 订阅某用户的私有通道。订阅侧负责创建通道。
    pub async fn subscribe_user(&self, user_id: UserId) -> broadcast::Receiver<UserEvent> {
        let mut channels = self.user_channels.write().await;
        channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// 客户端全部断开后回收通道。
    pub async fn drop_user_channel(&self, user_id: UserId) {
        let mut channels = self.user_channels.write().await;
        if let Some(sender) = channels.get(&user_id) {
            if sender.receiver_count() == 0 {
                channels.remove(&user_id);
            }
        }
    }
}

#[async_trait]
impl EventBroadcaster for LocalEventBroadcaster {
    async fn broadcast_room(&self, event: FeedEvent) -> Result<(), BroadcastError> {
        if self.room.receiver_count() == 0 {
            return Ok(());
        }
        self.room
            .send(event)
            .map_err(|err| BroadcastError::failed(err.to_string()))?;
        Ok(())
    }

    async fn broadcast_user(
        &self,
        user_id: UserId,
        event: UserEvent,
    ) -> Result<(), BroadcastError> {
        let channels = self.user_channels.read().await;
        let Some(sender) = channels.get(&user_id) else {
            // 用户不在线，通知行已落库，无需投递
            return Ok(());
        };
        if sender.receiver_count() == 0 {
            return Ok(());
        }
        sender
            .send(event)
            .map_err(|err| BroadcastError::failed(err.to_string()))?;
        Ok(())
    }
}
