//! 聊天中转门面
//!
//! 传输层的唯一入口，协调注册表、按房间的消息扇出和通知通道。
//! 三把锁各自独立，任何操作都不会长时间同时持有其中两把：
//! - 注册表锁：只在读写房间映射时持有；
//! - 房间锁：串行化同一房间的 `send` / `subscribe`；
//! - 通知锁：保护客服面板订阅者集合。

use domain::{ChatMessage, ChatNotification, ChatRoom, RoomId};

use crate::error::ApplicationError;
use crate::notification_hub::NotificationHub;
use crate::registry::RoomRegistry;
use crate::sink::{SinkId, Subscriber};

/// 进程内唯一的中转实例，启动时创建后以引用传给所有连接处理器
#[derive(Default)]
pub struct ChatBroker {
    registry: RoomRegistry,
    notifications: NotificationHub,
}

impl ChatBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建聊天室，并通知所有客服面板
    pub async fn create_room(&self) -> ChatRoom {
        let room = self.registry.create().await;
        tracing::info!(room_id = %room.id, "聊天室已创建");

        self.publish_rooms_updated().await;
        room
    }

    pub async fn get_room(&self, room_id: RoomId) -> Result<ChatRoom, ApplicationError> {
        self.registry.get(room_id).await
    }

    /// 当前所有活跃聊天室，顺序不保证
    pub async fn list_rooms(&self) -> Vec<ChatRoom> {
        self.registry.list().await
    }

    /// 加入聊天室，返回前已按顺序回放全部历史
    pub async fn subscribe(
        &self,
        room_id: RoomId,
        subscriber: &Subscriber,
    ) -> Result<(), ApplicationError> {
        let state = self.registry.state(room_id).await?;
        let replayed = state.attach(subscriber).await?;

        tracing::info!(
            room_id = %room_id,
            sink_id = %subscriber.id,
            replayed,
            "客户端已加入聊天室"
        );
        Ok(())
    }

    /// 离开聊天室，随后检查是否需要回收该房间
    pub async fn unsubscribe(
        &self,
        room_id: RoomId,
        sink_id: SinkId,
    ) -> Result<(), ApplicationError> {
        let state = self.registry.state(room_id).await?;
        let removed = state.detach(sink_id).await?;

        if removed {
            tracing::info!(room_id = %room_id, sink_id = %sink_id, "客户端已离开聊天室");
        }

        self.try_prune(room_id).await;
        Ok(())
    }

    /// 追加消息到历史并扇出给当前所有订阅者
    pub async fn send(&self, room_id: RoomId, message: ChatMessage) -> Result<(), ApplicationError> {
        let state = self.registry.state(room_id).await?;
        let message_id = message.id.clone();
        let delivered = state.publish(message).await?;

        tracing::debug!(room_id = %room_id, message_id = %message_id, delivered, "消息已扇出");
        Ok(())
    }

    /// 订阅聊天室变化通知，并立即收到一份当前聊天室快照
    pub async fn subscribe_notifications(
        &self,
        subscriber: &Subscriber,
    ) -> Result<(), ApplicationError> {
        let registry = &self.registry;
        self.notifications
            .subscribe(subscriber, move || async move {
                ChatNotification::rooms_updated(registry.room_ids().await)
            })
            .await?;

        tracing::info!(sink_id = %subscriber.id, "客服面板已订阅通知");
        Ok(())
    }

    pub async fn unsubscribe_notifications(&self, sink_id: SinkId) {
        if self.notifications.unsubscribe(sink_id).await {
            tracing::info!(sink_id = %sink_id, "客服面板已取消订阅通知");
        }
    }

    /// 把通知扇出给所有客服面板，返回成功投递数
    pub async fn notify(&self, notification: &ChatNotification) -> Result<usize, ApplicationError> {
        self.notifications.publish(notification).await
    }

    pub async fn room_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn notification_subscriber_count(&self) -> usize {
        self.notifications.len().await
    }

    /// 房间中除客服面板订阅者外已无人时回收
    async fn try_prune(&self, room_id: RoomId) {
        let excluded = self.notifications.subscriber_ids().await;
        if !self.registry.try_prune(room_id, &excluded).await {
            return;
        }

        tracing::info!(room_id = %room_id, "聊天室已回收");
        self.publish_rooms_updated().await;
    }

    async fn publish_rooms_updated(&self) {
        let registry = &self.registry;
        let result = self
            .notifications
            .publish_with(move || async move {
                ChatNotification::rooms_updated(registry.room_ids().await)
            })
            .await;

        if let Err(err) = result {
            tracing::error!(error = %err, "Failed to publish rooms update");
        }
    }
}
