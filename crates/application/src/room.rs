//! 单个聊天室的运行期状态
//!
//! 历史消息、订阅者集合和房间锁作为一个值一起创建、一起销毁。
//! 房间锁是该房间内 `send` 与 `subscribe` 的串行化点。

use std::collections::HashSet;

use domain::{ChatMessage, RoomId};
use tokio::sync::Mutex;

use crate::error::ApplicationError;
use crate::sink::{SinkId, Subscriber, SubscriberSet};

#[derive(Default)]
struct RoomInner {
    history: Vec<ChatMessage>,
    sinks: SubscriberSet,
    pruned: bool,
}

pub struct RoomState {
    id: RoomId,
    inner: Mutex<RoomInner>,
}

impl RoomState {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            inner: Mutex::new(RoomInner::default()),
        }
    }

    /// 加入订阅者并按原始顺序回放全部历史。
    ///
    /// 已加入的订阅者不会再次回放，返回回放的消息数。
    pub async fn attach(&self, subscriber: &Subscriber) -> Result<usize, ApplicationError> {
        let mut inner = self.inner.lock().await;
        if inner.pruned {
            return Err(ApplicationError::room_not_found(self.id));
        }
        if !inner.sinks.insert(subscriber) {
            tracing::debug!(room_id = %self.id, sink_id = %subscriber.id, "订阅者已在聊天室中，跳过回放");
            return Ok(0);
        }

        for message in &inner.history {
            subscriber.deliver(message.to_json()?);
        }
        Ok(inner.history.len())
    }

    /// 追加消息并扇出给当前所有订阅者，返回成功投递数
    pub async fn publish(&self, message: ChatMessage) -> Result<usize, ApplicationError> {
        let payload = message.to_json()?;

        let mut inner = self.inner.lock().await;
        if inner.pruned {
            return Err(ApplicationError::room_not_found(self.id));
        }
        inner.history.push(message);
        Ok(inner.sinks.broadcast(&payload))
    }

    /// 移除订阅者；不存在的订阅者视为无操作
    pub async fn detach(&self, id: SinkId) -> Result<bool, ApplicationError> {
        let mut inner = self.inner.lock().await;
        if inner.pruned {
            return Err(ApplicationError::room_not_found(self.id));
        }
        Ok(inner.sinks.remove(id))
    }

    /// 剔除 `excluded` 后没有剩余订阅者时标记为已回收并返回 true。
    ///
    /// 调用方必须持有注册表写锁，并在返回 true 后立即把房间移出注册表。
    pub(crate) async fn mark_pruned_if_vacant(&self, excluded: &HashSet<SinkId>) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.pruned {
            return false;
        }
        if inner.sinks.ids().any(|id| !excluded.contains(&id)) {
            return false;
        }

        inner.pruned = true;
        inner.history.clear();
        inner.sinks = SubscriberSet::new();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::SenderRole;

    #[tokio::test]
    async fn test_attach_replays_history_in_order() {
        let room = RoomState::new(RoomId::generate());
        let first = ChatMessage::new(SenderRole::Customer, "one");
        let second = ChatMessage::new(SenderRole::Agent, "two");
        room.publish(first.clone()).await.unwrap();
        room.publish(second.clone()).await.unwrap();

        let (subscriber, mut rx) = Subscriber::channel();
        assert_eq!(room.attach(&subscriber).await.unwrap(), 2);

        assert_eq!(rx.try_recv().unwrap(), first.to_json().unwrap());
        assert_eq!(rx.try_recv().unwrap(), second.to_json().unwrap());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_attach_does_not_replay_again() {
        let room = RoomState::new(RoomId::generate());
        room.publish(ChatMessage::new(SenderRole::Customer, "hi"))
            .await
            .unwrap();

        let (subscriber, mut rx) = Subscriber::channel();
        room.attach(&subscriber).await.unwrap();
        assert_eq!(room.attach(&subscriber).await.unwrap(), 0);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_pruned_room_rejects_operations() {
        let room = RoomState::new(RoomId::generate());
        assert!(room.mark_pruned_if_vacant(&HashSet::new()).await);

        let (subscriber, _rx) = Subscriber::channel();
        let err = room.attach(&subscriber).await.unwrap_err();
        assert!(err.is_room_not_found());
        let err = room
            .publish(ChatMessage::new(SenderRole::Customer, "late"))
            .await
            .unwrap_err();
        assert!(err.is_room_not_found());
    }

    #[tokio::test]
    async fn test_vacancy_ignores_excluded_sinks() {
        let room = RoomState::new(RoomId::generate());
        let (dashboard, _rx1) = Subscriber::channel();
        let (customer, _rx2) = Subscriber::channel();
        room.attach(&dashboard).await.unwrap();
        room.attach(&customer).await.unwrap();

        let excluded: HashSet<SinkId> = [dashboard.id].into_iter().collect();
        assert!(!room.mark_pruned_if_vacant(&excluded).await);

        room.detach(customer.id).await.unwrap();
        assert!(room.mark_pruned_if_vacant(&excluded).await);
    }
}
