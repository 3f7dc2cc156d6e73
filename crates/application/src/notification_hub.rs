//! 客服面板通知通道
//!
//! 全局唯一的订阅者集合，与任何聊天室的锁相互独立。
//! 需要聊天室快照时在持有本锁期间短暂获取注册表读锁（加锁顺序 通知 -> 注册表），
//! 这样通知按发出顺序送达，最后送达的一条总是反映最新的聊天室集合。

use std::collections::HashSet;
use std::future::Future;

use domain::ChatNotification;
use tokio::sync::Mutex;

use crate::error::ApplicationError;
use crate::sink::{SinkId, Subscriber, SubscriberSet};

#[derive(Default)]
pub struct NotificationHub {
    subscribers: Mutex<SubscriberSet>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入订阅者，并立即向它单独发送一条由 `snapshot` 生成的通知
    pub async fn subscribe<F, Fut>(
        &self,
        subscriber: &Subscriber,
        snapshot: F,
    ) -> Result<(), ApplicationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ChatNotification>,
    {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.insert(subscriber);

        let notification = snapshot().await;
        subscriber.deliver(notification.to_json()?);
        Ok(())
    }

    pub async fn unsubscribe(&self, id: SinkId) -> bool {
        self.subscribers.lock().await.remove(id)
    }

    /// 扇出给当前所有订阅者，返回成功投递数
    pub async fn publish(&self, notification: &ChatNotification) -> Result<usize, ApplicationError> {
        let payload = notification.to_json()?;
        let subscribers = self.subscribers.lock().await;
        Ok(subscribers.broadcast(&payload))
    }

    /// 在持有订阅者锁期间生成通知再扇出
    pub async fn publish_with<F, Fut>(&self, build: F) -> Result<usize, ApplicationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ChatNotification>,
    {
        let subscribers = self.subscribers.lock().await;
        let payload = build().await.to_json()?;
        Ok(subscribers.broadcast(&payload))
    }

    pub async fn subscriber_ids(&self) -> HashSet<SinkId> {
        self.subscribers.lock().await.ids().collect()
    }

    pub async fn len(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}
