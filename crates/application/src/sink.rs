//! 连接投递端抽象
//!
//! 核心不关心单个连接的收发细节，只依赖"能异步接收一段文本、远端随时可能消失"这一能力。
//! 每个连接由传输层分配一个 [`SinkId`]，集合中的相等性只按该标识判断。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// 连接投递端的不透明标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(Uuid);

impl SinkId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("sink closed")]
    Closed,
}

/// 可接收序列化文本的投递端
///
/// `send_text` 只负责把负载放入连接自己的发送队列，不等待远端确认，
/// 因此可以在持有房间锁时调用。
#[cfg_attr(test, mockall::automock)]
pub trait MessageSink: Send + Sync {
    fn send_text(&self, payload: String) -> Result<(), SinkError>;
}

/// 基于无界 mpsc 通道的投递端，接收端由连接的写任务消费
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl MessageSink for ChannelSink {
    fn send_text(&self, payload: String) -> Result<(), SinkError> {
        self.sender.send(payload).map_err(|_| SinkError::Closed)
    }
}

/// 交给核心的订阅句柄：标识 + 投递端
#[derive(Clone)]
pub struct Subscriber {
    pub id: SinkId,
    pub sink: Arc<dyn MessageSink>,
}

impl Subscriber {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            id: SinkId::generate(),
            sink,
        }
    }

    /// 创建基于通道的订阅者，返回其接收端
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sink, receiver) = ChannelSink::new();
        (Self::new(Arc::new(sink)), receiver)
    }

    /// 尽力投递，失败只记录日志
    pub fn deliver(&self, payload: String) -> bool {
        deliver(self.id, self.sink.as_ref(), payload)
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}

fn deliver(id: SinkId, sink: &dyn MessageSink, payload: String) -> bool {
    match sink.send_text(payload) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(sink_id = %id, error = %err, "Failed to deliver payload to sink");
            false
        }
    }
}

/// 按标识去重的投递端集合
#[derive(Default)]
pub struct SubscriberSet {
    sinks: HashMap<SinkId, Arc<dyn MessageSink>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已存在时返回 false，不替换原有投递端
    pub fn insert(&mut self, subscriber: &Subscriber) -> bool {
        if self.sinks.contains_key(&subscriber.id) {
            return false;
        }
        self.sinks.insert(subscriber.id, subscriber.sink.clone());
        true
    }

    pub fn remove(&mut self, id: SinkId) -> bool {
        self.sinks.remove(&id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = SinkId> + '_ {
        self.sinks.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// 向集合中每个投递端独立投递，单个失败不影响其他投递端。返回成功数。
    pub fn broadcast(&self, payload: &str) -> usize {
        let mut delivered = 0;
        let mut failed = 0;
        for (id, sink) in &self.sinks {
            if deliver(*id, sink.as_ref(), payload.to_owned()) {
                delivered += 1;
            } else {
                failed += 1;
            }
        }

        if failed > 0 {
            tracing::warn!(failed, delivered, "Broadcast failed for some sinks");
        }
        delivered
    }
}
