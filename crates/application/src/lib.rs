//! 应用层实现。
//!
//! 这里是进程内的聊天中转核心：聊天室注册表、按房间的消息扇出、
//! 以及面向客服面板的通知通道。传输层只通过 [`ChatBroker`] 调用这里。

pub mod broker;
pub mod error;
pub mod notification_hub;
pub mod registry;
pub mod room;
pub mod sink;

pub use broker::ChatBroker;
pub use error::ApplicationError;
pub use notification_hub::NotificationHub;
pub use registry::RoomRegistry;
pub use sink::{ChannelSink, MessageSink, SinkError, SinkId, Subscriber, SubscriberSet};
