//! 领域实体定义
//!
//! 包含系统的核心实体：聊天室、消息、通知。

pub mod chatroom;
pub mod message;
pub mod notification;

// 重新导出核心实体
pub use chatroom::ChatRoom;
pub use message::{ChatMessage, IncomingMessage, SenderRole};
pub use notification::{ChatNotification, NotificationKind};
