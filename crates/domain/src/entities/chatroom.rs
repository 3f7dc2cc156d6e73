//! 聊天室实体定义

use serde::{Deserialize, Serialize};

use crate::value_objects::RoomId;

/// 聊天室实体
///
/// 一次客服会话的上下文。历史消息和订阅者等运行期状态由应用层的注册表持有，
/// 实体本身只携带标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatRoom {
    /// 聊天室唯一ID
    pub id: RoomId,
}

impl ChatRoom {
    /// 创建新的聊天室，标识总是新生成的
    pub fn new() -> Self {
        Self {
            id: RoomId::generate(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Default for ChatRoom {
    fn default() -> Self {
        Self::new()
    }
}
