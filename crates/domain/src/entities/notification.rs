//! 通知实体定义

use serde::{Deserialize, Serialize};

use crate::value_objects::{NotificationId, RoomId};

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// 活跃聊天室集合发生变化
    RoomsUpdated,
}

/// 推送给客服面板的通知
///
/// 携带完整的聊天室ID快照而不是增量，只在线推送，从不存储。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatNotification {
    pub kind: NotificationKind,
    pub room_ids: Vec<RoomId>,
    pub id: NotificationId,
}

impl ChatNotification {
    /// 创建聊天室集合变化通知
    pub fn rooms_updated(room_ids: Vec<RoomId>) -> Self {
        Self {
            kind: NotificationKind::RoomsUpdated,
            room_ids,
            id: NotificationId::generate(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
