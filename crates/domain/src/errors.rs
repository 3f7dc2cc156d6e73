//! 领域模型错误定义

use thiserror::Error;

use crate::value_objects::RoomId;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 聊天室不存在（从未创建或已被回收，二者不可区分）
    #[error("聊天室不存在: {room_id}")]
    RoomNotFound { room_id: RoomId },

    /// 入站负载无法解析
    #[error("无效的消息负载: {message}")]
    InvalidPayload { message: String },
}

impl DomainError {
    /// 创建聊天室不存在错误
    pub fn room_not_found(room_id: RoomId) -> Self {
        Self::RoomNotFound { room_id }
    }

    /// 创建无效负载错误
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
