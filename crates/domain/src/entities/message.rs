//! 消息实体定义
//!
//! 出站消息的线上格式为 `{"sender": ..., "text": ..., "id": ...}`。
//! 入站负载只携带 `text`（以及可选的 `id`），`sender` 由接收负载的端点注入，
//! 从不信任客户端提供的值。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::MessageId;

/// 发送者角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    /// 客户
    Customer,
    /// 客服
    Agent,
}

impl fmt::Display for SenderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderRole::Customer => write!(f, "customer"),
            SenderRole::Agent => write!(f, "agent"),
        }
    }
}

/// 消息实体，构造后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// 发送者角色
    pub sender: SenderRole,
    /// 消息内容
    pub text: String,
    /// 消息唯一ID
    pub id: MessageId,
}

impl ChatMessage {
    /// 创建新消息并生成ID
    pub fn new(sender: SenderRole, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            id: MessageId::generate(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// 客户端发来的消息负载
///
/// 未知字段（包括客户端自带的 `sender`）会被忽略。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub id: Option<MessageId>,
}

impl IncomingMessage {
    /// 解析入站 JSON 文本
    pub fn parse(payload: &str) -> DomainResult<Self> {
        serde_json::from_str(payload).map_err(|err| DomainError::invalid_payload(err.to_string()))
    }

    /// 注入发送者角色，生成完整消息；未提供ID时生成新ID
    pub fn into_message(self, sender: SenderRole) -> ChatMessage {
        ChatMessage {
            sender,
            text: self.text,
            id: self.id.unwrap_or_else(MessageId::generate),
        }
    }
}
