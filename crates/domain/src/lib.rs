//! 在线客服聊天核心领域模型
//!
//! 包含聊天室、消息、通知等值对象，只负责标识生成与序列化，不包含任何并发逻辑。

pub mod entities;
pub mod errors;
pub mod value_objects;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use value_objects::*;
