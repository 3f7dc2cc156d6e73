//! Web API 层。
//!
//! 提供 Axum 路由，把 HTTP / WebSocket 请求委托给应用层的 [`application::ChatBroker`]。

mod error;
mod routes;
mod state;
mod ws_connection;

pub use error::ApiError;
pub use routes::{router, ROOM_COOKIE};
pub use state::AppState;
