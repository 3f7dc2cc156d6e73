//! 聊天室注册表
//!
//! 注册表锁只在读写 `RoomId -> RoomState` 映射时短暂持有，从不在持有期间等待投递。
//! 加锁顺序固定为 注册表 -> 房间。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use domain::{ChatRoom, RoomId};
use tokio::sync::RwLock;

use crate::error::ApplicationError;
use crate::room::RoomState;
use crate::sink::SinkId;

#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, Arc<RoomState>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 生成新标识并一次性装入空历史、空订阅者集合与房间锁
    pub async fn create(&self) -> ChatRoom {
        let room = ChatRoom::new();
        let mut rooms = self.rooms.write().await;
        rooms.insert(room.id, Arc::new(RoomState::new(room.id)));
        room
    }

    pub async fn get(&self, room_id: RoomId) -> Result<ChatRoom, ApplicationError> {
        let rooms = self.rooms.read().await;
        if rooms.contains_key(&room_id) {
            Ok(ChatRoom { id: room_id })
        } else {
            Err(ApplicationError::room_not_found(room_id))
        }
    }

    pub async fn list(&self) -> Vec<ChatRoom> {
        self.room_ids()
            .await
            .into_iter()
            .map(|id| ChatRoom { id })
            .collect()
    }

    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.read().await.keys().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// 取出房间状态的共享引用，返回前释放注册表锁
    pub async fn state(&self, room_id: RoomId) -> Result<Arc<RoomState>, ApplicationError> {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .cloned()
            .ok_or_else(|| ApplicationError::room_not_found(room_id))
    }

    /// 房间中除 `excluded` 外没有订阅者时整体移除，返回是否发生了回收。
    ///
    /// 房间已不存在（例如被并发回收）时返回 false。
    pub async fn try_prune(&self, room_id: RoomId, excluded: &HashSet<SinkId>) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(state) = rooms.get(&room_id).cloned() else {
            return false;
        };
        if !state.mark_pruned_if_vacant(excluded).await {
            return false;
        }
        rooms.remove(&room_id);
        true
    }
}
