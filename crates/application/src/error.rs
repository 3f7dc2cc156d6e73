use domain::{DomainError, RoomId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApplicationError {
    pub fn room_not_found(room_id: RoomId) -> Self {
        ApplicationError::Domain(DomainError::room_not_found(room_id))
    }

    pub fn is_room_not_found(&self) -> bool {
        matches!(
            self,
            ApplicationError::Domain(DomainError::RoomNotFound { .. })
        )
    }
}
