use std::sync::Arc;

use application::ChatBroker;

#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<ChatBroker>,
}

impl AppState {
    pub fn new(broker: Arc<ChatBroker>) -> Self {
        Self { broker }
    }
}
