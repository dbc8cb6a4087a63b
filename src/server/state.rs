use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::connection_manager::{ClientRegistry, RoomRegistry};
use crate::signaling::MessageRouter;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub clients: Arc<ClientRegistry>,
    pub rooms: Arc<RoomRegistry>,
    pub router: Arc<MessageRouter>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let clients = Arc::new(ClientRegistry::new());
        let rooms = Arc::new(RoomRegistry::with_pruning(settings.rooms.prune_empty));
        let router = Arc::new(MessageRouter::new(clients.clone(), rooms.clone()));

        Self {
            settings: Arc::new(settings),
            clients,
            rooms,
            router,
            start_time: Instant::now(),
        }
    }
}
