use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::events::ServerEvent;

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

/// Registry of per-game SSE hubs.
///
/// Hubs are created on first use and kept for the lifetime of the process,
/// matching the retention of the games themselves.
pub struct EventStreams {
    hubs: DashMap<Uuid, Arc<SseHub>>,
    capacity: usize,
}

impl EventStreams {
    /// Build the registry with a per-hub channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    fn hub(&self, game_id: Uuid) -> Arc<SseHub> {
        self.hubs
            .entry(game_id)
            .or_insert_with(|| Arc::new(SseHub::new(self.capacity)))
            .clone()
    }

    /// Register a subscriber for one game's event stream.
    pub fn subscribe(&self, game_id: Uuid) -> broadcast::Receiver<ServerEvent> {
        self.hub(game_id).subscribe()
    }

    /// Fan an event out to the game's current subscribers.
    pub fn broadcast(&self, game_id: Uuid, event: ServerEvent) {
        self.hub(game_id).broadcast(event);
    }
}
