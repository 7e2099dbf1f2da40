use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Per-room fan-out channels for the two SSE audiences.
///
/// Participants and admins watch different streams: the public one
/// carries sanitized session updates, the admin one additionally
/// carries live answer activity.
pub struct RoomChannels {
    public: SseHub,
    admin: SseHub,
}

impl RoomChannels {
    /// Build both hubs with per-stream channel capacities.
    pub fn new(public_capacity: usize, admin_capacity: usize) -> Self {
        Self {
            public: SseHub::new(public_capacity),
            admin: SseHub::new(admin_capacity),
        }
    }

    /// Hub fanning out events every participant may see.
    pub fn public(&self) -> &SseHub {
        &self.public
    }

    /// Hub fanning out admin-only events.
    pub fn admin(&self) -> &SseHub {
        &self.admin
    }
}

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
