pub mod room;
pub mod session;
mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    config::AppConfig, error::ServiceError, model::question::QuestionBank, store::StateTree,
};

pub use self::room::{DEFAULT_TRANSITION_TIMEOUT, LeaseId, RoomRuntime, TickerHandle};
pub use self::session::{
    AbortError, ApplyError, Plan, PlanError, PlanId, SessionEvent, SessionPhase, Snapshot,
};
pub use self::sse::{RoomChannels, SseHub};

pub type SharedState = Arc<AppState>;

/// Central application state holding the shared tree, the question
/// bank and every room runtime.
pub struct AppState {
    config: AppConfig,
    tree: Arc<dyn StateTree>,
    rooms: DashMap<Uuid, Arc<RoomRuntime>>,
    question_bank: RwLock<QuestionBank>,
    admin_token: String,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The question bank starts empty; sessions cannot start until one
    /// is installed.
    pub fn new(config: AppConfig, tree: Arc<dyn StateTree>, admin_token: String) -> SharedState {
        Arc::new(Self {
            config,
            tree,
            rooms: DashMap::new(),
            question_bank: RwLock::new(QuestionBank::default()),
            admin_token,
        })
    }

    /// Runtime configuration the server was started with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the shared state tree.
    pub fn tree(&self) -> Arc<dyn StateTree> {
        self.tree.clone()
    }

    /// Registry of room runtimes keyed by room id.
    pub fn rooms(&self) -> &DashMap<Uuid, Arc<RoomRuntime>> {
        &self.rooms
    }

    /// Runtime for one room.
    pub fn room(&self, id: Uuid) -> Result<Arc<RoomRuntime>, ServiceError> {
        self.rooms
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::NotFound(format!("room `{id}` not found")))
    }

    /// Register a freshly created room runtime.
    pub fn insert_room(&self, room: Arc<RoomRuntime>) {
        self.rooms.insert(room.id(), room);
    }

    /// Question bank shared by every room, read-only during sessions.
    pub fn question_bank(&self) -> &RwLock<QuestionBank> {
        &self.question_bank
    }

    /// Token expected in the admin header.
    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }
}
