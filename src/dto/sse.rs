use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::common::{ParticipantSummary, SessionSnapshot, StandingEntry};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `admin`).
    pub stream: String,
    /// Room the stream is scoped to.
    pub room_id: Uuid,
    /// Human-readable message confirming the subscription.
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the session phase, clock, or question changes.
pub struct SessionChangedEvent(pub SessionSnapshot);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever the leaderboard is recomputed.
pub struct StandingsChangedEvent {
    pub standings: Vec<StandingEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a participant joins the room.
pub struct ParticipantJoinedEvent {
    pub participant: ParticipantSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when an admin resets the room back to its lobby state.
pub struct RoomResetEvent {
    pub room_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Admin-only event emitted when an answer is recorded.
pub struct AnswerReceivedEvent {
    pub participant_id: Uuid,
    pub name: String,
    pub question_id: String,
    /// Seconds elapsed on the question clock at submission time.
    pub elapsed: u64,
}
