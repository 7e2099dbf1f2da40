//! DTO definitions used by the admin REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{
        common::{ParticipantSummary, RoomStatusView, SessionSnapshot, StandingEntry},
        format_epoch_millis,
    },
    model::entities::AnswerRecordEntity,
};

/// Empty query object for GET endpoints that take no parameters.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NoQuery {}

/// Response returned after creating a room.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateRoomResponse {
    pub room_id: Uuid,
    /// Creation instant, RFC 3339.
    pub created_at: String,
}

impl CreateRoomResponse {
    pub(crate) fn new(room_id: Uuid, created_at_millis: u64) -> Self {
        Self {
            room_id,
            created_at: format_epoch_millis(created_at_millis),
        }
    }
}

/// One room in the admin room listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    pub id: Uuid,
    pub status: RoomStatusView,
    pub participant_count: usize,
    /// Creation instant, RFC 3339.
    pub created_at: String,
    /// Creation instant in milliseconds since the Unix epoch.
    pub created_at_millis: u64,
}

impl RoomSummary {
    pub(crate) fn new(
        id: Uuid,
        status: RoomStatusView,
        participant_count: usize,
        created_at_millis: u64,
    ) -> Self {
        Self {
            id,
            status,
            participant_count,
            created_at: format_epoch_millis(created_at_millis),
            created_at_millis,
        }
    }
}

/// Response payload for the admin room listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomSummary>,
}

/// Response returned after starting a session.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartSessionResponse {
    pub room_id: Uuid,
    /// Number of questions the session will run through.
    pub question_count: usize,
    /// Seconds on the clock for each question.
    pub timer: u64,
}

/// Generic acknowledgement for admin actions.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

/// One recorded answer, as shown to admins.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerView {
    pub participant_id: Uuid,
    /// Display name of the submitter, if still on the roster.
    pub name: String,
    pub question_id: String,
    pub answer: String,
    /// Submission instant, RFC 3339.
    pub answered_at: String,
    /// Seconds elapsed on the question clock at submission time.
    pub elapsed: u64,
}

impl AnswerView {
    pub(crate) fn from_record(
        participant_id: Uuid,
        name: String,
        question_id: String,
        record: &AnswerRecordEntity,
    ) -> Self {
        Self {
            participant_id,
            name,
            question_id,
            answer: record.answer.clone(),
            answered_at: format_epoch_millis(record.answered_at),
            elapsed: record.elapsed,
        }
    }
}

/// Full room state as exposed to admins, answers included.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminRoomSnapshot {
    pub room: RoomSummary,
    pub session: SessionSnapshot,
    pub participants: Vec<ParticipantSummary>,
    pub answers: Vec<AnswerView>,
    pub standings: Vec<StandingEntry>,
}
