//! DTO definitions used by the participant-facing REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::dto::{
    common::{ParticipantSummary, StandingEntry},
    validation::{validate_display_name, validate_question_id},
};

/// Payload sent by a client joining a room.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRequest {
    /// Display name shown on rosters and the leaderboard.
    pub name: String,
}

impl Validate for JoinRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_display_name(&self.name) {
            errors.add("name", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Response confirming a successful join.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    pub room_id: Uuid,
    pub participant_id: Uuid,
    /// Display name as stored, after trimming.
    pub name: String,
}

/// Payload submitting one answer for the live question.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    pub participant_id: Uuid,
    /// Must match the id of the question currently on the clock.
    pub question_id: String,
    /// Raw answer value; empty submissions are recorded and judged
    /// like any other.
    pub answer: String,
}

impl Validate for SubmitAnswerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_question_id(&self.question_id) {
            errors.add("question_id", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Acknowledgement for an answer submission.
///
/// A duplicate submission for the same question acknowledges exactly
/// like the first one did; clients retrying after a network hiccup
/// cannot tell the difference.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAnswerResponse {
    pub participant_id: Uuid,
    pub question_id: String,
}

/// Response payload listing the participants currently in a room.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantsResponse {
    pub participants: Vec<ParticipantSummary>,
}

/// Ranked standings for a room.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub standings: Vec<StandingEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_request_rejects_blank_names() {
        let request = JoinRequest {
            name: "   ".to_owned(),
        };
        assert!(request.validate().is_err());

        let request = JoinRequest {
            name: "Ada".to_owned(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn submit_answer_request_rejects_malformed_question_ids() {
        let request = SubmitAnswerRequest {
            participant_id: Uuid::new_v4(),
            question_id: "q1/evil".to_owned(),
            answer: "France".to_owned(),
        };
        assert!(request.validate().is_err());

        let request = SubmitAnswerRequest {
            participant_id: Uuid::new_v4(),
            question_id: "q1".to_owned(),
            answer: String::new(),
        };
        assert!(request.validate().is_ok());
    }
}
