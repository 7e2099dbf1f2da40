//! Join handling and answer intake for participants.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        common::ParticipantSummary,
        public::{
            JoinRequest, JoinResponse, ParticipantsResponse, SubmitAnswerRequest,
            SubmitAnswerResponse,
        },
    },
    error::ServiceError,
    model::entities::{AnswerRecordEntity, ParticipantEntity, now_millis, to_tree_value},
    services::sse_events,
    state::{SessionPhase, SharedState},
    store::{decode_children, path, retry::with_backoff},
};

/// Add a participant to the roster of a room that has not started yet.
pub async fn join_room(
    state: &SharedState,
    room_id: Uuid,
    request: JoinRequest,
) -> Result<JoinResponse, ServiceError> {
    let room = state.room(room_id)?;
    if !matches!(room.phase().await, SessionPhase::Idle) {
        return Err(ServiceError::SessionAlreadyStarted);
    }

    let name = request.name.trim().to_owned();
    let participant_id = Uuid::new_v4();
    let entity = ParticipantEntity {
        name: name.clone(),
        joined_at: now_millis(),
    };

    let tree = state.tree();
    let document = to_tree_value(&entity);
    with_backoff("participant write", || {
        tree.write(path::participant(room_id, participant_id), document.clone())
    })
    .await?;

    sse_events::broadcast_participant_joined(
        &room,
        ParticipantSummary::from_entity(participant_id, &entity),
    );
    info!(room = %room_id, participant = %participant_id, "participant joined");

    Ok(JoinResponse {
        room_id,
        participant_id,
        name,
    })
}

/// Record a participant's answer for the question currently on the clock.
///
/// Only the first submission per participant and question is kept; a
/// duplicate acknowledges exactly like the original so retrying
/// clients cannot tell the difference.
pub async fn submit_answer(
    state: &SharedState,
    room_id: Uuid,
    request: SubmitAnswerRequest,
) -> Result<SubmitAnswerResponse, ServiceError> {
    let room = state.room(room_id)?;

    let SessionPhase::Active {
        question_index,
        remaining,
    } = room.phase().await
    else {
        return Err(ServiceError::InvalidState(
            "no question is accepting answers".into(),
        ));
    };

    let live_question_id = {
        let bank = state.question_bank().read().await;
        let Some((id, _)) = bank.get(question_index) else {
            return Err(ServiceError::InvalidState(format!(
                "question index {question_index} is out of range"
            )));
        };
        id.to_owned()
    };
    if request.question_id != live_question_id {
        return Err(ServiceError::InvalidState(format!(
            "question `{}` is not the live question",
            request.question_id
        )));
    }

    let tree = state.tree();
    let participant_node = tree
        .read(path::participant(room_id, request.participant_id))
        .await?;
    if participant_node.is_null() {
        return Err(ServiceError::NotFound(format!(
            "participant `{}` not found in room `{room_id}`",
            request.participant_id
        )));
    }

    let timer_limit = state.config().question_timer();
    let elapsed = timer_limit.saturating_sub(remaining);
    let record = AnswerRecordEntity {
        answer: request.answer.clone(),
        answered_at: now_millis(),
        elapsed,
    };

    let document = to_tree_value(&record);
    let recorded = with_backoff("answer write", || {
        tree.write_if_absent(
            path::answer(room_id, request.participant_id, &request.question_id),
            document.clone(),
        )
    })
    .await?;

    if recorded {
        let name = serde_json::from_value::<ParticipantEntity>(participant_node)
            .map(|entity| entity.name)
            .unwrap_or_else(|_| "Unknown".to_owned());
        sse_events::broadcast_answer_received(
            &room,
            request.participant_id,
            name,
            request.question_id.clone(),
            elapsed,
        );
    }

    Ok(SubmitAnswerResponse {
        participant_id: request.participant_id,
        question_id: request.question_id,
    })
}

/// Roster of a room, ordered by join time.
pub async fn read_roster(
    state: &SharedState,
    room_id: Uuid,
) -> Result<ParticipantsResponse, ServiceError> {
    state.room(room_id)?;

    let tree = state.tree();
    let node = tree.read(path::participants(room_id)).await?;

    let mut participants: Vec<ParticipantSummary> = decode_roster(&node)
        .iter()
        .map(|(id, entity)| ParticipantSummary::from_entity(*id, entity))
        .collect();
    participants.sort_by(|a, b| {
        a.joined_at
            .cmp(&b.joined_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    Ok(ParticipantsResponse { participants })
}

/// Decode a participants node into typed roster entries.
pub(crate) fn decode_roster(node: &Value) -> BTreeMap<Uuid, ParticipantEntity> {
    decode_children::<ParticipantEntity>(node)
        .into_iter()
        .filter_map(|(key, entity)| match Uuid::parse_str(&key) {
            Ok(id) => Some((id, entity)),
            Err(error) => {
                warn!(key = %key, error = %error, "skipping roster entry with a malformed id");
                None
            }
        })
        .collect()
}

/// Decode an answers node into records keyed by participant and question.
pub(crate) fn decode_answers(
    node: &Value,
) -> BTreeMap<Uuid, BTreeMap<String, AnswerRecordEntity>> {
    decode_children::<BTreeMap<String, AnswerRecordEntity>>(node)
        .into_iter()
        .filter_map(|(key, per_question)| match Uuid::parse_str(&key) {
            Ok(id) => Some((id, per_question)),
            Err(error) => {
                warn!(key = %key, error = %error, "skipping answers with a malformed participant id");
                None
            }
        })
        .collect()
}
