//! Room lifecycle: creation, listing, and the admin room view.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::{
        admin::{AdminRoomSnapshot, AnswerView, CreateRoomResponse, RoomListResponse, RoomSummary},
        common::{ParticipantSummary, SessionSnapshot, StandingEntry},
    },
    error::ServiceError,
    model::entities::{RoomStatus, now_millis},
    services::{leaderboard_service, participant_service},
    state::{RoomRuntime, SharedState},
    store::{path, retry::with_backoff},
};

/// Create a room and register its runtime.
///
/// The runtime only becomes visible to other requests once the room's
/// tree nodes exist, so every lookup that succeeds can also read.
pub async fn create_room(state: &SharedState) -> Result<CreateRoomResponse, ServiceError> {
    let room_id = Uuid::new_v4();
    let created_at = now_millis();
    let room = RoomRuntime::new(room_id, created_at);

    let tree = state.tree();
    with_backoff("room created-at write", || {
        tree.write(path::room_created_at(room_id), json!(created_at))
    })
    .await?;
    with_backoff("room status write", || {
        tree.write(path::room_status(room_id), json!(RoomStatus::Open.as_str()))
    })
    .await?;

    leaderboard_service::spawn_aggregator(state.tree(), room.clone()).await?;
    state.insert_room(room);

    info!(room = %room_id, "room created");
    Ok(CreateRoomResponse::new(room_id, created_at))
}

/// Every known room, oldest first.
pub async fn list_rooms(state: &SharedState) -> Result<RoomListResponse, ServiceError> {
    // Collect the runtimes before awaiting anything; holding a DashMap
    // shard guard across an await point can deadlock.
    let runtimes: Vec<Arc<RoomRuntime>> = state
        .rooms()
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    let tree = state.tree();
    let mut rooms = Vec::with_capacity(runtimes.len());
    for room in runtimes {
        let status = room.phase().await.room_status();
        let roster = tree.read(path::participants(room.id())).await?;
        let participant_count = participant_service::decode_roster(&roster).len();
        rooms.push(RoomSummary::new(
            room.id(),
            status.into(),
            participant_count,
            room.created_at(),
        ));
    }
    rooms.sort_by(|left, right| {
        left.created_at_millis
            .cmp(&right.created_at_millis)
            .then_with(|| left.id.cmp(&right.id))
    });

    Ok(RoomListResponse { rooms })
}

/// Everything an admin sees about one room, recorded answers included.
pub async fn admin_room_snapshot(
    state: &SharedState,
    room_id: Uuid,
) -> Result<AdminRoomSnapshot, ServiceError> {
    let room = state.room(room_id)?;
    let tree = state.tree();

    let session_node = tree.read(path::quiz_state(room_id)).await?;
    let roster_node = tree.read(path::participants(room_id)).await?;
    let answers_node = tree.read(path::answers(room_id)).await?;

    let session = {
        let bank = state.question_bank().read().await;
        SessionSnapshot::from_tree(&session_node, &bank)
    };

    let roster = participant_service::decode_roster(&roster_node);
    let participants: Vec<ParticipantSummary> = roster
        .iter()
        .map(|(id, entity)| ParticipantSummary::from_entity(*id, entity))
        .collect();

    let mut answers = Vec::new();
    for (participant_id, per_question) in participant_service::decode_answers(&answers_node) {
        let name = roster
            .get(&participant_id)
            .map(|entity| entity.name.clone())
            .unwrap_or_else(|| "Unknown".to_owned());
        for (question_id, record) in per_question {
            let view = AnswerView::from_record(participant_id, name.clone(), question_id, &record);
            answers.push((record.answered_at, view));
        }
    }
    answers.sort_by(|(left_at, left), (right_at, right)| {
        left_at
            .cmp(right_at)
            .then_with(|| left.participant_id.cmp(&right.participant_id))
    });
    let answers: Vec<AnswerView> = answers.into_iter().map(|(_, view)| view).collect();

    let standings: Vec<StandingEntry> = room
        .standings_watch()
        .borrow()
        .iter()
        .cloned()
        .map(StandingEntry::from)
        .collect();

    let summary = RoomSummary::new(
        room_id,
        room.phase().await.room_status().into(),
        participants.len(),
        room.created_at(),
    );

    Ok(AdminRoomSnapshot {
        room: summary,
        session,
        participants,
        answers,
        standings,
    })
}
