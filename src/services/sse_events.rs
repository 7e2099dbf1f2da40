use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        common::{ParticipantSummary, SessionSnapshot, StandingEntry},
        sse::{
            AnswerReceivedEvent, Handshake, ParticipantJoinedEvent, RoomResetEvent, ServerEvent,
            SessionChangedEvent, StandingsChangedEvent,
        },
    },
    state::RoomRuntime,
};

const EVENT_HANDSHAKE: &str = "handshake";
const EVENT_SESSION_CHANGED: &str = "session.changed";
const EVENT_STANDINGS_CHANGED: &str = "standings.changed";
const EVENT_PARTICIPANT_JOINED: &str = "participant.joined";
const EVENT_ROOM_RESET: &str = "room.reset";
const EVENT_ANSWER_RECEIVED: &str = "answer.received";

/// Broadcast the latest session snapshot to every subscriber of a room.
pub fn broadcast_session_changed(room: &RoomRuntime, snapshot: SessionSnapshot) {
    let payload = SessionChangedEvent(snapshot);
    send_public_event(room, EVENT_SESSION_CHANGED, &payload);
    send_admin_event(room, EVENT_SESSION_CHANGED, &payload);
}

/// Broadcast recomputed standings to every subscriber of a room.
pub fn broadcast_standings_changed(room: &RoomRuntime, standings: Vec<StandingEntry>) {
    let payload = StandingsChangedEvent { standings };
    send_public_event(room, EVENT_STANDINGS_CHANGED, &payload);
    send_admin_event(room, EVENT_STANDINGS_CHANGED, &payload);
}

/// Broadcast that a participant joined the room.
pub fn broadcast_participant_joined(room: &RoomRuntime, participant: ParticipantSummary) {
    let payload = ParticipantJoinedEvent { participant };
    send_public_event(room, EVENT_PARTICIPANT_JOINED, &payload);
    send_admin_event(room, EVENT_PARTICIPANT_JOINED, &payload);
}

/// Broadcast that the room has been reset back to its lobby state.
pub fn broadcast_room_reset(room: &RoomRuntime, room_id: Uuid) {
    let payload = RoomResetEvent { room_id };
    send_public_event(room, EVENT_ROOM_RESET, &payload);
    send_admin_event(room, EVENT_ROOM_RESET, &payload);
}

/// Notify admin subscribers that an answer has been recorded.
pub fn broadcast_answer_received(
    room: &RoomRuntime,
    participant_id: Uuid,
    name: String,
    question_id: String,
    elapsed: u64,
) {
    let payload = AnswerReceivedEvent {
        participant_id,
        name,
        question_id,
        elapsed,
    };
    send_admin_event(room, EVENT_ANSWER_RECEIVED, &payload);
}

/// Handshake event opening one subscriber's stream.
pub(crate) fn handshake_event(stream: &str, room_id: Uuid) -> Option<ServerEvent> {
    let payload = Handshake {
        stream: stream.to_owned(),
        room_id,
        message: format!("subscribed to the {stream} stream"),
    };
    build_event(EVENT_HANDSHAKE, &payload)
}

/// Session snapshot event for a single subscriber's catch-up.
pub(crate) fn session_event(snapshot: SessionSnapshot) -> Option<ServerEvent> {
    build_event(EVENT_SESSION_CHANGED, &SessionChangedEvent(snapshot))
}

/// Standings event for a single subscriber's catch-up.
pub(crate) fn standings_event(standings: Vec<StandingEntry>) -> Option<ServerEvent> {
    build_event(EVENT_STANDINGS_CHANGED, &StandingsChangedEvent { standings })
}

fn build_event(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}

fn send_public_event(room: &RoomRuntime, event: &str, payload: &impl Serialize) {
    if let Some(event) = build_event(event, payload) {
        room.channels().public().broadcast(event);
    }
}

fn send_admin_event(room: &RoomRuntime, event: &str, payload: &impl Serialize) {
    if let Some(event) = build_event(event, payload) {
        room.channels().admin().broadcast(event);
    }
}
