//! Session lifecycle: start, the question clock, end-of-question
//! settlement, skip, and reset.
//!
//! All phase changes go through the room's transition gate; settlement
//! additionally funnels through the scoring guard so a question is
//! scored exactly once no matter how many triggers race for it.

use std::{collections::BTreeMap, sync::Arc};

use serde_json::json;
use tokio::{
    sync::watch,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{ActionResponse, StartSessionResponse},
        common::SessionSnapshot,
    },
    error::ServiceError,
    model::entities::{AnswerRecordEntity, RoomStatus, now_millis, to_tree_value},
    services::{participant_service, scoring, sse_events},
    state::{LeaseId, RoomRuntime, SessionEvent, SessionPhase, SharedState, TickerHandle},
    store::{path, retry::with_backoff},
};

/// Outcome of one clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The clock moved down to this many remaining seconds.
    Ticked(u64),
    /// The clock is at zero; the question at this index must be settled.
    Expired(usize),
    /// The caller no longer drives this room's clock.
    Stopped,
}

/// Outcome of an end-of-question trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// This trigger scored the question and moved the session here.
    Settled(SessionPhase),
    /// Another trigger got there first; nothing was changed.
    Absorbed,
}

/// Start the session of an idle room.
///
/// Writes the full session document, which clears any leftover answer
/// subtree from a previous run, wipes old scores, flips the room
/// status, then hands the clock to a freshly leased ticker.
pub async fn start_session(
    state: &SharedState,
    room_id: Uuid,
) -> Result<StartSessionResponse, ServiceError> {
    let room = state.room(room_id)?;

    let question_count = state.question_bank().read().await.len();
    if question_count == 0 {
        return Err(ServiceError::NoQuestions);
    }
    if !matches!(room.phase().await, SessionPhase::Idle) {
        return Err(ServiceError::SessionAlreadyStarted);
    }

    let timer = state.config().question_timer();
    let lease = room.claim_timer_lease().await;

    let tree = state.tree();
    let result = room
        .run_transition(SessionEvent::Start { timer }, move || async move {
            let entity = SessionPhase::Active {
                question_index: 0,
                remaining: timer,
            }
            .session_entity(Some(now_millis()));
            let document = to_tree_value(&entity);
            with_backoff("session start write", || {
                tree.write(path::quiz_state(room_id), document.clone())
            })
            .await?;
            with_backoff("score wipe", || tree.delete(path::scores(room_id))).await?;
            with_backoff("room status write", || {
                tree.write(
                    path::room_status(room_id),
                    json!(RoomStatus::InProgress.as_str()),
                )
            })
            .await?;
            Ok(())
        })
        .await;

    if let Err(error) = result {
        room.clear_timer_lease().await;
        return Err(error);
    }

    spawn_ticker(state, &room, lease).await;
    broadcast_session(state, &room).await;
    info!(room = %room_id, questions = question_count, timer, "session started");

    Ok(StartSessionResponse {
        room_id,
        question_count,
        timer,
    })
}

/// Current session state of a room, as served to clients.
pub async fn session_snapshot(
    state: &SharedState,
    room_id: Uuid,
) -> Result<SessionSnapshot, ServiceError> {
    state.room(room_id)?;

    let tree = state.tree();
    let session = tree.read(path::quiz_state(room_id)).await?;
    let bank = state.question_bank().read().await;
    Ok(SessionSnapshot::from_tree(&session, &bank))
}

/// Advance a room's clock by one second on behalf of `lease`.
///
/// The lease is re-checked inside the transition, so a fenced ticker
/// can never write a stale clock value no matter how its calls
/// interleave with a reset or restart.
pub async fn tick(
    state: &SharedState,
    room: &Arc<RoomRuntime>,
    lease: LeaseId,
) -> Result<TickOutcome, ServiceError> {
    if !room.holds_timer_lease(lease).await {
        return Ok(TickOutcome::Stopped);
    }

    let tree = state.tree();
    let room_id = room.id();
    let room_ref = room.clone();
    let attempt = room
        .run_transition_when(
            |phase| match phase {
                SessionPhase::Active { remaining, .. } if remaining > 0 => {
                    Some(SessionEvent::TickDown)
                }
                _ => None,
            },
            move |target| async move {
                if !room_ref.holds_timer_lease(lease).await {
                    return Err(ServiceError::LeaseLost);
                }
                let remaining = match target {
                    SessionPhase::Active { remaining, .. } => remaining,
                    _ => 0,
                };
                with_backoff("clock write", || {
                    tree.write(path::quiz_state_timer(room_id), json!(remaining))
                })
                .await?;
                Ok(remaining)
            },
        )
        .await;

    match attempt {
        Ok(Some((remaining, next))) => {
            broadcast_session(state, room).await;
            if remaining == 0 {
                Ok(TickOutcome::Expired(next.active_index().unwrap_or(0)))
            } else {
                Ok(TickOutcome::Ticked(remaining))
            }
        }
        // The chooser declined: either the clock already sits at zero
        // because a previous settlement attempt failed, or the session
        // has moved on and this ticker is done.
        Ok(None) => Ok(match room.phase().await {
            SessionPhase::Active {
                question_index,
                remaining: 0,
            } => TickOutcome::Expired(question_index),
            SessionPhase::Active { remaining, .. } => TickOutcome::Ticked(remaining),
            SessionPhase::Idle | SessionPhase::Finished => TickOutcome::Stopped,
        }),
        Err(ServiceError::LeaseLost) => Ok(TickOutcome::Stopped),
        Err(error) => Err(error),
    }
}

/// Settle the question at `question_index`: score it exactly once and
/// move the session on to the next question or to the finished phase.
///
/// Every trigger source funnels through here. The scoring guard admits
/// one concurrent caller; the phase check under the transition gate
/// then drops triggers that arrive for a question that is no longer
/// live. Losing triggers return [`SettleOutcome::Absorbed`] without
/// touching anything.
pub async fn end_of_question(
    state: &SharedState,
    room: &Arc<RoomRuntime>,
    question_index: usize,
) -> Result<SettleOutcome, ServiceError> {
    if !room.begin_scoring() {
        return Ok(SettleOutcome::Absorbed);
    }
    let result = settle_question(state, room, question_index).await;
    room.finish_scoring();

    if let Ok(SettleOutcome::Settled(next)) = &result {
        if matches!(next, SessionPhase::Finished) {
            room.stop_ticker().await;
            room.clear_timer_lease().await;
        }
        broadcast_session(state, room).await;
    }
    result
}

/// Settle the live question immediately instead of waiting for the clock.
pub async fn skip_question(
    state: &SharedState,
    room_id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    let room = state.room(room_id)?;
    let SessionPhase::Active { question_index, .. } = room.phase().await else {
        return Err(ServiceError::InvalidState("no question is live".into()));
    };

    let message = match end_of_question(state, &room, question_index).await? {
        SettleOutcome::Settled(SessionPhase::Finished) => "session finished".to_owned(),
        SettleOutcome::Settled(_) => format!("question {question_index} skipped"),
        SettleOutcome::Absorbed => "question already settled".to_owned(),
    };
    Ok(ActionResponse { message })
}

/// Reset a room to its lobby state.
///
/// The roster, answers, and scores are cleared; the question bank is
/// untouched, so the room can start a fresh session right away.
pub async fn reset_session(
    state: &SharedState,
    room_id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    let room = state.room(room_id)?;

    room.stop_ticker().await;
    room.clear_timer_lease().await;

    let tree = state.tree();
    room.run_transition(SessionEvent::Reset, move || async move {
        let document = to_tree_value(&SessionPhase::Idle.session_entity(None));
        with_backoff("session reset write", || {
            tree.write(path::quiz_state(room_id), document.clone())
        })
        .await?;
        // The roster goes before the scores: the score deletion is what
        // wakes the standings task, which must then see an empty room.
        with_backoff("roster wipe", || tree.delete(path::participants(room_id))).await?;
        with_backoff("score wipe", || tree.delete(path::scores(room_id))).await?;
        with_backoff("room status write", || {
            tree.write(path::room_status(room_id), json!(RoomStatus::Open.as_str()))
        })
        .await?;
        Ok(())
    })
    .await?;

    sse_events::broadcast_room_reset(&room, room_id);
    broadcast_session(state, &room).await;
    info!(room = %room_id, "room reset to lobby");

    Ok(ActionResponse {
        message: "room reset".to_owned(),
    })
}

async fn settle_question(
    state: &SharedState,
    room: &Arc<RoomRuntime>,
    question_index: usize,
) -> Result<SettleOutcome, ServiceError> {
    let (question_id, question, question_count) = {
        let bank = state.question_bank().read().await;
        let Some((id, question)) = bank.get(question_index) else {
            return Err(ServiceError::InvalidState(format!(
                "question index {question_index} is out of range"
            )));
        };
        (id.to_owned(), question.clone(), bank.len())
    };

    let timer = state.config().question_timer();
    let is_last = question_index + 1 >= question_count;

    let tree = state.tree();
    let room_id = room.id();
    let outcome = room
        .run_transition_when(
            |phase| match phase {
                SessionPhase::Active {
                    question_index: live,
                    ..
                } if live == question_index => Some(if is_last {
                    SessionEvent::Finish
                } else {
                    SessionEvent::Advance { timer }
                }),
                _ => None,
            },
            move |target| async move {
                let answers_node =
                    with_backoff("answers read", || tree.read(path::answers(room_id))).await?;
                let roster_node =
                    with_backoff("roster read", || tree.read(path::participants(room_id)))
                        .await?;

                let roster = participant_service::decode_roster(&roster_node);
                let answers = answers_for_question(&answers_node, &question_id);
                let scores = scoring::compute_scores(&question, &roster, &answers);

                for (participant_id, points) in &scores {
                    let (participant_id, points) = (*participant_id, *points);
                    with_backoff("score write", || {
                        tree.write(
                            path::score_entry(room_id, participant_id, question_index),
                            json!(points),
                        )
                    })
                    .await?;
                }

                match target {
                    SessionPhase::Active {
                        question_index: next,
                        remaining,
                    } => {
                        with_backoff("question advance write", || {
                            tree.write(path::quiz_state_question_index(room_id), json!(next))
                        })
                        .await?;
                        with_backoff("clock reset write", || {
                            tree.write(path::quiz_state_timer(room_id), json!(remaining))
                        })
                        .await?;
                    }
                    SessionPhase::Finished => {
                        with_backoff("session finish write", || {
                            tree.write(
                                path::quiz_state_phase(room_id),
                                json!(SessionPhase::Finished.label().as_str()),
                            )
                        })
                        .await?;
                        with_backoff("room status write", || {
                            tree.write(
                                path::room_status(room_id),
                                json!(RoomStatus::Finished.as_str()),
                            )
                        })
                        .await?;
                    }
                    SessionPhase::Idle => {}
                }
                Ok(())
            },
        )
        .await?;

    Ok(match outcome {
        Some(((), next)) => {
            debug!(room = %room_id, question_index, next = ?next, "question settled");
            SettleOutcome::Settled(next)
        }
        None => SettleOutcome::Absorbed,
    })
}

/// Spawn the clock task driving a room while it holds `lease`.
async fn spawn_ticker(state: &SharedState, room: &Arc<RoomRuntime>, lease: LeaseId) {
    let (stop_sender, mut stop_receiver) = watch::channel(false);
    room.install_ticker(TickerHandle::new(stop_sender)).await;

    let state = state.clone();
    let room = room.clone();
    tokio::spawn(async move {
        let mut clock = interval(state.config().tick_period());
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick completes immediately.
        clock.tick().await;

        loop {
            tokio::select! {
                changed = stop_receiver.changed() => {
                    if changed.is_err() || *stop_receiver.borrow() {
                        debug!(room = %room.id(), "ticker stopped by signal");
                        break;
                    }
                }
                _ = clock.tick() => {
                    match tick(&state, &room, lease).await {
                        Ok(TickOutcome::Ticked(_)) => {}
                        Ok(TickOutcome::Expired(question_index)) => {
                            match end_of_question(&state, &room, question_index).await {
                                Ok(SettleOutcome::Settled(SessionPhase::Finished)) => break,
                                Ok(_) => {}
                                Err(error) => {
                                    warn!(
                                        room = %room.id(),
                                        question_index,
                                        error = %error,
                                        "end of question failed; retrying on the next tick"
                                    );
                                }
                            }
                        }
                        Ok(TickOutcome::Stopped) => {
                            debug!(room = %room.id(), "ticker fenced off, stopping");
                            break;
                        }
                        Err(error) => {
                            warn!(room = %room.id(), error = %error, "clock tick failed");
                        }
                    }
                }
            }
        }
    });
}

/// Read the stored session and broadcast it as a fresh snapshot.
async fn broadcast_session(state: &SharedState, room: &Arc<RoomRuntime>) {
    match session_snapshot(state, room.id()).await {
        Ok(snapshot) => sse_events::broadcast_session_changed(room, snapshot),
        Err(error) => {
            warn!(room = %room.id(), error = %error, "failed to build session snapshot for broadcast");
        }
    }
}

fn answers_for_question(
    node: &serde_json::Value,
    question_id: &str,
) -> BTreeMap<Uuid, AnswerRecordEntity> {
    participant_service::decode_answers(node)
        .into_iter()
        .filter_map(|(participant_id, mut per_question)| {
            per_question
                .remove(question_id)
                .map(|record| (participant_id, record))
        })
        .collect()
}
