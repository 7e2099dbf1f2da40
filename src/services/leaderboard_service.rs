//! Reactive leaderboard maintenance.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    dto::{common::StandingEntry, public::LeaderboardResponse},
    error::ServiceError,
    model::entities::{ScoreNodeEntity, Standing},
    services::{participant_service, sse_events},
    state::{RoomRuntime, SharedState},
    store::{StateTree, decode_children, path},
};

/// Spawn the task keeping a room's standings current.
///
/// The task subscribes to the room's score subtree and recomputes the
/// ranking on every overlapping write, including the first snapshot
/// delivered at subscription time. It holds the tree handle directly
/// rather than the whole application state, so it pins nothing beyond
/// what it reads.
pub async fn spawn_aggregator(
    tree: Arc<dyn StateTree>,
    room: Arc<RoomRuntime>,
) -> Result<(), ServiceError> {
    let mut subscription = tree.subscribe(path::scores(room.id())).await?;

    tokio::spawn(async move {
        while let Some(scores) = subscription.recv().await {
            let roster = match tree.read(path::participants(room.id())).await {
                Ok(node) => node,
                Err(error) => {
                    warn!(room = %room.id(), error = %error, "failed to read roster for standings");
                    continue;
                }
            };

            let standings = fold_standings(&scores, &roster);
            let entries: Vec<StandingEntry> =
                standings.iter().cloned().map(StandingEntry::from).collect();
            room.publish_standings(standings);
            sse_events::broadcast_standings_changed(&room, entries);
        }
        debug!(room = %room.id(), "standings task finished");
    });

    Ok(())
}

/// Current standings of a room, computed from the stored scores.
pub async fn read_leaderboard(
    state: &SharedState,
    room_id: uuid::Uuid,
) -> Result<LeaderboardResponse, ServiceError> {
    state.room(room_id)?;

    let tree = state.tree();
    let scores = tree.read(path::scores(room_id)).await?;
    let roster = tree.read(path::participants(room_id)).await?;

    Ok(LeaderboardResponse {
        standings: fold_standings(&scores, &roster)
            .into_iter()
            .map(StandingEntry::from)
            .collect(),
    })
}

/// Rank every rostered participant by total points, best first, ties
/// broken by participant id so equal scores render in a stable order.
pub fn fold_standings(scores: &Value, roster: &Value) -> Vec<Standing> {
    let roster = participant_service::decode_roster(roster);
    let score_nodes = decode_children::<ScoreNodeEntity>(scores);

    let mut standings: Vec<Standing> = roster
        .into_iter()
        .map(|(participant_id, entity)| {
            let points = score_nodes
                .get(participant_id.to_string().as_str())
                .map(ScoreNodeEntity::total)
                .unwrap_or(0);
            Standing {
                participant_id,
                name: entity.name,
                points,
            }
        })
        .collect();

    standings.sort_by(|left, right| {
        right
            .points
            .cmp(&left.points)
            .then_with(|| left.participant_id.cmp(&right.participant_id))
    });
    standings
}
