use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

/// Coarse room lifecycle label stored at `rooms/{room}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Open,
    InProgress,
    Finished,
}

impl RoomStatus {
    /// Wire spelling of the status, as stored in the tree.
    pub fn as_str(self) -> &'static str {
        match self {
            RoomStatus::Open => "open",
            RoomStatus::InProgress => "in_progress",
            RoomStatus::Finished => "finished",
        }
    }
}

/// Serialized phase label inside the session document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseLabel {
    Idle,
    Active,
    Finished,
}

impl PhaseLabel {
    /// Wire spelling of the phase, as stored in the tree.
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseLabel::Idle => "idle",
            PhaseLabel::Active => "active",
            PhaseLabel::Finished => "finished",
        }
    }
}

/// Session document stored at `rooms/{room}/quizState`.
///
/// The nested `answers` subtree never appears here: writing this
/// entity over the node replaces the subtree, which is exactly how a
/// fresh session clears leftover answers. Deserialization ignores the
/// subtree for the same reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStateEntity {
    /// Phase the session is in.
    pub phase: PhaseLabel,
    /// Index of the question being played, present while active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question_index: Option<usize>,
    /// Whole seconds remaining on the question clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<u64>,
    /// Epoch milliseconds when the session left idle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
}

/// Participant document stored at `rooms/{room}/participants/{participant}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantEntity {
    /// Display name chosen at join time.
    pub name: String,
    /// Epoch milliseconds when the participant joined.
    pub joined_at: u64,
}

/// First answer recorded at `rooms/{room}/quizState/answers/{participant}/{question}`.
///
/// Written with a conditional write so later submissions for the same
/// pair never overwrite it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecordEntity {
    /// Raw answer exactly as submitted.
    pub answer: String,
    /// Epoch milliseconds when the submission arrived.
    pub answered_at: u64,
    /// Whole seconds into the question window at submission time.
    pub elapsed: u64,
}

/// Score document stored at `rooms/{room}/scores/{participant}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreNodeEntity {
    /// Points awarded per question index. Every scored question has an
    /// entry for every participant, zeros included.
    #[serde(default)]
    pub per_question: BTreeMap<usize, u32>,
}

impl ScoreNodeEntity {
    /// Sum of all per-question points.
    pub fn total(&self) -> u32 {
        self.per_question.values().sum()
    }
}

/// One ranked leaderboard row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    /// Participant this row belongs to.
    pub participant_id: Uuid,
    /// Display name at join time.
    pub name: String,
    /// Total points across all scored questions.
    pub points: u32,
}

/// Milliseconds since the Unix epoch for `time`.
pub fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Milliseconds since the Unix epoch, right now.
pub fn now_millis() -> u64 {
    epoch_millis(SystemTime::now())
}

/// Serialize an entity into a tree value.
///
/// Derived serializers on these plain structs cannot fail; if one ever
/// does, the write degrades to `Null` and gets logged instead of
/// panicking inside a service.
pub fn to_tree_value<T: Serialize>(entity: &T) -> Value {
    serde_json::to_value(entity).unwrap_or_else(|error| {
        warn!(error = %error, "failed to serialize entity for the tree");
        Value::Null
    })
}
