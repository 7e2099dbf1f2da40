use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::{
    entities::{ParticipantEntity, PhaseLabel, RoomStatus, SessionStateEntity, Standing},
    question::{ImageOption, Question, QuestionBank, QuestionSpec},
};

/// Session phase as exposed over the HTTP surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhaseView {
    /// Participants can still join.
    Idle,
    /// A question is on the clock.
    Active,
    /// Standings are final.
    Finished,
}

impl From<PhaseLabel> for SessionPhaseView {
    fn from(label: PhaseLabel) -> Self {
        match label {
            PhaseLabel::Idle => SessionPhaseView::Idle,
            PhaseLabel::Active => SessionPhaseView::Active,
            PhaseLabel::Finished => SessionPhaseView::Finished,
        }
    }
}

/// Room status as exposed over the HTTP surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatusView {
    Open,
    InProgress,
    Finished,
}

impl From<RoomStatus> for RoomStatusView {
    fn from(status: RoomStatus) -> Self {
        match status {
            RoomStatus::Open => RoomStatusView::Open,
            RoomStatus::InProgress => RoomStatusView::InProgress,
            RoomStatus::Finished => RoomStatusView::Finished,
        }
    }
}

/// Question type label on sanitized views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    ImageChoice,
    FreeText,
}

/// A selectable image option on a sanitized question view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageOptionView {
    pub label: String,
    pub url: String,
}

impl From<&ImageOption> for ImageOptionView {
    fn from(option: &ImageOption) -> Self {
        Self {
            label: option.label.clone(),
            url: option.url.clone(),
        }
    }
}

/// Question as shown to participants: prompt and options only, never
/// the answer key.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionView {
    pub id: String,
    pub kind: QuestionKind,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Present for single-choice questions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Present for image-choice questions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_options: Option<Vec<ImageOptionView>>,
}

impl QuestionView {
    /// Strip a stored question down to what participants may see.
    pub fn from_question(id: &str, question: &Question) -> Self {
        let (kind, options, image_options) = match &question.spec {
            QuestionSpec::SingleChoice { options, .. } => {
                (QuestionKind::SingleChoice, Some(options.clone()), None)
            }
            QuestionSpec::ImageChoice { options, .. } => (
                QuestionKind::ImageChoice,
                None,
                Some(options.iter().map(ImageOptionView::from).collect()),
            ),
            QuestionSpec::FreeText { .. } => (QuestionKind::FreeText, None, None),
        };

        Self {
            id: id.to_owned(),
            kind,
            prompt: question.prompt.clone(),
            image: question.image.clone(),
            options,
            image_options,
        }
    }
}

/// Live session view assembled from the room's session document.
///
/// This is the single projection used by both the session endpoint and
/// the public event stream, so every consumer sees the same thing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub phase: SessionPhaseView,
    /// Index of the live question, while one is live.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question_index: Option<usize>,
    /// Whole seconds left on the clock, while a question is live.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<u64>,
    /// Epoch milliseconds when the session left idle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    /// Sanitized live question, while one is live.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    /// Total number of questions in the bank.
    pub question_count: usize,
}

impl SessionSnapshot {
    /// Build the participant-facing view from a raw session document.
    ///
    /// Missing or malformed documents render as idle; stale index and
    /// timer values left behind by a finished session are not exposed.
    pub fn from_tree(session: &Value, bank: &QuestionBank) -> Self {
        let entity = decode_session(session);
        let active = matches!(entity.phase, PhaseLabel::Active);

        let current_question_index = entity.current_question_index.filter(|_| active);
        let question = current_question_index
            .and_then(|index| bank.get(index))
            .map(|(id, question)| QuestionView::from_question(id, question));

        Self {
            phase: entity.phase.into(),
            current_question_index,
            timer: entity.timer.filter(|_| active),
            started_at: entity.started_at,
            question,
            question_count: bank.len(),
        }
    }
}

fn decode_session(session: &Value) -> SessionStateEntity {
    if session.is_null() {
        return idle_session();
    }
    match serde_json::from_value::<SessionStateEntity>(session.clone()) {
        Ok(entity) => entity,
        Err(error) => {
            warn!(error = %error, "malformed session document; rendering as idle");
            idle_session()
        }
    }
}

fn idle_session() -> SessionStateEntity {
    SessionStateEntity {
        phase: PhaseLabel::Idle,
        current_question_index: None,
        timer: None,
        started_at: None,
    }
}

/// One leaderboard row as exposed over the HTTP surface.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StandingEntry {
    pub participant_id: Uuid,
    pub name: String,
    pub points: u32,
}

impl From<Standing> for StandingEntry {
    fn from(standing: Standing) -> Self {
        Self {
            participant_id: standing.participant_id,
            name: standing.name,
            points: standing.points,
        }
    }
}

/// Roster entry shown on join screens and admin views.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipantSummary {
    pub id: Uuid,
    pub name: String,
    pub joined_at: u64,
}

impl ParticipantSummary {
    /// Pair a decoded participant document with its id.
    pub fn from_entity(id: Uuid, entity: &ParticipantEntity) -> Self {
        Self {
            id,
            name: entity.name.clone(),
            joined_at: entity.joined_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_session_document_renders_as_idle() {
        let bank = QuestionBank::builtin();
        let snapshot = SessionSnapshot::from_tree(&Value::Null, &bank);

        assert_eq!(snapshot.phase, SessionPhaseView::Idle);
        assert!(snapshot.question.is_none());
        assert_eq!(snapshot.question_count, bank.len());
    }

    #[test]
    fn active_session_exposes_a_sanitized_question() {
        let bank = QuestionBank::builtin();
        let snapshot = SessionSnapshot::from_tree(
            &json!({
                "phase": "active",
                "currentQuestionIndex": 0,
                "timer": 7,
                "startedAt": 123,
            }),
            &bank,
        );

        assert_eq!(snapshot.phase, SessionPhaseView::Active);
        assert_eq!(snapshot.timer, Some(7));

        let question = snapshot.question.unwrap();
        assert_eq!(question.id, "q1");
        assert_eq!(question.kind, QuestionKind::SingleChoice);
        let rendered = serde_json::to_value(&question).unwrap();
        assert!(rendered.get("correct").is_none());
        assert!(rendered.get("accepted_answers").is_none());
    }

    #[test]
    fn finished_session_hides_stale_clock_values() {
        let bank = QuestionBank::builtin();
        let snapshot = SessionSnapshot::from_tree(
            &json!({
                "phase": "finished",
                "currentQuestionIndex": 5,
                "timer": 3,
                "startedAt": 123,
            }),
            &bank,
        );

        assert_eq!(snapshot.phase, SessionPhaseView::Finished);
        assert!(snapshot.current_question_index.is_none());
        assert!(snapshot.timer.is_none());
        assert!(snapshot.question.is_none());
        assert_eq!(snapshot.started_at, Some(123));
    }

    #[test]
    fn malformed_session_document_renders_as_idle() {
        let bank = QuestionBank::builtin();
        let snapshot = SessionSnapshot::from_tree(&json!({ "phase": "warming_up" }), &bank);
        assert_eq!(snapshot.phase, SessionPhaseView::Idle);
    }
}
