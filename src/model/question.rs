//! Question bank definitions.
//!
//! Questions are loaded once at startup, published read-only under
//! `questions/{id}` in the state tree, and never change for the life
//! of a session. The bank keeps insertion order: the session plays
//! questions by index in exactly this order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A question as stored under `questions/{id}`.
///
/// The correct answer travels with the stored document so the scoring
/// pass can judge submissions; participant-facing views strip it
/// before rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Text shown to every participant.
    pub prompt: String,
    /// Optional image shown alongside the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Type-specific options and answer key.
    #[serde(flatten)]
    pub spec: QuestionSpec,
}

/// Type-specific part of a question document, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum QuestionSpec {
    /// One correct option among plain text options.
    SingleChoice {
        options: Vec<String>,
        correct: String,
    },
    /// One correct option among image options, matched by label.
    ImageChoice {
        options: Vec<ImageOption>,
        correct: String,
    },
    /// Free-text input matched against accepted spellings.
    FreeText { accepted_answers: Vec<String> },
}

/// A selectable image inside an image-choice question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageOption {
    /// Label submitted by participants who pick this option.
    pub label: String,
    /// Image location rendered by clients.
    pub url: String,
}

impl Question {
    /// Whether a raw submission counts as correct.
    ///
    /// Choice types compare the submitted value against the single
    /// correct option verbatim; free text is trimmed and case-folded
    /// on both sides first.
    pub fn accepts(&self, submitted: &str) -> bool {
        match &self.spec {
            QuestionSpec::SingleChoice { correct, .. }
            | QuestionSpec::ImageChoice { correct, .. } => submitted == correct,
            QuestionSpec::FreeText { accepted_answers } => {
                let submitted = normalize_answer(submitted);
                accepted_answers
                    .iter()
                    .any(|accepted| normalize_answer(accepted) == submitted)
            }
        }
    }
}

/// Trim and case-fold a free-text answer for comparison.
pub fn normalize_answer(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Ordered, immutable set of questions for a deployment.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: IndexMap<String, Question>,
}

impl QuestionBank {
    /// Build a bank from already-ordered questions keyed by id.
    pub fn from_questions(questions: IndexMap<String, Question>) -> Self {
        QuestionBank { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question at a play position, with its id.
    pub fn get(&self, index: usize) -> Option<(&str, &Question)> {
        self.questions
            .get_index(index)
            .map(|(id, question)| (id.as_str(), question))
    }

    /// Question by id, regardless of position.
    pub fn by_id(&self, id: &str) -> Option<&Question> {
        self.questions.get(id)
    }

    /// All questions in play order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Question)> {
        self.questions
            .iter()
            .map(|(id, question)| (id.as_str(), question))
    }

    /// The football bank shipped with the server, used when no
    /// question file is configured.
    pub fn builtin() -> Self {
        let single = |prompt: &str, options: &[&str], correct: &str| Question {
            prompt: prompt.to_owned(),
            image: None,
            spec: QuestionSpec::SingleChoice {
                options: options.iter().map(|&option| option.to_owned()).collect(),
                correct: correct.to_owned(),
            },
        };
        let free = |prompt: &str, accepted: &[&str]| Question {
            prompt: prompt.to_owned(),
            image: None,
            spec: QuestionSpec::FreeText {
                accepted_answers: accepted.iter().map(|&answer| answer.to_owned()).collect(),
            },
        };

        let crest = |label: &str, url: &str| ImageOption {
            label: label.to_owned(),
            url: url.to_owned(),
        };

        QuestionBank::from_questions(IndexMap::from([
            (
                "q1".to_owned(),
                single(
                    "Which country won the 2018 FIFA World Cup?",
                    &["France", "Croatia", "Brazil", "Germany"],
                    "France",
                ),
            ),
            (
                "q2".to_owned(),
                single(
                    "How many players does a football team field at kick-off?",
                    &["9", "10", "11", "12"],
                    "11",
                ),
            ),
            (
                "q3".to_owned(),
                free(
                    "Which club plays its home games at Old Trafford?",
                    &["Manchester United", "Man United", "Man Utd"],
                ),
            ),
            (
                "q4".to_owned(),
                single(
                    "Which nation has won the most World Cup titles?",
                    &["Brazil", "Germany", "Italy", "Argentina"],
                    "Brazil",
                ),
            ),
            (
                "q5".to_owned(),
                free(
                    "Which city is home to Paris Saint-Germain?",
                    &["Paris"],
                ),
            ),
            (
                "q6".to_owned(),
                Question {
                    prompt: "Which crest belongs to FC Barcelona?".to_owned(),
                    image: None,
                    spec: QuestionSpec::ImageChoice {
                        options: vec![
                            crest("A", "/images/crests/a.png"),
                            crest("B", "/images/crests/b.png"),
                            crest("C", "/images/crests/c.png"),
                        ],
                        correct: "B".to_owned(),
                    },
                },
            ),
        ]))
    }
}
