//! Canonical locations inside the hierarchical state tree.
//!
//! Every piece of shared session state lives under a well-known
//! slash-separated path. Services never spell those paths by hand;
//! they go through the builders below so the wire layout stays in
//! one place.

use std::fmt;

use uuid::Uuid;

const ROOMS: &str = "rooms";
const QUESTIONS: &str = "questions";
const PARTICIPANTS: &str = "participants";
const QUIZ_STATE: &str = "quizState";
const ANSWERS: &str = "answers";
const SCORES: &str = "scores";
const PER_QUESTION: &str = "perQuestion";
const CREATED_AT: &str = "createdAt";
const STATUS: &str = "status";
const PHASE: &str = "phase";
const TIMER: &str = "timer";
const CURRENT_QUESTION_INDEX: &str = "currentQuestionIndex";

/// A normalized location in the state tree, addressed by path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    /// Parse a slash-separated path. Empty segments are dropped, so
    /// `"rooms//abc/"` and `"rooms/abc"` address the same node.
    pub fn new(path: &str) -> Self {
        TreePath {
            segments: path
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    /// The root of the whole tree.
    pub fn root() -> Self {
        TreePath {
            segments: Vec::new(),
        }
    }

    /// Append one segment, yielding the child path.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        TreePath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `self` sits at or below `other`.
    pub fn starts_with(&self, other: &TreePath) -> bool {
        self.segments.len() >= other.segments.len()
            && self.segments[..other.segments.len()] == other.segments[..]
    }

    /// Whether one of the two paths is an ancestor of (or equal to) the
    /// other. A write anywhere along that line changes the value seen
    /// from both ends, which is what subscription fan-out keys on.
    pub fn overlaps(&self, other: &TreePath) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.segments.join("/"))
        }
    }
}

/// `rooms/{room}` - everything belonging to one room.
pub fn room_root(room_id: Uuid) -> TreePath {
    TreePath::root().child(ROOMS).child(room_id.to_string())
}

/// `rooms/{room}/createdAt`
pub fn room_created_at(room_id: Uuid) -> TreePath {
    room_root(room_id).child(CREATED_AT)
}

/// `rooms/{room}/status`
pub fn room_status(room_id: Uuid) -> TreePath {
    room_root(room_id).child(STATUS)
}

/// `rooms/{room}/participants`
pub fn participants(room_id: Uuid) -> TreePath {
    room_root(room_id).child(PARTICIPANTS)
}

/// `rooms/{room}/participants/{participant}`
pub fn participant(room_id: Uuid, participant_id: Uuid) -> TreePath {
    participants(room_id).child(participant_id.to_string())
}

/// `rooms/{room}/quizState` - the session document owned by the phase
/// machine. Replacing this node wholesale also clears the answers
/// subtree nested below it.
pub fn quiz_state(room_id: Uuid) -> TreePath {
    room_root(room_id).child(QUIZ_STATE)
}

/// `rooms/{room}/quizState/phase`
pub fn quiz_state_phase(room_id: Uuid) -> TreePath {
    quiz_state(room_id).child(PHASE)
}

/// `rooms/{room}/quizState/timer`
pub fn quiz_state_timer(room_id: Uuid) -> TreePath {
    quiz_state(room_id).child(TIMER)
}

/// `rooms/{room}/quizState/currentQuestionIndex`
pub fn quiz_state_question_index(room_id: Uuid) -> TreePath {
    quiz_state(room_id).child(CURRENT_QUESTION_INDEX)
}

/// `rooms/{room}/quizState/answers`
pub fn answers(room_id: Uuid) -> TreePath {
    quiz_state(room_id).child(ANSWERS)
}

/// `rooms/{room}/quizState/answers/{participant}/{question}`
pub fn answer(room_id: Uuid, participant_id: Uuid, question_id: &str) -> TreePath {
    answers(room_id)
        .child(participant_id.to_string())
        .child(question_id)
}

/// `rooms/{room}/scores`
pub fn scores(room_id: Uuid) -> TreePath {
    room_root(room_id).child(SCORES)
}

/// `rooms/{room}/scores/{participant}/perQuestion/{index}`
pub fn score_entry(room_id: Uuid, participant_id: Uuid, question_index: usize) -> TreePath {
    scores(room_id)
        .child(participant_id.to_string())
        .child(PER_QUESTION)
        .child(question_index.to_string())
}

/// `questions` - the shared question bank, outside any room.
pub fn questions_root() -> TreePath {
    TreePath::root().child(QUESTIONS)
}

/// `questions/{question}`
pub fn question(question_id: &str) -> TreePath {
    questions_root().child(question_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_drops_empty_segments() {
        let path = TreePath::new("rooms//abc/");
        assert_eq!(path.segments(), ["rooms", "abc"]);
        assert_eq!(path, TreePath::new("rooms/abc"));
    }

    #[test]
    fn root_is_empty_and_displays_as_slash() {
        let root = TreePath::root();
        assert!(root.is_root());
        assert_eq!(root.to_string(), "/");
        assert_eq!(TreePath::new(""), root);
    }

    #[test]
    fn prefix_checks() {
        let parent = TreePath::new("rooms/abc");
        let child = parent.child("participants");

        assert!(child.starts_with(&parent));
        assert!(!parent.starts_with(&child));
        assert!(parent.starts_with(&parent));
        assert!(child.starts_with(&TreePath::root()));
    }

    #[test]
    fn overlap_is_symmetric_on_ancestry() {
        let state = TreePath::new("rooms/abc/quizState");
        let timer = state.child("timer");
        let sibling = TreePath::new("rooms/abc/participants");

        assert!(state.overlaps(&timer));
        assert!(timer.overlaps(&state));
        assert!(!timer.overlaps(&sibling));
    }

    #[test]
    fn canonical_paths_match_wire_layout() {
        let room = Uuid::nil();
        let pid = Uuid::nil();

        assert_eq!(
            quiz_state(room).to_string(),
            format!("rooms/{room}/quizState")
        );
        assert_eq!(
            quiz_state_question_index(room).to_string(),
            format!("rooms/{room}/quizState/currentQuestionIndex")
        );
        assert_eq!(
            answer(room, pid, "q7").to_string(),
            format!("rooms/{room}/quizState/answers/{pid}/q7")
        );
        assert_eq!(
            score_entry(room, pid, 3).to_string(),
            format!("rooms/{room}/scores/{pid}/perQuestion/3")
        );
        assert_eq!(question("q1").to_string(), "questions/q1");
    }
}
