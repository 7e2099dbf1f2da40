use thiserror::Error;
use uuid::Uuid;

use crate::model::entities::{PhaseLabel, RoomStatus, SessionStateEntity};

/// High-level phases a room's session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Participants can join; no question is being played.
    Idle,
    /// A question is on the clock.
    Active {
        /// Index of the question being played.
        question_index: usize,
        /// Whole seconds left on the clock.
        remaining: u64,
    },
    /// Every question has been scored; standings are final.
    Finished,
}

impl SessionPhase {
    /// Wire label stored in the session document.
    pub fn label(self) -> PhaseLabel {
        match self {
            SessionPhase::Idle => PhaseLabel::Idle,
            SessionPhase::Active { .. } => PhaseLabel::Active,
            SessionPhase::Finished => PhaseLabel::Finished,
        }
    }

    /// Room status implied by this phase.
    pub fn room_status(self) -> RoomStatus {
        match self {
            SessionPhase::Idle => RoomStatus::Open,
            SessionPhase::Active { .. } => RoomStatus::InProgress,
            SessionPhase::Finished => RoomStatus::Finished,
        }
    }

    /// Index of the live question, while one is live.
    pub fn active_index(self) -> Option<usize> {
        match self {
            SessionPhase::Active { question_index, .. } => Some(question_index),
            _ => None,
        }
    }

    /// Session document for a full write of `quizState`.
    ///
    /// Only idle and freshly-started sessions are ever written whole;
    /// everything else goes through child-path writes so the answers
    /// subtree survives.
    pub fn session_entity(self, started_at: Option<u64>) -> SessionStateEntity {
        match self {
            SessionPhase::Idle => SessionStateEntity {
                phase: PhaseLabel::Idle,
                current_question_index: None,
                timer: None,
                started_at: None,
            },
            SessionPhase::Active {
                question_index,
                remaining,
            } => SessionStateEntity {
                phase: PhaseLabel::Active,
                current_question_index: Some(question_index),
                timer: Some(remaining),
                started_at,
            },
            SessionPhase::Finished => SessionStateEntity {
                phase: PhaseLabel::Finished,
                current_question_index: None,
                timer: None,
                started_at,
            },
        }
    }
}

/// Events that can be applied to the session machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Leave idle and put question zero on a full clock.
    Start {
        /// Per-question clock in whole seconds.
        timer: u64,
    },
    /// One-second clock decrement while a question is live.
    TickDown,
    /// Current question has been scored; play the next one.
    Advance {
        /// Per-question clock in whole seconds.
        timer: u64,
    },
    /// Last question has been scored; the session is over.
    Finish,
    /// Return to idle from any phase.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the machine was in when the event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Errors that can occur when planning a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// Phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when the plan was created.
        expected: SessionPhase,
        /// Current phase.
        actual: SessionPhase,
    },
    /// Version changed since the plan was created.
    VersionMismatch {
        /// Version the plan expected to install.
        expected: usize,
        /// Version the machine would install now.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned transition.
pub type PlanId = Uuid;

/// A validated transition that has not been applied yet.
///
/// Side effects (store writes, scoring) run between planning and
/// applying; an aborted plan leaves the machine exactly where it was.
#[derive(Debug, Clone, Copy)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the machine is currently in.
    pub from: SessionPhase,
    /// Phase the machine will move to.
    pub to: SessionPhase,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
}

/// Snapshot of the machine for diagnostics and read paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase.
    pub phase: SessionPhase,
    /// Version, incremented on each applied transition.
    pub version: usize,
    /// Target phase of the pending plan, if any.
    pub pending: Option<SessionPhase>,
}

/// Per-room state machine implementing the session flow.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    phase: SessionPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            version: 0,
            pending: None,
        }
    }
}

impl SessionMachine {
    /// Create a new machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Create a snapshot of the current machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied
    /// from the current phase. Returns a plan that can later be
    /// applied or aborted.
    pub fn plan(&mut self, event: SessionEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let to = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to,
            event,
            version_next: self.version + 1,
        };
        self.pending = Some(plan);

        Ok(plan)
    }

    /// Apply a planned transition, moving the machine to the next
    /// phase. Returns the new phase.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Idle, SessionEvent::Start { timer }) => SessionPhase::Active {
                question_index: 0,
                remaining: timer,
            },
            (
                SessionPhase::Active {
                    question_index,
                    remaining,
                },
                SessionEvent::TickDown,
            ) if remaining > 0 => SessionPhase::Active {
                question_index,
                remaining: remaining - 1,
            },
            (SessionPhase::Active { question_index, .. }, SessionEvent::Advance { timer }) => {
                SessionPhase::Active {
                    question_index: question_index + 1,
                    remaining: timer,
                }
            }
            (SessionPhase::Active { .. }, SessionEvent::Finish) => SessionPhase::Finished,
            (_, SessionEvent::Reset) => SessionPhase::Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionMachine, event: SessionEvent) -> SessionPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = SessionMachine::new();
        assert_eq!(sm.phase(), SessionPhase::Idle);
    }

    #[test]
    fn full_happy_path_through_a_session() {
        let mut sm = SessionMachine::new();

        assert_eq!(
            apply(&mut sm, SessionEvent::Start { timer: 10 }),
            SessionPhase::Active {
                question_index: 0,
                remaining: 10
            }
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::TickDown),
            SessionPhase::Active {
                question_index: 0,
                remaining: 9
            }
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::Advance { timer: 10 }),
            SessionPhase::Active {
                question_index: 1,
                remaining: 10
            }
        );
        assert_eq!(apply(&mut sm, SessionEvent::Finish), SessionPhase::Finished);
        assert_eq!(apply(&mut sm, SessionEvent::Reset), SessionPhase::Idle);
    }

    #[test]
    fn index_increases_by_one_per_advance() {
        let mut sm = SessionMachine::new();
        apply(&mut sm, SessionEvent::Start { timer: 3 });

        for expected in 1..=4usize {
            let phase = apply(&mut sm, SessionEvent::Advance { timer: 3 });
            assert_eq!(phase.active_index(), Some(expected));
        }
    }

    #[test]
    fn ticking_an_expired_clock_is_invalid() {
        let mut sm = SessionMachine::new();
        apply(&mut sm, SessionEvent::Start { timer: 1 });
        apply(&mut sm, SessionEvent::TickDown);

        let err = sm.plan(SessionEvent::TickDown).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(
                    invalid.from,
                    SessionPhase::Active {
                        question_index: 0,
                        remaining: 0
                    }
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn start_is_rejected_outside_idle() {
        let mut sm = SessionMachine::new();
        apply(&mut sm, SessionEvent::Start { timer: 10 });

        let err = sm.plan(SessionEvent::Start { timer: 10 }).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));

        apply(&mut sm, SessionEvent::Finish);
        let err = sm.plan(SessionEvent::Start { timer: 10 }).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));
    }

    #[test]
    fn reset_is_valid_from_every_phase() {
        let mut sm = SessionMachine::new();
        assert_eq!(apply(&mut sm, SessionEvent::Reset), SessionPhase::Idle);

        apply(&mut sm, SessionEvent::Start { timer: 10 });
        assert_eq!(apply(&mut sm, SessionEvent::Reset), SessionPhase::Idle);

        apply(&mut sm, SessionEvent::Start { timer: 10 });
        apply(&mut sm, SessionEvent::Finish);
        assert_eq!(apply(&mut sm, SessionEvent::Reset), SessionPhase::Idle);
    }

    #[test]
    fn planning_twice_without_applying_is_rejected() {
        let mut sm = SessionMachine::new();
        sm.plan(SessionEvent::Start { timer: 10 }).unwrap();

        let err = sm.plan(SessionEvent::Reset).unwrap_err();
        assert_eq!(err, PlanError::AlreadyPending);
    }

    #[test]
    fn apply_with_a_foreign_plan_id_is_rejected() {
        let mut sm = SessionMachine::new();
        let plan = sm.plan(SessionEvent::Start { timer: 10 }).unwrap();

        let err = sm.apply(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApplyError::IdMismatch { .. }));

        // The original plan is still pending and applies cleanly.
        assert_eq!(
            sm.apply(plan.id).unwrap(),
            SessionPhase::Active {
                question_index: 0,
                remaining: 10
            }
        );
    }

    #[test]
    fn abort_clears_pending() {
        let mut sm = SessionMachine::new();
        let plan = sm.plan(SessionEvent::Start { timer: 10 }).unwrap();
        sm.abort(plan.id).unwrap();

        assert_eq!(sm.phase(), SessionPhase::Idle);
        assert!(sm.snapshot().pending.is_none());
    }

    #[test]
    fn phase_labels_and_room_status() {
        assert_eq!(SessionPhase::Idle.label(), PhaseLabel::Idle);
        assert_eq!(
            SessionPhase::Active {
                question_index: 0,
                remaining: 5
            }
            .label(),
            PhaseLabel::Active
        );
        assert_eq!(SessionPhase::Finished.room_status(), RoomStatus::Finished);
        assert_eq!(SessionPhase::Idle.room_status(), RoomStatus::Open);
    }

    #[test]
    fn session_entity_for_a_fresh_start() {
        let phase = SessionPhase::Active {
            question_index: 0,
            remaining: 10,
        };
        let entity = phase.session_entity(Some(1_700_000_000_000));

        assert_eq!(entity.phase, PhaseLabel::Active);
        assert_eq!(entity.current_question_index, Some(0));
        assert_eq!(entity.timer, Some(10));
        assert_eq!(entity.started_at, Some(1_700_000_000_000));
    }
}
