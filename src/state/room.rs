use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    model::entities::Standing,
    state::{
        session::{Plan, SessionEvent, SessionMachine, SessionPhase, Snapshot},
        sse::RoomChannels,
    },
};

/// Ceiling on how long a transition's side effects may run before the
/// plan is aborted and the phase rolled back.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

/// Identifier fencing the single timer authority of a room.
pub type LeaseId = Uuid;

/// Stop signal for a running ticker task.
///
/// Tickers are stopped by signal, never aborted: an abort could land
/// between the task claiming the scoring guard and releasing it, which
/// would freeze the room's end-of-question transition forever.
pub struct TickerHandle {
    stop: watch::Sender<bool>,
}

impl TickerHandle {
    /// Wrap the stop channel of a freshly spawned ticker.
    pub fn new(stop: watch::Sender<bool>) -> Self {
        TickerHandle { stop }
    }

    fn signal_stop(&self) {
        let _ = self.stop.send(true);
    }
}

/// Everything the server keeps in memory for one room.
///
/// The state tree holds the durable room data; this runtime holds the
/// coordination pieces around it: the phase machine, the transition
/// gate serialising all phase changes, the scoring guard collapsing
/// concurrent end-of-question triggers, the timer lease fencing stale
/// tickers, and the fan-out channels for connected clients.
pub struct RoomRuntime {
    id: Uuid,
    created_at: u64,
    machine: RwLock<SessionMachine>,
    transition_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
    scoring_guard: AtomicBool,
    timer_lease: RwLock<Option<LeaseId>>,
    ticker: Mutex<Option<TickerHandle>>,
    channels: RoomChannels,
    standings: watch::Sender<Vec<Standing>>,
}

impl RoomRuntime {
    /// Build the runtime for a freshly created room.
    pub fn new(id: Uuid, created_at: u64) -> Arc<Self> {
        let (standings, _) = watch::channel(Vec::new());
        Arc::new(Self {
            id,
            created_at,
            machine: RwLock::new(SessionMachine::new()),
            transition_gate: Mutex::new(()),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
            scoring_guard: AtomicBool::new(false),
            timer_lease: RwLock::new(None),
            ticker: Mutex::new(None),
            channels: RoomChannels::new(16, 16),
            standings,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Epoch milliseconds when the room was created.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Snapshot the current phase of the session machine.
    pub async fn phase(&self) -> SessionPhase {
        self.machine.read().await.phase()
    }

    /// Snapshot of the machine including any pending transition.
    pub async fn snapshot(&self) -> Snapshot {
        self.machine.read().await.snapshot()
    }

    /// Fan-out channels for this room's event streams.
    pub fn channels(&self) -> &RoomChannels {
        &self.channels
    }

    /// Watch the ranked standings maintained by the leaderboard task.
    pub fn standings_watch(&self) -> watch::Receiver<Vec<Standing>> {
        self.standings.subscribe()
    }

    /// Replace the published standings.
    pub fn publish_standings(&self, standings: Vec<Standing>) {
        let _ = self.standings.send(standings);
    }

    /// Claim the end-of-question guard. Exactly one concurrent caller
    /// wins; everyone else must treat the trigger as already handled.
    pub fn begin_scoring(&self) -> bool {
        self.scoring_guard
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the end-of-question guard.
    pub fn finish_scoring(&self) {
        self.scoring_guard.store(false, Ordering::Release);
    }

    /// Mint a new timer lease, fencing whoever held the previous one.
    pub async fn claim_timer_lease(&self) -> LeaseId {
        let lease = Uuid::new_v4();
        let mut slot = self.timer_lease.write().await;
        *slot = Some(lease);
        lease
    }

    /// The lease currently driving this room's clock, if any.
    pub async fn timer_lease(&self) -> Option<LeaseId> {
        *self.timer_lease.read().await
    }

    /// Whether `lease` is still the room's timer authority.
    pub async fn holds_timer_lease(&self, lease: LeaseId) -> bool {
        *self.timer_lease.read().await == Some(lease)
    }

    /// Drop the timer lease so no source may drive the clock.
    pub async fn clear_timer_lease(&self) {
        let mut slot = self.timer_lease.write().await;
        *slot = None;
    }

    /// Install a new ticker, stopping any previous one first.
    pub async fn install_ticker(&self, handle: TickerHandle) {
        let mut slot = self.ticker.lock().await;
        if let Some(previous) = slot.take() {
            previous.signal_stop();
        }
        *slot = Some(handle);
    }

    /// Signal the current ticker, if any, to stop.
    pub async fn stop_ticker(&self) {
        let mut slot = self.ticker.lock().await;
        if let Some(handle) = slot.take() {
            handle.signal_stop();
        }
    }

    /// Serialise a phase transition with its side effects.
    ///
    /// The event is validated first; `work` then runs with the
    /// transition pending and the machine only moves once `work`
    /// succeeds. On error or timeout the plan is aborted and the room
    /// stays in its last fully-committed state.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: SessionEvent,
        work: F,
    ) -> Result<(T, SessionPhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let plan = self.plan_transition(event).await?;
        let result = self.run_planned(plan, work).await;
        drop(gate);
        result
    }

    /// Like [`run_transition`](Self::run_transition), but the event is
    /// chosen from the phase observed under the gate, and `work`
    /// receives the phase the machine will move to. Returns `Ok(None)`
    /// without touching anything when the chooser declines, which is
    /// how stale triggers are absorbed.
    pub async fn run_transition_when<C, F, Fut, T>(
        &self,
        choose: C,
        work: F,
    ) -> Result<Option<(T, SessionPhase)>, ServiceError>
    where
        C: FnOnce(SessionPhase) -> Option<SessionEvent>,
        F: FnOnce(SessionPhase) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let phase = self.machine.read().await.phase();
        let Some(event) = choose(phase) else {
            drop(gate);
            return Ok(None);
        };
        let plan = self.plan_transition(event).await?;
        let result = self.run_planned(plan, || work(plan.to)).await;
        drop(gate);
        result.map(Some)
    }

    async fn run_planned<F, Fut, T>(
        &self,
        plan: Plan,
        work: F,
    ) -> Result<(T, SessionPhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let work_future = work();
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    self.abort_planned(plan).await;
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let next = {
                    let mut machine = self.machine.write().await;
                    machine.apply(plan.id)?
                };
                Ok((value, next))
            }
            Err(err) => {
                self.abort_planned(plan).await;
                Err(err)
            }
        }
    }

    async fn plan_transition(&self, event: SessionEvent) -> Result<Plan, ServiceError> {
        let mut machine = self.machine.write().await;
        Ok(machine.plan(event)?)
    }

    async fn abort_planned(&self, plan: Plan) {
        let mut machine = self.machine.write().await;
        if let Err(error) = machine.abort(plan.id) {
            warn!(
                room = %self.id,
                event = ?plan.event,
                plan_id = %plan.id,
                error = ?error,
                "failed to abort session transition"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::sleep;

    use super::*;

    fn runtime() -> Arc<RoomRuntime> {
        RoomRuntime::new(Uuid::new_v4(), 0)
    }

    #[tokio::test]
    async fn transition_applies_after_successful_work() {
        let room = runtime();

        let (value, next) = room
            .run_transition(SessionEvent::Start { timer: 10 }, || async { Ok(7) })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(
            next,
            SessionPhase::Active {
                question_index: 0,
                remaining: 10
            }
        );
        assert_eq!(room.phase().await, next);
    }

    #[tokio::test]
    async fn failed_work_leaves_the_phase_untouched() {
        let room = runtime();

        let result: Result<((), SessionPhase), _> = room
            .run_transition(SessionEvent::Start { timer: 10 }, || async {
                Err(ServiceError::InvalidState("write failed".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(room.phase().await, SessionPhase::Idle);
        assert!(room.snapshot().await.pending.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_work_times_out_and_aborts() {
        let room = runtime();

        let result: Result<((), SessionPhase), _> = room
            .run_transition(SessionEvent::Start { timer: 10 }, || async {
                sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Timeout)));
        assert_eq!(room.phase().await, SessionPhase::Idle);
        assert!(room.snapshot().await.pending.is_none());
    }

    #[tokio::test]
    async fn declined_chooser_is_a_silent_no_op() {
        let room = runtime();

        let outcome = room
            .run_transition_when(|_| None, |_| async { Ok(()) })
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert_eq!(room.phase().await, SessionPhase::Idle);
    }

    #[tokio::test]
    async fn chooser_sees_the_phase_under_the_gate() {
        let room = runtime();
        room.run_transition(SessionEvent::Start { timer: 3 }, || async { Ok(()) })
            .await
            .unwrap();

        let outcome = room
            .run_transition_when(
                |phase| match phase {
                    SessionPhase::Active { question_index, .. } if question_index == 0 => {
                        Some(SessionEvent::Finish)
                    }
                    _ => None,
                },
                |target| async move {
                    assert_eq!(target, SessionPhase::Finished);
                    Ok(())
                },
            )
            .await
            .unwrap();

        let (_, next) = outcome.unwrap();
        assert_eq!(next, SessionPhase::Finished);
    }

    #[tokio::test]
    async fn scoring_guard_admits_one_winner() {
        let room = runtime();

        assert!(room.begin_scoring());
        assert!(!room.begin_scoring());

        room.finish_scoring();
        assert!(room.begin_scoring());
    }

    #[tokio::test]
    async fn claiming_a_lease_fences_the_previous_owner() {
        let room = runtime();

        let first = room.claim_timer_lease().await;
        assert!(room.holds_timer_lease(first).await);

        let second = room.claim_timer_lease().await;
        assert!(!room.holds_timer_lease(first).await);
        assert!(room.holds_timer_lease(second).await);

        room.clear_timer_lease().await;
        assert!(!room.holds_timer_lease(second).await);
        assert_eq!(room.timer_lease().await, None);
    }
}
