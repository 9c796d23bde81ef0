use std::sync::{
    Arc,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error};

use crate::{
    error::{RunError, SolveError},
    solver::session::{OptimizationSession, SessionEvent, SessionOutcome, SessionState},
};

use super::session_handle::SessionHandle;

#[derive(Default)]
struct GateCounters {
    active: AtomicUsize,
    pending: AtomicUsize,
    peak_active: AtomicUsize,
    submitted: AtomicU64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct GateStats {
    pub active: usize,
    pub pending: usize,
    pub peak_active: usize,
    pub submitted: u64,
}

/// Runs at most one optimization session at a time.
///
/// `submit` never blocks: the session waits for the single permit on its own
/// task and then runs on the blocking pool. Every event the session produces,
/// including the final [`SessionEvent::Finished`], is sent on the channel
/// given at submission. `Finished` is sent after the permit is released.
#[derive(Clone)]
pub struct ExecutionGate {
    slot: Arc<Semaphore>,
    counters: Arc<GateCounters>,
}

impl Default for ExecutionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionGate {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
            counters: Arc::new(GateCounters::default()),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        session: OptimizationSession,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> SessionHandle {
        let generation = session.generation();
        let stop = session.stop_signal();
        let state = session.shared_state();

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        let waiting = self.counters.pending.fetch_add(1, Ordering::SeqCst);
        if waiting > 0 {
            error!(
                generation,
                error = %RunError::ExecutionGateSaturated { pending: waiting },
                "More than one submission is waiting for the execution slot"
            );
        }

        let slot = Arc::clone(&self.slot);
        let counters = Arc::clone(&self.counters);
        let session_state = Arc::clone(&state);

        let join = tokio::spawn(async move {
            let permit = slot.acquire_owned().await;
            counters.pending.fetch_sub(1, Ordering::SeqCst);

            let Ok(permit) = permit else {
                // The semaphore is never closed; treat it as a stop.
                let _ = events.send(SessionEvent::Finished {
                    generation,
                    outcome: SessionOutcome::Stopped,
                });
                return SessionOutcome::Stopped;
            };

            let active = counters.active.fetch_add(1, Ordering::SeqCst) + 1;
            counters.peak_active.fetch_max(active, Ordering::SeqCst);
            debug!(generation, "Session acquired the execution slot");

            let session_events = events.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                session.run(|event| {
                    let _ = session_events.send(event);
                })
            })
            .await
            .unwrap_or_else(|join_error| {
                error!(generation, "Session task aborted: {join_error}");
                *session_state.write() = SessionState::Stopped;
                SessionOutcome::Failed(SolveError::Panicked)
            });

            counters.active.fetch_sub(1, Ordering::SeqCst);
            drop(permit);
            debug!(generation, ?outcome, "Session released the execution slot");

            let _ = events.send(SessionEvent::Finished {
                generation,
                outcome: outcome.clone(),
            });

            outcome
        });

        SessionHandle::new(generation, stop, state, join)
    }

    pub fn cancel(&self, handle: &SessionHandle) {
        handle.cancel();
    }

    pub fn active_count(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    /// The highest number of sessions ever observed running at once.
    pub fn peak_active(&self) -> usize {
        self.counters.peak_active.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            active: self.active_count(),
            pending: self.pending_count(),
            peak_active: self.peak_active(),
            submitted: self.counters.submitted.load(Ordering::Relaxed),
        }
    }
}
