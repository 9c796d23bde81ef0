use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::solver::{
    session::{SessionOutcome, SessionState},
    stop_signal::StopSignal,
};

/// Handle on a submitted session.
///
/// Dropping the handle requests a stop as well, so a daemon session never
/// outlives its owner.
pub struct SessionHandle {
    generation: u64,
    stop: StopSignal,
    state: Arc<RwLock<SessionState>>,
    join: Option<JoinHandle<SessionOutcome>>,
}

impl SessionHandle {
    pub(crate) fn new(
        generation: u64,
        stop: StopSignal,
        state: Arc<RwLock<SessionState>>,
        join: JoinHandle<SessionOutcome>,
    ) -> Self {
        Self {
            generation,
            stop,
            state,
            join: Some(join),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Requests a cooperative stop. The solver notices it at its next checkpoint.
    pub fn cancel(&self) {
        {
            let mut state = self.state.write();
            if *state != SessionState::Stopped {
                *state = SessionState::Stopping;
            }
        }
        self.stop.request_stop();
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.is_requested()
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the session task. A task that could not be joined counts as stopped.
    pub async fn join(mut self) -> SessionOutcome {
        match self.join.take() {
            Some(join) => join.await.unwrap_or(SessionOutcome::Stopped),
            None => SessionOutcome::Stopped,
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stop.request_stop();
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("generation", &self.generation)
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
