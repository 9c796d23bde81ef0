use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use parking_lot::{Condvar, Mutex};

/// Cooperative stop request shared between a session and whoever controls it.
///
/// Solvers poll [`StopSignal::is_requested`] at their checkpoints, a parked
/// daemon session blocks in [`StopSignal::wait`].
#[derive(Clone, Default)]
pub struct StopSignal {
    inner: Arc<StopState>,
}

#[derive(Default)]
struct StopState {
    requested: AtomicBool,
    lock: Mutex<()>,
    cvar: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        let _guard = self.inner.lock.lock();
        self.inner.requested.store(true, Ordering::Release);
        self.inner.cvar.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    pub fn wait(&self) {
        let mut guard = self.inner.lock.lock();
        while !self.is_requested() {
            self.inner.cvar.wait(&mut guard);
        }
    }

    /// Returns whether the stop was requested before the timeout elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.inner.lock.lock();
        if !self.is_requested() {
            self.inner.cvar.wait_for(&mut guard, timeout);
        }
        self.is_requested()
    }
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSignal")
            .field("requested", &self.is_requested())
            .finish()
    }
}
