use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{info, warn};

use crate::MatchCoordinator;

/// Inactivity deadline of one match.
#[derive(Debug)]
pub(crate) struct Liveness {
    timeout: Duration,
    state: Mutex<LivenessState>,
    changed: Condvar,
}

#[derive(Debug)]
struct LivenessState {
    deadline: Instant,
    stopped: bool,
}

impl Liveness {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: Mutex::new(LivenessState {
                deadline: Instant::now() + timeout,
                stopped: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Pushes the deadline back by the full timeout.
    pub(crate) fn touch(&self) {
        self.state.lock().deadline = Instant::now() + self.timeout;
    }

    pub(crate) fn stop(&self) {
        self.state.lock().stopped = true;
        self.changed.notify_all();
    }

    /// Returns `true` once the deadline passes, or `false` if stopped first.
    fn wait_for_expiry(&self) -> bool {
        let mut state = self.state.lock();
        loop {
            if state.stopped {
                return false;
            }
            let deadline = state.deadline;
            if Instant::now() >= deadline {
                return true;
            }
            // Touches only move the deadline later, so waking up at the old one is fine.
            self.changed.wait_until(&mut state, deadline);
        }
    }
}

/// Tears the coordinator down once it has been idle for the configured timeout.
///
/// The thread holds only a weak reference, so it never keeps a dropped match alive.
pub(crate) fn spawn_watchdog(coordinator: Weak<MatchCoordinator>, liveness: Arc<Liveness>) {
    let spawned = thread::Builder::new()
        .name(String::from("match-watchdog"))
        .spawn(move || {
            if liveness.wait_for_expiry() {
                if let Some(coordinator) = coordinator.upgrade() {
                    info!(match_name = %coordinator.name(), "Match inactive for too long");
                    coordinator.teardown("inactivity");
                }
            }
        });
    if let Err(err) = spawned {
        warn!(%err, "Could not start the inactivity watchdog");
    }
}
