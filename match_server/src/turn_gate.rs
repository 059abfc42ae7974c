use parking_lot::{Condvar, Mutex};

/// A counting gate that a player waits on until it is their turn.
///
/// Each permit lets one waiting call through. The coordinator hands out one permit per
/// turn, and a large batch when a match ends so that nobody stays parked.
#[derive(Debug, Default)]
pub struct TurnGate {
    permits: Mutex<usize>,
    released: Condvar,
}

impl TurnGate {
    /// A gate with no permits.
    pub fn closed() -> Self {
        Self::default()
    }

    /// Takes a permit, waiting for one if none is available.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.released.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Takes a permit if one is available right now.
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    pub fn release(&self, count: usize) {
        let mut permits = self.permits.lock();
        *permits = permits.saturating_add(count);
        if count == 1 {
            self.released.notify_one();
        } else {
            self.released.notify_all();
        }
    }
}
