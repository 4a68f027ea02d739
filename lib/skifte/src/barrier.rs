use std::sync::{Condvar, Mutex};

use crate::utils::{fatal, lock_or_die};

/// Reusable rendezvous for a fixed number of worker threads.
///
/// The k-th call to [`arrive_and_wait`](PhaseBarrier::arrive_and_wait)
/// unblocks only once all participants have made their k-th call; the
/// barrier is then ready for the next generation. Waiters block on the
/// generation counter rather than the arrival count, so a fast thread
/// reaching the next barrier cannot race a slow one out of the current
/// generation.
pub(crate) struct PhaseBarrier {
    state: Mutex<BarrierState>,
    cv: Condvar,
    participants: usize,
}

struct BarrierState {
    arrived: usize,
    generation: u64,
}

impl PhaseBarrier {
    pub(crate) fn new(participants: usize) -> Self {
        PhaseBarrier {
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
            }),
            cv: Condvar::new(),
            participants,
        }
    }

    pub(crate) fn arrive_and_wait(&self) {
        let mut state = lock_or_die(&self.state, "barrier");
        state.arrived += 1;
        if state.arrived == self.participants {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cv.notify_all();
            return;
        }
        let generation = state.generation;
        while state.generation == generation {
            state = match self.cv.wait(state) {
                Ok(guard) => guard,
                Err(_) => fatal("failed to wait on barrier condition variable"),
            };
        }
    }
}
