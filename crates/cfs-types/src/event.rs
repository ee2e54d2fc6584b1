use std::sync::atomic::{Ordering, AtomicBool};
use std::sync::Arc;

use tracing::trace;
use event_listener::Event;

const STOP_ORDERING: Ordering = Ordering::SeqCst;

pub type SharedStopSignal = Arc<StopSignal>;

/// One-shot broadcast used to stop background loops.
/// Once fired it stays fired; every current and future listener returns immediately.
#[derive(Debug)]
pub struct StopSignal {
    stopped: AtomicBool,
    event: Event,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self {
            stopped: AtomicBool::new(false),
            event: Event::new(),
        }
    }
}

impl StopSignal {
    pub fn shared() -> SharedStopSignal {
        Arc::new(Self::default())
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(STOP_ORDERING)
    }

    /// wait until signal is fired
    pub async fn stopped(&self) {
        if self.is_stopped() {
            trace!("already stopped");
            return;
        }

        let listener = self.event.listen();

        // fired between the check and registering the listener
        if self.is_stopped() {
            trace!("stopped while registering");
            return;
        }

        listener.await
    }

    /// fire the signal, returns false if it was already fired
    pub fn stop(&self) -> bool {
        let first = !self.stopped.swap(true, STOP_ORDERING);
        self.event.notify(usize::MAX);
        first
    }
}
