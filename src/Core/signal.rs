// One-shot completion signal used to block a delivery thread until its
// callback has run.

use crate::Core::interrupt::{self, Wake};
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result reported by the callback executor for one invocation.
///
/// The dispatcher does not distinguish these for the purpose of unblocking a
/// caller; they are kept for logging and for embedders.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    Success(Value),
    Error {
        code: String,
        message: Option<String>,
        details: Option<Value>,
    },
    NotImplemented,
}

/// How a blocking wait on a [`CompletionWaiter`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// The signal was resolved with an outcome.
    Completed(CallbackOutcome),
    /// The signal was dropped without being resolved.
    Abandoned,
    /// The configured timeout elapsed first.
    TimedOut,
    /// The waiting thread was interrupted. The interrupt flag has been consumed.
    Interrupted,
}

enum Slot {
    Pending,
    Resolved(CallbackOutcome),
    Abandoned,
}

struct Shared {
    slot: Mutex<Slot>,
    cond: Condvar,
}

impl Wake for Shared {
    fn wake(&self) {
        // Taking the lock orders the notify after the waiter's flag check.
        let _slot = self.slot.lock();
        self.cond.notify_all();
    }
}

/// Sending half. Resolving consumes it, so it can only ever resolve once.
/// Dropping it unresolved wakes the waiter with `WaitOutcome::Abandoned`.
pub struct CompletionSignal {
    shared: Arc<Shared>,
    settled: bool,
}

/// Receiving half.
pub struct CompletionWaiter {
    shared: Arc<Shared>,
}

/// Creates a connected signal/waiter pair.
pub fn completion() -> (CompletionSignal, CompletionWaiter) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Pending),
        cond: Condvar::new(),
    });
    (
        CompletionSignal {
            shared: Arc::clone(&shared),
            settled: false,
        },
        CompletionWaiter { shared },
    )
}

impl CompletionSignal {
    pub fn resolve(mut self, outcome: CallbackOutcome) {
        self.settle(Slot::Resolved(outcome));
    }

    fn settle(&mut self, value: Slot) {
        self.settled = true;
        let mut slot = self.shared.slot.lock();
        if matches!(*slot, Slot::Pending) {
            *slot = value;
        }
        self.shared.cond.notify_all();
    }
}

impl Drop for CompletionSignal {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(Slot::Abandoned);
        }
    }
}

impl CompletionWaiter {
    /// Blocks until the signal settles, the timeout elapses, or the calling
    /// thread is interrupted. `None` waits without bound.
    pub fn wait(self, timeout: Option<Duration>) -> WaitOutcome {
        let deadline = timeout.map(|t| Instant::now() + t);
        let park = interrupt::park_current(self.shared.clone());

        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(done) = Self::take_settled(&mut slot) {
                return done;
            }
            if park.take_interrupt() {
                return WaitOutcome::Interrupted;
            }
            match deadline {
                Some(deadline) => {
                    if self.shared.cond.wait_until(&mut slot, deadline).timed_out() {
                        return Self::take_settled(&mut slot).unwrap_or(WaitOutcome::TimedOut);
                    }
                }
                None => self.shared.cond.wait(&mut slot),
            }
        }
    }

    /// Non-blocking check.
    pub fn is_settled(&self) -> bool {
        !matches!(*self.shared.slot.lock(), Slot::Pending)
    }

    fn take_settled(slot: &mut Slot) -> Option<WaitOutcome> {
        match std::mem::replace(slot, Slot::Pending) {
            Slot::Pending => None,
            Slot::Resolved(outcome) => Some(WaitOutcome::Completed(outcome)),
            Slot::Abandoned => Some(WaitOutcome::Abandoned),
        }
    }
}

impl fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("settled", &self.settled)
            .finish()
    }
}

impl fmt::Debug for CompletionWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionWaiter")
            .field("settled", &self.is_settled())
            .finish()
    }
}
