//! Cooperative thread interruption.
//!
//! Each thread owns an interrupt flag. Any thread holding a [`ThreadInterrupt`]
//! for it may set the flag; if the target is parked in an interruptible wait
//! (see `Core::signal`) it is woken and the wait reports `Interrupted`.
//!
//! An interruptible wait consumes the flag when it observes it. Callers that
//! give up because of an interrupt are expected to restore it with
//! `ThreadInterrupt::current().interrupt()` so code further up the stack can
//! still see it.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Something parked on a condition that an interrupt must be able to wake.
pub(crate) trait Wake: Send + Sync {
    fn wake(&self);
}

#[derive(Default)]
struct InterruptState {
    flag: AtomicBool,
    parked: Mutex<Option<Arc<dyn Wake>>>,
}

thread_local! {
    static CURRENT: Arc<InterruptState> = Arc::new(InterruptState::default());
}

/// Handle to one thread's interrupt flag. Cheap to clone and `Send`.
#[derive(Clone)]
pub struct ThreadInterrupt {
    state: Arc<InterruptState>,
    thread_name: Option<String>,
}

impl ThreadInterrupt {
    /// Handle for the calling thread.
    pub fn current() -> Self {
        Self {
            state: CURRENT.with(Arc::clone),
            thread_name: std::thread::current().name().map(str::to_owned),
        }
    }

    /// Sets the flag and wakes the thread if it is parked.
    pub fn interrupt(&self) {
        self.state.flag.store(true, Ordering::SeqCst);
        let parked = self.state.parked.lock().clone();
        if let Some(waker) = parked {
            waker.wake();
        }
    }

    /// Reads the flag without clearing it.
    pub fn is_interrupted(&self) -> bool {
        self.state.flag.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ThreadInterrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadInterrupt")
            .field("thread", &self.thread_name.as_deref().unwrap_or("<unnamed>"))
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Reads and clears the calling thread's flag.
pub fn interrupted() -> bool {
    CURRENT.with(|state| state.flag.swap(false, Ordering::SeqCst))
}

/// Reads the calling thread's flag without clearing it.
pub fn is_interrupted() -> bool {
    CURRENT.with(|state| state.flag.load(Ordering::SeqCst))
}

/// Registration of the calling thread as parked on `waker`. Unregisters on drop.
pub(crate) struct ParkGuard {
    state: Arc<InterruptState>,
}

impl ParkGuard {
    /// Consumes a pending interrupt, if any.
    pub(crate) fn take_interrupt(&self) -> bool {
        self.state.flag.swap(false, Ordering::SeqCst)
    }
}

impl Drop for ParkGuard {
    fn drop(&mut self) {
        *self.state.parked.lock() = None;
    }
}

pub(crate) fn park_current(waker: Arc<dyn Wake>) -> ParkGuard {
    let state = CURRENT.with(Arc::clone);
    *state.parked.lock() = Some(waker);
    ParkGuard { state }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_clears_the_flag() {
        let me = ThreadInterrupt::current();
        assert!(!is_interrupted());

        me.interrupt();
        assert!(is_interrupted());
        assert!(interrupted());
        assert!(!interrupted());
        assert!(!me.is_interrupted());
    }

    #[test]
    fn flags_are_per_thread() {
        let me = ThreadInterrupt::current();
        let other = std::thread::spawn(|| {
            let handle = ThreadInterrupt::current();
            handle.interrupt();
            is_interrupted()
        })
        .join()
        .unwrap();

        assert!(other);
        assert!(!me.is_interrupted());
    }
}
