use crate::error::Result;
use crate::Core::handle::CallbackHandle;
use crate::Core::interrupt::ThreadInterrupt;
use crate::Core::looper::Looper;
use crate::Core::signal::{completion, CallbackOutcome, WaitOutcome};
use crate::Core::store::{HandleStore, DISPATCHER_HANDLE_KEY, USER_CALLBACK_KEY};
use crate::Dispatch::engine::CallbackEngine;
use crate::Dispatch::event::Event;
use crate::Dispatch::runtime::CallbackRuntime;
use crate::Dispatch::state::{DispatchState, RuntimeState};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Entry point for push deliveries.
///
/// Cheap to clone; every clone drives the same runtime. Build one with
/// [`DispatchBuilder`](crate::Dispatch::DispatchBuilder) at process start and
/// hand clones to whatever delivers events.
#[derive(Clone)]
pub struct DispatchService {
    pub(crate) inner: Arc<ServiceInner>,
}

pub(crate) struct ServiceInner {
    pub(crate) shared: Arc<Mutex<DispatchState>>,
    pub(crate) runtime: Arc<CallbackRuntime>,
    pub(crate) store: Arc<dyn HandleStore>,
    pub(crate) looper: Arc<Looper>,
    pub(crate) wait_timeout: Option<Duration>,
}

impl DispatchService {
    pub(crate) fn new(
        engine: Arc<dyn CallbackEngine>,
        store: Arc<dyn HandleStore>,
        looper: Looper,
        wait_timeout: Option<Duration>,
    ) -> Self {
        let shared = Arc::new(Mutex::new(DispatchState::new()));
        let looper = Arc::new(looper);
        let runtime = CallbackRuntime::new(
            Arc::clone(&shared),
            engine,
            Arc::clone(&store),
            Arc::clone(&looper),
        );

        Self {
            inner: Arc::new(ServiceInner {
                shared,
                runtime,
                store,
                looper,
                wait_timeout,
            }),
        }
    }

    /// Processes one delivered event.
    ///
    /// Before the runtime is ready the event is buffered and this returns at
    /// once. Afterwards the callback is scheduled on the worker thread and this
    /// blocks until it has answered, the configured timeout passes, or the
    /// calling thread is interrupted. Never panics and never reports an error
    /// to the caller.
    pub fn handle(&self, event: Event) {
        let (sequence, waiter) = {
            let mut state = self.inner.shared.lock();
            let sequence = state.next_sequence();
            let event = event.with_sequence(sequence);

            if !self.inner.runtime.is_ready() {
                log::info!(
                    "Background runtime has not started yet; event #{} queued ({} pending)",
                    sequence,
                    state.gate.len() + 1
                );
                state.gate.offer(event);
                return;
            }

            if self.inner.runtime.is_worker_thread() {
                // Blocking here would wait on ourselves.
                log::warn!(
                    "Event #{} delivered on the worker thread; not waiting for its callback",
                    sequence
                );
                self.inner.runtime.schedule(event, None);
                return;
            }

            log::info!("Background runtime is ready; processing event #{}", sequence);
            let (signal, waiter) = completion();
            self.inner.runtime.schedule(event, Some(signal));
            (sequence, waiter)
        };

        match waiter.wait(self.inner.wait_timeout) {
            WaitOutcome::Completed(outcome) => match outcome {
                CallbackOutcome::Success(_) => {
                    log::info!("Background message #{} processing completed", sequence)
                }
                other => log::info!(
                    "Background message #{} processing finished with {:?}",
                    sequence,
                    other
                ),
            },
            WaitOutcome::Abandoned => log::warn!(
                "Callback for event #{} was dropped without an answer",
                sequence
            ),
            WaitOutcome::TimedOut => log::warn!(
                "Gave up waiting for the callback of event #{} after {:?}",
                sequence,
                self.inner.wait_timeout.unwrap_or_default()
            ),
            WaitOutcome::Interrupted => {
                log::info!("Interrupted while waiting for the callback of event #{}", sequence);
                ThreadInterrupt::current().interrupt();
            }
        }
    }

    /// Persists the user callback handle. Takes effect at the next start.
    pub fn set_user_callback(&self, handle: CallbackHandle) -> Result<()> {
        log::info!("setUserCallback called with {}", handle);
        self.save(USER_CALLBACK_KEY, handle)
    }

    /// Persists the dispatcher entry-code handle.
    pub fn set_dispatcher_handle(&self, handle: CallbackHandle) -> Result<()> {
        log::info!("setDispatcherHandle called with {}", handle);
        self.save(DISPATCHER_HANDLE_KEY, handle)
    }

    fn save(&self, key: &str, handle: CallbackHandle) -> Result<()> {
        self.inner.store.save(key, handle.raw()).map_err(|e| {
            log::error!("Failed to persist '{}': {}", key, e);
            e
        })?;
        log::debug!("'{}' saved to the handle store", key);
        Ok(())
    }

    /// Starts the runtime unless it already has been.
    ///
    /// `None` uses the persisted dispatcher handle.
    pub fn ensure_started(&self, dispatcher: Option<CallbackHandle>) {
        let dispatcher = match dispatcher {
            Some(handle) => handle,
            None => {
                if self.inner.runtime.state() != RuntimeState::Uninitialized {
                    return;
                }
                self.inner.store.dispatcher_handle()
            }
        };
        self.inner.runtime.start(dispatcher);
    }

    pub fn is_ready(&self) -> bool {
        self.inner.runtime.is_ready()
    }

    pub fn state(&self) -> RuntimeState {
        self.inner.runtime.state()
    }

    /// Events buffered while waiting for readiness.
    pub fn pending_len(&self) -> usize {
        self.inner.shared.lock().gate.len()
    }

    pub fn runtime(&self) -> &Arc<CallbackRuntime> {
        &self.inner.runtime
    }

    pub fn store(&self) -> &Arc<dyn HandleStore> {
        &self.inner.store
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.inner.wait_timeout
    }

    /// Stops the worker thread once queued callbacks have been sent.
    pub fn shutdown(&self) {
        log::info!("Shutting down dispatch worker '{}'", self.inner.looper.name());
        self.inner.looper.shutdown();
    }
}
