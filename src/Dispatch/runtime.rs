// Owner of the single background execution context.

use crate::error::{DispatchError, Result};
use crate::Core::handle::CallbackHandle;
use crate::Core::looper::Looper;
use crate::Core::signal::CompletionSignal;
use crate::Core::store::HandleStore;
use crate::Dispatch::channel::{InvocationChannel, Reply, BACKGROUND_CHANNEL, INITIALIZE_METHOD};
use crate::Dispatch::engine::{CallbackEngine, MethodCall, MethodHandler};
use crate::Dispatch::event::{Event, InvocationRequest};
use crate::Dispatch::state::{DispatchState, RuntimeState};
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Brings the background execution context online, runs user callbacks in it
/// and publishes readiness.
///
/// ### Readiness
/// The runtime turns ready as soon as the context is built and the dispatcher
/// entry code has been launched, without waiting for the entry code to say so.
/// Entry code may never announce itself (it can sit in its own event loop
/// forever), and events must not stay buffered in that case. The price is
/// that the first invocations can reach entry code that has not installed its
/// listener yet. The entry code may also call `BackgroundRunner.initialize`;
/// whichever trigger arrives first wins and the other is a no-op.
pub struct CallbackRuntime {
    pub(crate) shared: Arc<Mutex<DispatchState>>,
    ready: CachePadded<AtomicBool>,
    engine: Arc<dyn CallbackEngine>,
    store: Arc<dyn HandleStore>,
    pub(crate) looper: Arc<Looper>,
    this: Weak<CallbackRuntime>,
}

impl CallbackRuntime {
    pub(crate) fn new(
        shared: Arc<Mutex<DispatchState>>,
        engine: Arc<dyn CallbackEngine>,
        store: Arc<dyn HandleStore>,
        looper: Arc<Looper>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            shared,
            ready: CachePadded::new(AtomicBool::new(false)),
            engine,
            store,
            looper,
            this: this.clone(),
        })
    }

    /// Starts the runtime with `dispatcher` as entry code.
    ///
    /// Only the first call on an uninitialized runtime does anything; the
    /// context is then built asynchronously on the worker thread.
    pub fn start(&self, dispatcher: CallbackHandle) {
        {
            let mut state = self.shared.lock();
            if state.runtime != RuntimeState::Uninitialized {
                log::info!(
                    "Background runtime is already {:?}; ignoring start",
                    state.runtime
                );
                return;
            }
            state.user_callback = self.store.user_callback();
            state.runtime = RuntimeState::Starting;
            log::info!(
                "Starting background runtime (dispatcher {}, user callback {})",
                dispatcher,
                state.user_callback
            );
        }

        let this = self.this.clone();
        let posted = self.looper.post(move || {
            if let Some(runtime) = this.upgrade() {
                runtime.bootstrap(dispatcher);
            }
        });
        if let Err(e) = posted {
            log::error!("Could not schedule runtime bootstrap: {}", e);
            self.abort_start();
        }
    }

    /// Lock-free readiness check.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn state(&self) -> RuntimeState {
        self.shared.lock().runtime
    }

    /// Whether an execution context is attached.
    pub fn has_context(&self) -> bool {
        self.shared.lock().channel.is_some()
    }

    /// Number of execution contexts ever built by this runtime.
    pub fn contexts_built(&self) -> u64 {
        self.shared.lock().contexts_built
    }

    /// The user callback loaded at start.
    pub fn user_callback(&self) -> CallbackHandle {
        self.shared.lock().user_callback
    }

    /// Sends `event` to the user callback.
    ///
    /// Without an execution context this logs and returns; no request is sent.
    /// `signal`, if given, is resolved by whatever answer the context gives
    /// (success, error or not-implemented alike).
    pub fn execute(&self, event: Event, signal: Option<CompletionSignal>) {
        let (channel, user_callback) = {
            let state = self.shared.lock();
            match &state.channel {
                Some(channel) => (channel.clone(), state.user_callback),
                None => {
                    log::info!(
                        "Event #{} could not be handled: no background handler has been registered",
                        event.sequence()
                    );
                    return;
                }
            }
        };

        let sequence = event.sequence();
        let Some(payload) = event.into_payload() else {
            log::error!("Event #{} carries no message; dropping it", sequence);
            return;
        };

        log::info!(
            "Invoking user callback {} for event #{} over '{}'",
            user_callback,
            sequence,
            channel.name()
        );
        let request = InvocationRequest::new(user_callback, payload);
        let reply = Reply::new(format!("{}#{}", channel.name(), sequence), signal);
        channel.invoke(&request, reply);
    }

    /// Posts `execute(event, signal)` onto the worker thread.
    pub fn schedule(&self, event: Event, signal: Option<CompletionSignal>) {
        let sequence = event.sequence();
        let this = self.this.clone();
        let posted = self.looper.post(move || {
            if let Some(runtime) = this.upgrade() {
                runtime.execute(event, signal);
            }
        });
        if let Err(e) = posted {
            log::warn!("Could not schedule callback for event #{}: {}", sequence, e);
        }
    }

    /// True on the worker thread that runs every `execute`.
    pub fn is_worker_thread(&self) -> bool {
        self.looper.is_current()
    }

    fn bootstrap(&self, dispatcher: CallbackHandle) {
        match self.build_context(dispatcher) {
            Ok(()) => {
                log::info!("Execution context created; marking runtime ready without waiting for entry code");
                self.mark_ready();
            }
            Err(e) => {
                log::error!("Failed to start background runtime: {}", e);
                self.abort_start();
            }
        }
    }

    fn build_context(&self, dispatcher: CallbackHandle) -> Result<()> {
        if !dispatcher.is_set() {
            return Err(DispatchError::HandleUnset("dispatcher"));
        }

        let context = self.engine.create_context()?;
        let entry = self
            .engine
            .lookup(dispatcher)
            .ok_or(DispatchError::CallbackNotFound(dispatcher))?;

        let handler = Arc::new(InboundHandler {
            runtime: self.this.clone(),
        });
        let channel = InvocationChannel::attach(BACKGROUND_CHANNEL, Arc::clone(&context), handler);
        {
            let mut state = self.shared.lock();
            state.channel = Some(channel);
            state.contexts_built += 1;
        }

        log::info!("Running dispatcher entry code '{}'", entry.name);
        context.run_entry(entry)
    }

    fn abort_start(&self) {
        let mut state = self.shared.lock();
        if state.runtime == RuntimeState::Starting {
            state.runtime = RuntimeState::Uninitialized;
            state.channel = None;
            log::warn!(
                "Background runtime returned to uninitialized; {} event(s) stay buffered",
                state.gate.len()
            );
        }
    }

    /// Flips the runtime to ready and releases buffered events.
    ///
    /// Returns false when this trigger lost the race (or the runtime was
    /// never started).
    pub(crate) fn mark_ready(&self) -> bool {
        let mut state = self.shared.lock();
        match state.runtime {
            RuntimeState::Ready => {
                log::debug!("Background runtime already ready");
                return false;
            }
            RuntimeState::Uninitialized => {
                log::warn!("Readiness signalled for a runtime that is not starting; ignoring");
                return false;
            }
            RuntimeState::Starting => {}
        }

        state.runtime = RuntimeState::Ready;
        self.ready.store(true, Ordering::Release);
        log::info!("Background runtime is ready");

        // Still under the lock: drained events reach the worker before any
        // event that observes the ready flag.
        state.gate.drain_and_execute(|event| self.schedule(event, None));
        true
    }

    fn on_inbound(&self, method: &str) -> bool {
        if method == INITIALIZE_METHOD {
            log::info!("{} called from entry code", INITIALIZE_METHOD);
            self.mark_ready();
            true
        } else {
            false
        }
    }
}

/// Handler the runtime installs on its channel.
struct InboundHandler {
    runtime: Weak<CallbackRuntime>,
}

impl MethodHandler for InboundHandler {
    fn on_method_call(&self, call: MethodCall, reply: Reply) {
        let Some(runtime) = self.runtime.upgrade() else {
            reply.error("-1", Some("background runtime is gone".to_string()), None);
            return;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| runtime.on_inbound(&call.method))) {
            Ok(true) => reply.success(Value::from(1)),
            Ok(false) => {
                log::warn!("Unknown method called: {}", call.method);
                reply.not_implemented();
            }
            Err(_) => reply.error(
                "-1",
                Some(format!("handling '{}' panicked", call.method)),
                None,
            ),
        }
    }
}
