//! In-process [`CallbackEngine`] running Rust closures.
//!
//! Entry code and user callbacks are registered by name; their handles come
//! from [`CallbackHandle::from_name`]. Each execution context owns one
//! "isolate" thread that serves invocations, routing each to the user callback
//! named by the handle in its arguments. Entry code runs on a thread of its own
//! and may keep running for the life of the process.

use crate::error::{DispatchError, Result};
use crate::Core::handle::CallbackHandle;
use crate::Core::looper::Looper;
use crate::Dispatch::channel::{Reply, BACKGROUND_CHANNEL, DISPATCH_METHOD, INITIALIZE_METHOD};
use crate::Dispatch::engine::{CallbackEngine, EntryPoint, ExecutionContext, MethodCall, MethodHandler};
use crate::Dispatch::event::InvocationRequest;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

/// Failure reported by a user callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackError {
    pub code: String,
    pub message: String,
}

impl CallbackError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type EntryFn = Arc<dyn Fn(&IsolateScope) + Send + Sync>;
pub type UserCallbackFn = Arc<dyn Fn(Value) -> std::result::Result<Value, CallbackError> + Send + Sync>;

#[derive(Clone)]
enum Registered {
    Entry { name: String, run: EntryFn },
    Callback { name: String, run: UserCallbackFn },
}

type Handlers = Arc<Mutex<HashMap<String, Arc<dyn MethodHandler>>>>;

/// Engine whose callbacks are plain Rust closures.
#[derive(Default)]
pub struct LocalEngine {
    registry: Arc<RwLock<HashMap<CallbackHandle, Registered>>>,
    contexts_created: AtomicU64,
}

impl LocalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers dispatcher entry code under `name`.
    pub fn register_entry<F>(&self, name: &str, entry: F) -> CallbackHandle
    where
        F: Fn(&IsolateScope) + Send + Sync + 'static,
    {
        self.register(
            name,
            Registered::Entry {
                name: name.to_string(),
                run: Arc::new(entry),
            },
        )
    }

    /// Registers a user callback under `name`.
    pub fn register_callback<F>(&self, name: &str, callback: F) -> CallbackHandle
    where
        F: Fn(Value) -> std::result::Result<Value, CallbackError> + Send + Sync + 'static,
    {
        self.register(
            name,
            Registered::Callback {
                name: name.to_string(),
                run: Arc::new(callback),
            },
        )
    }

    fn register(&self, name: &str, registered: Registered) -> CallbackHandle {
        let handle = CallbackHandle::from_name(name);
        if self.registry.write().insert(handle, registered).is_some() {
            log::warn!("Callback '{}' registered twice; keeping the latest", name);
        }
        handle
    }

    /// Number of execution contexts this engine has built.
    pub fn contexts_created(&self) -> u64 {
        self.contexts_created.load(Ordering::Acquire)
    }
}

impl CallbackEngine for LocalEngine {
    fn lookup(&self, handle: CallbackHandle) -> Option<EntryPoint> {
        match self.registry.read().get(&handle) {
            Some(Registered::Entry { name, .. }) => Some(EntryPoint {
                handle,
                name: name.clone(),
            }),
            _ => None,
        }
    }

    fn create_context(&self) -> Result<Arc<dyn ExecutionContext>> {
        let id = self.contexts_created.fetch_add(1, Ordering::AcqRel) + 1;
        let isolate = Looper::spawn(format!("push-dispatch-isolate-{}", id))?;
        log::debug!("Created local execution context {}", id);

        Ok(Arc::new(LocalContext {
            id,
            registry: Arc::clone(&self.registry),
            handlers: Arc::new(Mutex::new(HashMap::new())),
            isolate,
        }))
    }
}

impl fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEngine")
            .field("registered", &self.registry.read().len())
            .field("contexts_created", &self.contexts_created())
            .finish()
    }
}

struct LocalContext {
    id: u64,
    registry: Arc<RwLock<HashMap<CallbackHandle, Registered>>>,
    handlers: Handlers,
    isolate: Looper,
}

impl ExecutionContext for LocalContext {
    fn set_method_handler(&self, channel: &str, handler: Arc<dyn MethodHandler>) {
        self.handlers.lock().insert(channel.to_string(), handler);
    }

    fn invoke_method(&self, channel: &str, call: MethodCall, reply: Reply) {
        let registry = Arc::clone(&self.registry);
        let channel = channel.to_string();
        // A refused post drops the reply, which still wakes any waiter.
        if let Err(e) = self
            .isolate
            .post(move || dispatch_call(&registry, &channel, call, reply))
        {
            log::warn!("Isolate refused invocation: {}", e);
        }
    }

    fn run_entry(&self, entry: EntryPoint) -> Result<()> {
        let run = match self.registry.read().get(&entry.handle) {
            Some(Registered::Entry { run, .. }) => Arc::clone(run),
            _ => return Err(DispatchError::CallbackNotFound(entry.handle)),
        };
        let scope = IsolateScope {
            entry,
            handlers: Arc::clone(&self.handlers),
        };
        thread::Builder::new()
            .name(format!("push-dispatch-entry-{}", self.id))
            .spawn(move || {
                if panic::catch_unwind(AssertUnwindSafe(|| run(&scope))).is_err() {
                    log::error!("Entry code '{}' panicked", scope.entry.name);
                }
            })?;
        Ok(())
    }
}

/// Entry-code side of the dispatcher conversation, run on the isolate thread.
fn dispatch_call(
    registry: &RwLock<HashMap<CallbackHandle, Registered>>,
    channel: &str,
    call: MethodCall,
    reply: Reply,
) {
    if channel != BACKGROUND_CHANNEL || call.method != DISPATCH_METHOD {
        reply.not_implemented();
        return;
    }

    let Some(request) = InvocationRequest::from_arguments(&call.arguments) else {
        reply.error("-1", Some("malformed invocation arguments".to_string()), None);
        return;
    };

    let callback = match registry.read().get(&request.user_callback) {
        Some(Registered::Callback { name, run }) => Some((name.clone(), Arc::clone(run))),
        _ => None,
    };
    let Some((name, run)) = callback else {
        reply.error(
            "-1",
            Some(format!("no user callback registered for handle {}", request.user_callback)),
            None,
        );
        return;
    };

    log::debug!("Running user callback '{}'", name);
    match panic::catch_unwind(AssertUnwindSafe(|| run(request.payload))) {
        Ok(Ok(value)) => reply.success(value),
        Ok(Err(e)) => reply.error(e.code, Some(e.message), None),
        Err(_) => reply.error("-1", Some(format!("user callback '{}' panicked", name)), None),
    }
}

/// What entry code can do while it runs.
pub struct IsolateScope {
    entry: EntryPoint,
    handlers: Handlers,
}

impl IsolateScope {
    pub fn entry(&self) -> &EntryPoint {
        &self.entry
    }

    /// Calls the host side of `channel`. The answer is discarded.
    pub fn call_host(&self, channel: &str, method: &str, arguments: Value) -> bool {
        let handler = self.handlers.lock().get(channel).cloned();
        match handler {
            Some(handler) => {
                handler.on_method_call(MethodCall::new(method, arguments), Reply::detached(method));
                true
            }
            None => {
                log::warn!("No host handler on channel '{}'", channel);
                false
            }
        }
    }

    /// Tells the host runtime the entry code is listening.
    pub fn initialize(&self) -> bool {
        self.call_host(BACKGROUND_CHANNEL, INITIALIZE_METHOD, Value::Null)
    }
}

impl fmt::Debug for IsolateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsolateScope")
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}
