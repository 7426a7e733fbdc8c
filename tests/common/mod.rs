// Shared helpers for the integration tests.
#![allow(dead_code)]

use parking_lot::Mutex;
use push_dispatch::Core::CallbackHandle;
use push_dispatch::Dispatch::channel::INITIALIZE_METHOD;
use push_dispatch::Dispatch::{
    CallbackEngine, EntryPoint, ExecutionContext, InvocationRequest, MethodCall, MethodHandler,
    Reply,
};
use push_dispatch::{DispatchError, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const DISPATCHER: CallbackHandle = CallbackHandle::new(1001);
pub const USER_CALLBACK: CallbackHandle = CallbackHandle::new(2002);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Polls `condition` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut condition: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// How the scripted entry code answers an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Success,
    Error,
    NotImplemented,
    /// Keep the reply until `ScriptedEngine::release` is called.
    Hold,
}

pub fn answer(reply: Reply, answer: Answer) {
    match answer {
        Answer::Success => reply.success(json!("ok")),
        Answer::Error => reply.error("-1", Some("callback failed".to_string()), None),
        Answer::NotImplemented => reply.not_implemented(),
        Answer::Hold => unreachable!("held replies are answered by release()"),
    }
}

#[derive(Default)]
struct Script {
    answer: Mutex<Option<Answer>>,
    invocations: Mutex<Vec<InvocationRequest>>,
    held: Mutex<Vec<Reply>>,
    handler: Mutex<Option<Arc<dyn MethodHandler>>>,
    contexts: AtomicUsize,
    entry_runs: AtomicUsize,
    initialize_on_entry: AtomicBool,
    fail_create: AtomicBool,
}

/// Engine whose entry code is driven by the test.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    script: Arc<Script>,
}

impl ScriptedEngine {
    pub fn new(answer: Answer) -> Self {
        let engine = Self::default();
        engine.set_answer(answer);
        engine
    }

    pub fn set_answer(&self, answer: Answer) {
        *self.script.answer.lock() = Some(answer);
    }

    /// Entry code calls `BackgroundRunner.initialize` as soon as it runs.
    pub fn initialize_on_entry(self) -> Self {
        self.script.initialize_on_entry.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_context_creation(&self, fail: bool) {
        self.script.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn invocations(&self) -> Vec<InvocationRequest> {
        self.script.invocations.lock().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.script.invocations.lock().len()
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.invocations().into_iter().map(|r| r.payload).collect()
    }

    pub fn held_count(&self) -> usize {
        self.script.held.lock().len()
    }

    /// Answers every held reply with `answer`.
    pub fn release(&self, with: Answer) -> usize {
        let held: Vec<Reply> = self.script.held.lock().drain(..).collect();
        let count = held.len();
        for reply in held {
            answer(reply, with);
        }
        count
    }

    pub fn contexts(&self) -> usize {
        self.script.contexts.load(Ordering::SeqCst)
    }

    pub fn entry_runs(&self) -> usize {
        self.script.entry_runs.load(Ordering::SeqCst)
    }

    /// Makes an inbound call on the host handler, as entry code would.
    pub fn call_host(&self, method: &str) -> bool {
        let handler = self.script.handler.lock().clone();
        match handler {
            Some(handler) => {
                handler.on_method_call(MethodCall::new(method, Value::Null), Reply::detached(method));
                true
            }
            None => false,
        }
    }
}

impl CallbackEngine for ScriptedEngine {
    fn lookup(&self, handle: CallbackHandle) -> Option<EntryPoint> {
        (handle == DISPATCHER).then(|| EntryPoint {
            handle,
            name: "scripted_dispatcher".to_string(),
        })
    }

    fn create_context(&self) -> Result<Arc<dyn ExecutionContext>> {
        if self.script.fail_create.load(Ordering::SeqCst) {
            return Err(DispatchError::Engine("context creation disabled".to_string()));
        }
        self.script.contexts.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptedContext {
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptedContext {
    script: Arc<Script>,
}

impl ExecutionContext for ScriptedContext {
    fn set_method_handler(&self, _channel: &str, handler: Arc<dyn MethodHandler>) {
        *self.script.handler.lock() = Some(handler);
    }

    fn invoke_method(&self, _channel: &str, call: MethodCall, reply: Reply) {
        if let Some(request) = InvocationRequest::from_arguments(&call.arguments) {
            self.script.invocations.lock().push(request);
        }
        let answer_with = self.script.answer.lock().unwrap_or(Answer::Success);
        match answer_with {
            Answer::Hold => self.script.held.lock().push(reply),
            other => answer(reply, other),
        }
    }

    fn run_entry(&self, _entry: EntryPoint) -> Result<()> {
        self.script.entry_runs.fetch_add(1, Ordering::SeqCst);
        if self.script.initialize_on_entry.load(Ordering::SeqCst) {
            let handler = self.script.handler.lock().clone();
            if let Some(handler) = handler {
                handler.on_method_call(
                    MethodCall::new(INITIALIZE_METHOD, Value::Null),
                    Reply::detached(INITIALIZE_METHOD),
                );
            }
        }
        Ok(())
    }
}
