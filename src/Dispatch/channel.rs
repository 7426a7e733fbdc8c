use crate::Core::signal::{CallbackOutcome, CompletionSignal};
use crate::Dispatch::engine::{ExecutionContext, MethodCall, MethodHandler};
use crate::Dispatch::event::InvocationRequest;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Name of the channel between the runtime and the dispatcher entry code.
pub const BACKGROUND_CHANNEL: &str = "push.dispatch/background";

/// Method used for outbound invocations. The entry code routes on the handle
/// inside the arguments, not on the method name.
pub const DISPATCH_METHOD: &str = "";

/// Inbound method with which the entry code announces readiness.
pub const INITIALIZE_METHOD: &str = "BackgroundRunner.initialize";

/// Answer slot for a single method call.
///
/// Every answer, whatever its kind, resolves the attached completion signal.
/// A reply that is dropped unanswered drops its signal, which still wakes the
/// waiter.
pub struct Reply {
    method: String,
    signal: Option<CompletionSignal>,
}

impl Reply {
    pub fn new(method: impl Into<String>, signal: Option<CompletionSignal>) -> Self {
        Self {
            method: method.into(),
            signal,
        }
    }

    /// A reply nobody waits for.
    pub fn detached(method: impl Into<String>) -> Self {
        Self::new(method, None)
    }

    pub fn is_awaited(&self) -> bool {
        self.signal.is_some()
    }

    pub fn success(self, result: Value) {
        self.resolve(CallbackOutcome::Success(result));
    }

    pub fn error(self, code: impl Into<String>, message: Option<String>, details: Option<Value>) {
        self.resolve(CallbackOutcome::Error {
            code: code.into(),
            message,
            details,
        });
    }

    pub fn not_implemented(self) {
        self.resolve(CallbackOutcome::NotImplemented);
    }

    pub fn resolve(mut self, outcome: CallbackOutcome) {
        match &outcome {
            CallbackOutcome::Success(_) => {
                log::debug!("Call '{}' completed", self.method)
            }
            CallbackOutcome::Error { code, message, .. } => log::warn!(
                "Call '{}' failed with {}: {}",
                self.method,
                code,
                message.as_deref().unwrap_or("<no message>")
            ),
            CallbackOutcome::NotImplemented => {
                log::warn!("Call '{}' is not implemented by the receiver", self.method)
            }
        }

        if let Some(signal) = self.signal.take() {
            signal.resolve(outcome);
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("method", &self.method)
            .field("awaited", &self.is_awaited())
            .finish()
    }
}

/// A named method channel bound to one execution context.
#[derive(Clone)]
pub struct InvocationChannel {
    name: &'static str,
    context: Arc<dyn ExecutionContext>,
}

impl InvocationChannel {
    /// Binds the channel and installs `handler` for inbound calls.
    pub fn attach(
        name: &'static str,
        context: Arc<dyn ExecutionContext>,
        handler: Arc<dyn MethodHandler>,
    ) -> Self {
        context.set_method_handler(name, handler);
        Self { name, context }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Sends one invocation request to the dispatcher entry code.
    pub fn invoke(&self, request: &InvocationRequest, reply: Reply) {
        let call = MethodCall::new(DISPATCH_METHOD, request.to_arguments());
        self.context.invoke_method(self.name, call, reply);
    }
}

impl fmt::Debug for InvocationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationChannel")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
