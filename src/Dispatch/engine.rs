//! Boundary to the environment that actually runs callback code.
//!
//! The dispatcher never runs user code itself. It asks a [`CallbackEngine`] for
//! a fresh [`ExecutionContext`], starts the dispatcher entry code inside it,
//! and talks to that entry code over named method channels.

use crate::error::Result;
use crate::Core::handle::CallbackHandle;
use crate::Dispatch::channel::Reply;
use serde_json::Value;
use std::sync::Arc;

/// Executable entry code resolved from a dispatcher handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub handle: CallbackHandle,
    pub name: String,
}

/// One method invocation travelling over a channel, in either direction.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Receives calls made by code running inside an execution context.
pub trait MethodHandler: Send + Sync {
    fn on_method_call(&self, call: MethodCall, reply: Reply);
}

/// An isolated environment in which callback code runs.
pub trait ExecutionContext: Send + Sync {
    /// Installs the handler for calls the context makes on `channel`.
    fn set_method_handler(&self, channel: &str, handler: Arc<dyn MethodHandler>);

    /// Delivers `call` to the code listening on `channel`. The context must
    /// eventually resolve or drop `reply`.
    fn invoke_method(&self, channel: &str, call: MethodCall, reply: Reply);

    /// Starts `entry` asynchronously. Must not wait for the entry code to
    /// finish; it may run for the life of the context.
    fn run_entry(&self, entry: EntryPoint) -> Result<()>;
}

/// Factory for execution contexts plus the handle-to-code lookup.
pub trait CallbackEngine: Send + Sync {
    /// Resolves a dispatcher handle into entry code.
    fn lookup(&self, handle: CallbackHandle) -> Option<EntryPoint>;

    /// Builds a fresh, empty execution context.
    fn create_context(&self) -> Result<Arc<dyn ExecutionContext>>;
}
