pub mod builder;
mod debug;
pub mod channel;
pub mod engine;
pub mod event;
pub mod gate;
pub mod jobs;
pub mod local;
pub mod receiver;
pub mod runtime;
pub mod service;
pub mod state;

pub use builder::{DispatchBuilder, DispatchConfig};
pub use channel::{InvocationChannel, Reply};
pub use engine::{CallbackEngine, EntryPoint, ExecutionContext, MethodCall, MethodHandler};
pub use event::{Event, InvocationRequest};
pub use gate::EventQueueGate;
pub use jobs::JobScheduler;
pub use local::{CallbackError, IsolateScope, LocalEngine};
pub use receiver::{BackgroundMessageReceiver, Delivery, ReceiveOutcome};
pub use runtime::CallbackRuntime;
pub use service::DispatchService;
pub use state::RuntimeState;
