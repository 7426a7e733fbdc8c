use crate::Core::looper::Looper;
use crate::Dispatch::jobs::JobScheduler;
use crate::Dispatch::runtime::CallbackRuntime;
use crate::Dispatch::service::DispatchService;
use std::fmt;

// Shown in place of fields guarded by a lock that is currently held.
const LOCKED: &str = "<locked>";

/// Debug function for DispatchService
///
/// Shows:
/// - Runtime state and readiness
/// - Number of buffered events
/// - Configured wait timeout
///
/// Never blocks on the state lock; fields behind it read `<locked>` while it
/// is held elsewhere.
pub fn debug_dispatch_service(service: &DispatchService, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut s = f.debug_struct("DispatchService");
    match service.inner.shared.try_lock() {
        Some(state) => {
            s.field("state", &state.runtime);
            s.field("pending", &state.gate.len());
        }
        None => {
            s.field("state", &LOCKED);
            s.field("pending", &LOCKED);
        }
    }
    s.field("ready", &service.is_ready())
        .field("wait_timeout", &service.wait_timeout())
        .field("store", &"<opaque>")
        .finish()
}

/// Debug function for CallbackRuntime
pub fn debug_callback_runtime(runtime: &CallbackRuntime, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut s = f.debug_struct("CallbackRuntime");
    match runtime.shared.try_lock() {
        Some(state) => {
            s.field("state", &state.runtime)
                .field("user_callback", &state.user_callback)
                .field("channel", &state.channel)
                .field("contexts_built", &state.contexts_built);
        }
        None => {
            s.field("state", &LOCKED);
        }
    }
    s.field("ready", &runtime.is_ready())
        .field("worker", &runtime.looper.name())
        .finish()
}

/// Debug function for Looper
pub fn debug_looper(looper: &Looper, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Looper")
        .field("name", &looper.name())
        .field("backlog", &looper.backlog())
        .field("closed", &looper.is_closed())
        .finish()
}

/// Debug function for JobScheduler
pub fn debug_job_scheduler(jobs: &JobScheduler, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("JobScheduler")
        .field("backlog", &jobs.backlog())
        .field("service", jobs.service())
        .finish()
}
