use crate::Core::handle::CallbackHandle;
use crate::Dispatch::channel::InvocationChannel;
use crate::Dispatch::gate::EventQueueGate;

/// Lifecycle of the background runtime.
///
/// Moves forward only: `Uninitialized -> Starting -> Ready`. The one way back
/// is a failed bootstrap, which returns `Starting -> Uninitialized` so a later
/// start can retry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RuntimeState {
    Uninitialized,
    Starting,
    Ready,
}

/// Everything the runtime and the service share.
///
/// Lives behind one `parking_lot::Mutex`; holding that lock is the single
/// exclusion scope for the readiness check, the buffer decision, the drain and
/// the context handle.
#[derive(Debug)]
pub(crate) struct DispatchState {
    pub(crate) runtime: RuntimeState,
    pub(crate) channel: Option<InvocationChannel>,
    pub(crate) user_callback: CallbackHandle,
    pub(crate) gate: EventQueueGate,
    pub(crate) next_sequence: u64,
    pub(crate) contexts_built: u64,
}

impl DispatchState {
    pub(crate) fn new() -> Self {
        Self {
            runtime: RuntimeState::Uninitialized,
            channel: None,
            user_callback: CallbackHandle::UNSET,
            gate: EventQueueGate::new(),
            next_sequence: 0,
            contexts_built: 0,
        }
    }

    pub(crate) fn next_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }
}
