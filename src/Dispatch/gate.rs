use crate::Dispatch::event::Event;
use std::collections::VecDeque;

/// Holding pen for events that arrive before the runtime is ready.
///
/// The gate itself has no lock: it lives inside the dispatcher's shared state
/// and every mutation needs `&mut`, i.e. the state lock. That is the same lock
/// the readiness check in `DispatchService::handle` runs under, so an event is
/// either queued before the drain or sees the runtime ready, never neither.
#[derive(Debug, Default)]
pub struct EventQueueGate {
    pending: VecDeque<Event>,
    drained: bool,
}

impl EventQueueGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers `event` behind everything offered before it.
    ///
    /// The service never offers once the runtime is ready, so the late-offer
    /// warning only concerns callers driving a gate directly.
    pub fn offer(&mut self, event: Event) {
        if self.drained {
            log::warn!(
                "Event #{} buffered after the gate was drained; it waits for the next drain",
                event.sequence()
            );
        }
        self.pending.push_back(event);
    }

    /// Hands every buffered event to `execute` in arrival order and leaves the
    /// queue empty. Returns how many were released.
    pub fn drain_and_execute<F>(&mut self, mut execute: F) -> usize
    where
        F: FnMut(Event),
    {
        self.drained = true;
        let count = self.pending.len();
        if count == 0 {
            return 0;
        }

        log::info!("Releasing {} buffered event(s)", count);
        for event in self.pending.drain(..) {
            log::debug!("Executing callback for buffered event #{}", event.sequence());
            execute(event);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether the one-time drain has happened.
    pub fn drained(&self) -> bool {
        self.drained
    }
}
