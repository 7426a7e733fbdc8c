//! Readiness-gated background dispatch of push deliveries into a
//! user-registered callback.
//!
//! A [`DispatchService`](Dispatch::DispatchService) buffers events until its
//! single background runtime is ready, then bridges each event into the user
//! callback on one serial worker thread, blocking the delivering thread until
//! the callback has answered.

// Module naming follows project convention (Core = primitives, Dispatch = the dispatcher)
#[allow(non_snake_case)]
pub mod Core;
#[allow(non_snake_case)]
pub mod Dispatch;
#[allow(non_snake_case)]
pub mod Debug {
    pub mod StructDebug;
}

pub mod error;
pub mod ffi;

pub use error::{DispatchError, Result};
pub use Core::{CallbackHandle, CallbackOutcome, ThreadInterrupt};
pub use Dispatch::{DispatchBuilder, DispatchService, Event, RuntimeState};
