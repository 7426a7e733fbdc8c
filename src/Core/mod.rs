pub mod handle;
pub mod interrupt;
pub mod looper;
pub mod signal;
pub mod store;

pub use handle::CallbackHandle;
pub use interrupt::ThreadInterrupt;
pub use looper::Looper;
pub use signal::{completion, CallbackOutcome, CompletionSignal, CompletionWaiter, WaitOutcome};
pub use store::{FileHandleStore, HandleStore, MemoryHandleStore};
