use crate::Core::handle::CallbackHandle;

/// Errors raised by the administrative side of the dispatcher.
///
/// The delivery path (`handle`, `execute`, receivers, the C ABI) never returns
/// these; it logs and absorbs them.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode store contents: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to persist handle store: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("No {0} handle has been registered")]
    HandleUnset(&'static str),

    #[error("Callback handle {0} does not resolve to any entry code")]
    CallbackNotFound(CallbackHandle),

    #[error("Callback engine failure: {0}")]
    Engine(String),

    #[error("Worker '{0}' is shut down")]
    WorkerClosed(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
