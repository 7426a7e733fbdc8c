use super::DispatchService;
use crate::error::Result;
use crate::Core::looper::Looper;
use crate::Core::store::{FileHandleStore, HandleStore, MemoryHandleStore};
use crate::Dispatch::engine::CallbackEngine;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_WORKER_NAME: &str = "push-dispatch-worker";

/// Serializable settings for a dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// JSON file for the handle store; in-memory when absent.
    pub store_path: Option<PathBuf>,
    /// Upper bound for a blocked `handle` call; unbounded when absent.
    pub wait_timeout_ms: Option<u64>,
    pub worker_name: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            wait_timeout_ms: None,
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

pub struct DispatchBuilder {
    store: Option<Arc<dyn HandleStore>>,
    store_path: Option<PathBuf>,
    wait_timeout: Option<Duration>,
    worker_name: String,
}

impl Default for DispatchBuilder {
    fn default() -> Self {
        Self {
            store: None,
            store_path: None,
            wait_timeout: None, // wait for the callback however long it takes
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

impl DispatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: DispatchConfig) -> Self {
        Self {
            store: None,
            store_path: config.store_path,
            wait_timeout: config.wait_timeout_ms.map(Duration::from_millis),
            worker_name: config.worker_name,
        }
    }

    /// Uses an existing store. Takes precedence over `with_store_path`.
    pub fn with_store(mut self, store: Arc<dyn HandleStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    /// Opens the store, spawns the worker thread and wires the service.
    /// The runtime itself is not started.
    pub fn build(self, engine: Arc<dyn CallbackEngine>) -> Result<DispatchService> {
        let store: Arc<dyn HandleStore> = match (self.store, self.store_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileHandleStore::open(path)?),
            (None, None) => Arc::new(MemoryHandleStore::new()),
        };
        let looper = Looper::spawn(self.worker_name)?;

        Ok(DispatchService::new(engine, store, looper, self.wait_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_fills_defaults() {
        let config: DispatchConfig = serde_json::from_str(r#"{"wait_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.store_path, None);
        assert_eq!(config.worker_name, DEFAULT_WORKER_NAME);

        let builder = DispatchBuilder::from_config(config);
        assert_eq!(builder.wait_timeout, Some(Duration::from_millis(250)));
        assert!(builder.store.is_none());
    }
}
