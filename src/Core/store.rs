// Durable storage for the two long-lived callback handles.

use crate::error::Result;
use crate::Core::handle::CallbackHandle;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Key under which the dispatcher entry-code handle is stored.
pub const DISPATCHER_HANDLE_KEY: &str = "push_background_message_handler";

/// Key under which the user callback handle is stored.
pub const USER_CALLBACK_KEY: &str = "push_background_message_callback";

/// Key/value persistence for callback handles.
///
/// Implementations must survive process restarts (except the in-memory one,
/// which exists for tests and embedders that persist elsewhere).
pub trait HandleStore: Send + Sync {
    /// Reads the raw value stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<i64>>;

    /// Writes `value` under `key`, overwriting any previous value.
    fn save(&self, key: &str, value: i64) -> Result<()>;

    /// Reads a handle, falling back to `CallbackHandle::UNSET` when the key is
    /// missing or the store cannot be read.
    fn handle_or_unset(&self, key: &str) -> CallbackHandle {
        match self.load(key) {
            Ok(Some(raw)) => CallbackHandle::new(raw),
            Ok(None) => CallbackHandle::UNSET,
            Err(e) => {
                log::error!("Failed to read '{}' from handle store: {}", key, e);
                CallbackHandle::UNSET
            }
        }
    }

    fn dispatcher_handle(&self) -> CallbackHandle {
        self.handle_or_unset(DISPATCHER_HANDLE_KEY)
    }

    fn user_callback(&self) -> CallbackHandle {
        self.handle_or_unset(USER_CALLBACK_KEY)
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryHandleStore {
    values: Mutex<BTreeMap<String, i64>>,
}

impl MemoryHandleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandleStore for MemoryHandleStore {
    fn load(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.values.lock().get(key).copied())
    }

    fn save(&self, key: &str, value: i64) -> Result<()> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// Every `save` rewrites the whole file through a temp file in the same
/// directory followed by a rename, so a crash mid-write leaves the previous
/// contents intact.
#[derive(Debug)]
pub struct FileHandleStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, i64>>,
}

impl FileHandleStore {
    /// Opens the store at `path`, loading existing contents if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        log::debug!("Opened handle store {:?} ({} entries)", path, values.len());

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_out(&self, values: &BTreeMap<String, i64>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, values)?;
        tmp.flush()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

impl HandleStore for FileHandleStore {
    fn load(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.values.lock().get(key).copied())
    }

    fn save(&self, key: &str, value: i64) -> Result<()> {
        // Held across the write so concurrent saves land in order.
        let mut values = self.values.lock();
        let previous = values.insert(key.to_string(), value);
        if let Err(e) = self.write_out(&values) {
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}
