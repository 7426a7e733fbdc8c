use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifier of a piece of callback code: either the dispatcher entry code
/// registered at startup or the user's per-message handler.
///
/// Stored as a plain `i64` so it survives the durable store and the C ABI
/// unchanged. `-1` is the "unset" sentinel.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackHandle(i64);

impl CallbackHandle {
    /// Sentinel stored when nothing has been registered.
    pub const UNSET: CallbackHandle = CallbackHandle(-1);

    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Derives a stable handle from a callback's qualified name.
    ///
    /// Takes the first 8 bytes of the SHA-256 digest and clears the sign bit,
    /// so the result is never the `UNSET` sentinel.
    pub fn from_name(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(i64::from_be_bytes(bytes) & i64::MAX)
    }

    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn is_set(self) -> bool {
        self != Self::UNSET
    }
}

impl Default for CallbackHandle {
    fn default() -> Self {
        Self::UNSET
    }
}

impl From<i64> for CallbackHandle {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            write!(f, "CallbackHandle({})", self.0)
        } else {
            f.write_str("CallbackHandle(<unset>)")
        }
    }
}

impl fmt::Display for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
