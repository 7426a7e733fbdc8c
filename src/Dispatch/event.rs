use crate::Core::handle::CallbackHandle;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_json::{Map, Value};

/// Extras key holding the decoded vendor message.
pub const MESSAGE_KEY: &str = "message";

/// One push delivery, as handed over by the OS delivery path.
///
/// The extras are opaque to the dispatcher apart from the `message` entry,
/// which becomes the payload passed to the user callback. Events carry no
/// identity beyond their arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    extras: Map<String, Value>,
    sequence: u64,
}

impl Event {
    pub fn new(extras: Map<String, Value>) -> Self {
        Self { extras, sequence: 0 }
    }

    /// Wraps a decoded message under the `message` key.
    pub fn from_message(message: Value) -> Self {
        let mut extras = Map::new();
        extras.insert(MESSAGE_KEY.to_string(), message);
        Self::new(extras)
    }

    pub fn extras(&self) -> &Map<String, Value> {
        &self.extras
    }

    /// The payload handed to the user callback.
    pub fn payload(&self) -> Option<&Value> {
        self.extras.get(MESSAGE_KEY)
    }

    pub fn into_payload(mut self) -> Option<Value> {
        self.extras.remove(MESSAGE_KEY)
    }

    /// Arrival order assigned by the service; 0 when never handled.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }
}

/// What the runtime sends to the dispatcher entry code for one event.
///
/// On the wire this is the two-element array `[user_callback, payload]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub user_callback: CallbackHandle,
    pub payload: Value,
}

impl InvocationRequest {
    pub fn new(user_callback: CallbackHandle, payload: Value) -> Self {
        Self {
            user_callback,
            payload,
        }
    }

    pub fn to_arguments(&self) -> Value {
        Value::Array(vec![
            Value::from(self.user_callback.raw()),
            self.payload.clone(),
        ])
    }

    /// Parses the wire form back. Returns `None` for anything but a
    /// two-element array whose first element is an integer.
    pub fn from_arguments(arguments: &Value) -> Option<Self> {
        match arguments.as_array()?.as_slice() {
            [handle, payload] => Some(Self {
                user_callback: CallbackHandle::new(handle.as_i64()?),
                payload: payload.clone(),
            }),
            _ => None,
        }
    }
}

impl Serialize for InvocationRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.user_callback)?;
        seq.serialize_element(&self.payload)?;
        seq.end()
    }
}
