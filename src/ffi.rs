use crate::Core::handle::CallbackHandle;
use crate::Dispatch::{DispatchService, Event};
use serde_json::Value;

// Error codes
const PUSH_DISPATCH_SUCCESS: i32 = 0;
const PUSH_DISPATCH_ERROR_NULL_POINTER: i32 = -1;
const PUSH_DISPATCH_ERROR_INVALID_ARG: i32 = -2;
const PUSH_DISPATCH_ERROR_STORE: i32 = -3;

/// Handle to a dispatch service (opaque pointer)
pub struct ServiceHandle {
    inner: DispatchService,
}

/// Hands a service built on the Rust side to native delivery code.
///
/// The returned pointer must be released with `push_dispatch_free`.
pub fn export_service(service: DispatchService) -> *mut ServiceHandle {
    Box::into_raw(Box::new(ServiceHandle { inner: service }))
}

// -----------------------------------------------------------------------------
// Delivery
// -----------------------------------------------------------------------------

/// Deliver one event.
///
/// # Arguments
/// * `handle` - Pointer to `ServiceHandle`.
/// * `extras` - UTF-8 JSON object holding the event extras.
/// * `len` - Length of `extras` in bytes.
///
/// # Returns
/// * 0 once the event was buffered or its callback finished.
/// * Negative error code if the arguments are unusable.
#[no_mangle]
pub extern "C" fn push_dispatch_handle(
    handle: *mut ServiceHandle,
    extras: *const u8,
    len: usize,
) -> i32 {
    if handle.is_null() || extras.is_null() {
        return PUSH_DISPATCH_ERROR_NULL_POINTER;
    }

    let service = unsafe { &(*handle).inner };
    let bytes = unsafe { std::slice::from_raw_parts(extras, len) };

    let extras = match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            log::warn!("FFI: event extras are not a JSON object");
            return PUSH_DISPATCH_ERROR_INVALID_ARG;
        }
        Err(e) => {
            log::warn!("FFI: failed to parse event extras: {}", e);
            return PUSH_DISPATCH_ERROR_INVALID_ARG;
        }
    };

    service.handle(Event::new(extras));
    PUSH_DISPATCH_SUCCESS
}

// -----------------------------------------------------------------------------
// Administration
// -----------------------------------------------------------------------------

/// Persist the user callback handle.
#[no_mangle]
pub extern "C" fn push_dispatch_set_user_callback(handle: *mut ServiceHandle, callback: i64) -> i32 {
    if handle.is_null() {
        return PUSH_DISPATCH_ERROR_NULL_POINTER;
    }
    let service = unsafe { &(*handle).inner };
    match service.set_user_callback(CallbackHandle::new(callback)) {
        Ok(()) => PUSH_DISPATCH_SUCCESS,
        Err(_) => PUSH_DISPATCH_ERROR_STORE,
    }
}

/// Persist the dispatcher handle.
#[no_mangle]
pub extern "C" fn push_dispatch_set_dispatcher(handle: *mut ServiceHandle, dispatcher: i64) -> i32 {
    if handle.is_null() {
        return PUSH_DISPATCH_ERROR_NULL_POINTER;
    }
    let service = unsafe { &(*handle).inner };
    match service.set_dispatcher_handle(CallbackHandle::new(dispatcher)) {
        Ok(()) => PUSH_DISPATCH_SUCCESS,
        Err(_) => PUSH_DISPATCH_ERROR_STORE,
    }
}

/// Start the runtime. Pass -1 to use the persisted dispatcher handle.
#[no_mangle]
pub extern "C" fn push_dispatch_ensure_started(handle: *mut ServiceHandle, dispatcher: i64) -> i32 {
    if handle.is_null() {
        return PUSH_DISPATCH_ERROR_NULL_POINTER;
    }
    let service = unsafe { &(*handle).inner };
    let dispatcher = CallbackHandle::new(dispatcher);
    service.ensure_started(dispatcher.is_set().then_some(dispatcher));
    PUSH_DISPATCH_SUCCESS
}

/// Whether the runtime is ready. False for a null handle.
#[no_mangle]
pub extern "C" fn push_dispatch_is_ready(handle: *mut ServiceHandle) -> bool {
    if handle.is_null() {
        return false;
    }
    unsafe { (*handle).inner.is_ready() }
}

/// Free a service handle.
#[no_mangle]
pub extern "C" fn push_dispatch_free(handle: *mut ServiceHandle) {
    if !handle.is_null() {
        unsafe {
            let _ = Box::from_raw(handle); // Dropped automatically
        }
    }
}
