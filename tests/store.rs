use push_dispatch::Core::store::{DISPATCHER_HANDLE_KEY, USER_CALLBACK_KEY};
use push_dispatch::Core::{CallbackHandle, FileHandleStore, HandleStore, MemoryHandleStore};
use push_dispatch::DispatchError;
use std::fs;
use tempfile::tempdir;

#[test]
fn missing_keys_read_as_unset() {
    let store = MemoryHandleStore::new();
    assert_eq!(store.dispatcher_handle(), CallbackHandle::UNSET);
    assert_eq!(store.user_callback(), CallbackHandle::UNSET);
    assert_eq!(store.load("anything").unwrap(), None);
}

#[test]
fn file_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("handles.json");

    {
        let store = FileHandleStore::open(&path).unwrap();
        assert_eq!(store.dispatcher_handle(), CallbackHandle::UNSET);
        store.save(DISPATCHER_HANDLE_KEY, 11).unwrap();
        store.save(USER_CALLBACK_KEY, 22).unwrap();
        store.save(USER_CALLBACK_KEY, 33).unwrap();
    }

    let reopened = FileHandleStore::open(&path).unwrap();
    assert_eq!(reopened.dispatcher_handle(), CallbackHandle::new(11));
    assert_eq!(reopened.user_callback(), CallbackHandle::new(33));
    assert_eq!(reopened.path(), path.as_path());
}

#[test]
fn file_store_writes_plain_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("handles.json");

    let store = FileHandleStore::open(&path).unwrap();
    store.save(DISPATCHER_HANDLE_KEY, 5).unwrap();

    let written: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(written[DISPATCHER_HANDLE_KEY], 5);

    // No temp files left next to it.
    let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn empty_file_opens_as_empty_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("handles.json");
    fs::write(&path, b"").unwrap();

    let store = FileHandleStore::open(&path).unwrap();
    assert_eq!(store.user_callback(), CallbackHandle::UNSET);
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("handles.json");
    fs::write(&path, b"{not json").unwrap();

    match FileHandleStore::open(&path) {
        Err(DispatchError::Json(_)) => {}
        other => panic!("expected a JSON error, got {:?}", other.map(|_| ())),
    }
}
