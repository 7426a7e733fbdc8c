use push_dispatch::Core::interrupt;
use push_dispatch::Core::{completion, CallbackOutcome, ThreadInterrupt, WaitOutcome};
use serde_json::json;
use serial_test::serial;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn resolve_from_another_thread_wakes_the_waiter() {
    let (signal, waiter) = completion();
    let resolver = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        signal.resolve(CallbackOutcome::Success(json!(1)));
    });

    assert_eq!(
        waiter.wait(None),
        WaitOutcome::Completed(CallbackOutcome::Success(json!(1)))
    );
    resolver.join().unwrap();
}

#[test]
fn resolved_before_wait_returns_immediately() {
    let (signal, waiter) = completion();
    signal.resolve(CallbackOutcome::NotImplemented);
    assert!(waiter.is_settled());
    assert_eq!(
        waiter.wait(Some(Duration::from_millis(1))),
        WaitOutcome::Completed(CallbackOutcome::NotImplemented)
    );
}

#[test]
fn dropped_signal_abandons_the_wait() {
    let (signal, waiter) = completion();
    thread::spawn(move || drop(signal)).join().unwrap();
    assert_eq!(waiter.wait(None), WaitOutcome::Abandoned);
}

#[test]
#[serial]
fn timeout_elapses_without_an_answer() {
    let (_signal, waiter) = completion();
    let start = Instant::now();
    assert_eq!(waiter.wait(Some(Duration::from_millis(50))), WaitOutcome::TimedOut);
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[test]
fn pending_interrupt_returns_at_once_and_is_consumed() {
    let (_signal, waiter) = completion();
    ThreadInterrupt::current().interrupt();

    assert_eq!(waiter.wait(None), WaitOutcome::Interrupted);
    assert!(!interrupt::is_interrupted());
}

#[test]
#[serial]
fn interrupt_wakes_a_parked_waiter() {
    let (tx, rx) = mpsc::channel();
    let (_signal, waiter) = completion();

    let blocked = thread::spawn(move || {
        tx.send(ThreadInterrupt::current()).unwrap();
        waiter.wait(None)
    });

    let handle = rx.recv().unwrap();
    thread::sleep(Duration::from_millis(30));
    handle.interrupt();

    assert_eq!(blocked.join().unwrap(), WaitOutcome::Interrupted);
}
