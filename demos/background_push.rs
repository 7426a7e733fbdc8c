// In demos/background_push.rs
use push_dispatch::Dispatch::{
    BackgroundMessageReceiver, CallbackEngine, Delivery, DispatchBuilder, JobScheduler,
    LocalEngine, ReceiveOutcome,
};
use serde_json::{json, Map};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <num_messages> [store_path]", args[0]);
        std::process::exit(1);
    }
    let num_messages: usize = args[1].parse().expect("Invalid number of messages");

    let engine = Arc::new(LocalEngine::new());
    let dispatcher = engine.register_entry("background_dispatcher", |scope| {
        println!("Dispatcher: entry code '{}' running", scope.entry().name);
        scope.initialize();
    });
    let user = engine.register_callback("on_background_message", |payload| {
        println!("User callback: {}", payload);
        std::thread::sleep(Duration::from_millis(50));
        Ok(json!({ "handled": true }))
    });

    let mut builder = DispatchBuilder::new().with_wait_timeout(Duration::from_secs(10));
    if let Some(path) = args.get(2) {
        builder = builder.with_store_path(path);
    }
    let service = builder.build(Arc::clone(&engine) as Arc<dyn CallbackEngine>)?;
    service.set_dispatcher_handle(dispatcher)?;
    service.set_user_callback(user)?;

    let jobs = Arc::new(JobScheduler::new(service.clone())?);
    let receiver = BackgroundMessageReceiver::new(Arc::clone(&jobs));

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_for_handler = Arc::clone(&keep_running);

    // Handle Ctrl+C to stop delivering
    ctrlc::set_handler(move || {
        keep_running_for_handler.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    println!("Delivering {} background messages...", num_messages);
    let start = std::time::Instant::now();
    let mut enqueued = 0;

    for i in 0..num_messages {
        if !keep_running.load(Ordering::SeqCst) {
            println!("Interrupted after {} messages", enqueued);
            break;
        }

        let mut extras = Map::new();
        extras.insert("message".to_string(), json!({ "seq": i, "body": format!("hello #{}", i) }));
        match receiver.on_receive(Delivery::background_message(extras)) {
            ReceiveOutcome::Enqueued => enqueued += 1,
            other => eprintln!("Message {} not enqueued: {:?}", i, other),
        }
    }

    // Drains queued jobs, then stops the dispatch worker.
    jobs.shutdown();
    service.shutdown();

    println!(
        "Done: {} messages handled in {:.2?} (runtime ready: {})",
        enqueued,
        start.elapsed(),
        service.is_ready()
    );
    Ok(())
}
