use crate::Dispatch::event::Event;
use crate::Dispatch::jobs::JobScheduler;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Broadcast action carrying a background push message.
pub const BACKGROUND_REMOTE_MESSAGE_ACTION: &str = "push.dispatch.receiver.BACKGROUND_REMOTE_MESSAGE";

/// A raw broadcast as the OS hands it over.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Delivery {
    pub action: Option<String>,
    pub extras: Option<Map<String, Value>>,
}

impl Delivery {
    pub fn background_message(extras: Map<String, Value>) -> Self {
        Self {
            action: Some(BACKGROUND_REMOTE_MESSAGE_ACTION.to_string()),
            extras: Some(extras),
        }
    }
}

/// What the receiver did with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Enqueued,
    UnknownAction,
    MissingExtras,
    /// The job queue refused the work (it was shut down).
    Rejected,
}

/// Filters broadcasts and turns background messages into deferred jobs.
pub struct BackgroundMessageReceiver {
    jobs: Arc<JobScheduler>,
}

impl BackgroundMessageReceiver {
    pub fn new(jobs: Arc<JobScheduler>) -> Self {
        Self { jobs }
    }

    pub fn on_receive(&self, delivery: Delivery) -> ReceiveOutcome {
        log::info!(
            "Broadcast received with action: {}",
            delivery.action.as_deref().unwrap_or("<none>")
        );

        if delivery.action.as_deref() != Some(BACKGROUND_REMOTE_MESSAGE_ACTION) {
            log::warn!("Unknown action: {:?}", delivery.action);
            return ReceiveOutcome::UnknownAction;
        }

        let Some(extras) = delivery.extras else {
            log::warn!("No extras found in background message broadcast");
            return ReceiveOutcome::MissingExtras;
        };

        match self.jobs.enqueue_work(Event::new(extras)) {
            Ok(()) => ReceiveOutcome::Enqueued,
            Err(e) => {
                log::error!("Could not enqueue background message: {}", e);
                ReceiveOutcome::Rejected
            }
        }
    }
}
