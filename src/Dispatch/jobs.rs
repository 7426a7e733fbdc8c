// Deferred work queue between the broadcast receiver and the service.
//
// Jobs run one at a time on their own thread, so a delivery that blocks on
// its callback never blocks whoever enqueued it.

use crate::error::Result;
use crate::Core::looper::Looper;
use crate::Dispatch::event::Event;
use crate::Dispatch::service::DispatchService;

pub const DEFAULT_JOB_WORKER_NAME: &str = "push-dispatch-jobs";

pub struct JobScheduler {
    service: DispatchService,
    looper: Looper,
}

impl JobScheduler {
    pub fn new(service: DispatchService) -> Result<Self> {
        Self::with_name(service, DEFAULT_JOB_WORKER_NAME)
    }

    pub fn with_name(service: DispatchService, name: &str) -> Result<Self> {
        Ok(Self {
            service,
            looper: Looper::spawn(name)?,
        })
    }

    /// Queues `event` for `DispatchService::handle` on the job thread.
    ///
    /// Every job first starts the runtime from the persisted dispatcher handle
    /// if it is not ready, so a bootstrap that failed earlier is retried.
    pub fn enqueue_work(&self, event: Event) -> Result<()> {
        let service = self.service.clone();
        self.looper.post(move || {
            if !service.is_ready() {
                log::info!("Background runtime not ready; making sure it is started");
                service.ensure_started(None);
            }
            service.handle(event);
        })?;
        log::debug!("Work enqueued ({} job(s) waiting)", self.looper.backlog());
        Ok(())
    }

    pub fn service(&self) -> &DispatchService {
        &self.service
    }

    /// Jobs not yet started.
    pub fn backlog(&self) -> usize {
        self.looper.backlog()
    }

    /// Finishes queued jobs and joins the job thread.
    pub fn shutdown(&self) {
        self.looper.shutdown();
    }
}
