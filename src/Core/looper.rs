// Single-consumer serial worker. Every task posted here runs on one named
// thread, in posting order.

use crate::error::{DispatchError, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    tasks: VecDeque<Task>,
    closed: bool,
}

struct Inner {
    name: String,
    queue: Mutex<Queue>,
    available: Condvar,
}

/// A thread draining a FIFO of tasks.
///
/// A panicking task is logged and discarded; the thread keeps serving. Dropping
/// the looper (or calling [`Looper::shutdown`]) lets already-posted tasks
/// finish, then joins the thread.
pub struct Looper {
    inner: Arc<Inner>,
    thread_id: ThreadId,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Looper {
    /// Spawns the worker thread.
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let inner = Arc::new(Inner {
            name: name.clone(),
            queue: Mutex::new(Queue {
                tasks: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        });

        let worker = Arc::clone(&inner);
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker.run())?;

        log::debug!("Looper '{}' started", name);

        Ok(Self {
            inner,
            thread_id: join.thread().id(),
            join: Mutex::new(Some(join)),
        })
    }

    /// Queues `task` behind everything posted before it.
    pub fn post<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.inner.queue.lock();
        if queue.closed {
            return Err(DispatchError::WorkerClosed(self.inner.name.clone()));
        }
        queue.tasks.push_back(Box::new(task));
        self.inner.available.notify_one();
        Ok(())
    }

    /// True when called from the worker thread itself.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of tasks waiting to run.
    pub fn backlog(&self) -> usize {
        self.inner.queue.lock().tasks.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.queue.lock().closed
    }

    /// Stops accepting tasks, runs what is queued, and joins the thread.
    ///
    /// From the worker thread itself this only closes the queue.
    pub fn shutdown(&self) {
        {
            let mut queue = self.inner.queue.lock();
            queue.closed = true;
            self.inner.available.notify_all();
        }

        if self.is_current() {
            return;
        }
        if let Some(join) = self.join.lock().take() {
            if join.join().is_err() {
                log::error!("Looper '{}' thread panicked", self.inner.name);
            }
        }
    }
}

impl Inner {
    fn run(&self) {
        loop {
            let task = {
                let mut queue = self.queue.lock();
                loop {
                    if let Some(task) = queue.tasks.pop_front() {
                        break task;
                    }
                    if queue.closed {
                        log::debug!("Looper '{}' stopped", self.name);
                        return;
                    }
                    self.available.wait(&mut queue);
                }
            };

            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                log::error!("Task on looper '{}' panicked; continuing", self.name);
            }
        }
    }
}

impl Drop for Looper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
