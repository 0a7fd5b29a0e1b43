use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed pool of worker threads fed from one queue.
///
/// Everything the dispatcher runs — the accept loop, the janitor, and each
/// per-request job — is posted here, so the number of threads is capped at
/// construction time no matter how fast datagrams arrive. The queue itself is
/// unbounded; a burst of requests waits its turn instead of growing the
/// thread count.
pub struct WorkerPool {
    sender: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    #[must_use]
    pub fn new(size: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(size);
        for _ in 0..size {
            let receiver = Arc::clone(&receiver);
            workers.push(std::thread::spawn(move || run_worker(&receiver)));
        }
        Self { sender, workers }
    }

    /// Queues `job` to run on the next free worker thread.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        // Send fails only after the queue has been closed by `join`.
        let _ = self.sender.send(Box::new(job));
    }

    /// Returns a posting handle that outlives borrows of the pool, so a job
    /// running inside the pool can queue further jobs.
    #[must_use]
    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            sender: self.sender.clone(),
        }
    }

    /// Closes the queue and joins every worker. Returns once all queued and
    /// running jobs have finished and every [`PoolHandle`] is dropped.
    pub fn join(self) {
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

/// A cloneable posting end of a [`WorkerPool`] queue.
#[derive(Clone)]
pub struct PoolHandle {
    sender: Sender<Job>,
}

impl PoolHandle {
    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        let _ = self.sender.send(Box::new(job));
    }
}

fn run_worker(receiver: &Arc<Mutex<Receiver<Job>>>) {
    loop {
        // Take the next job with the lock held, run it with the lock
        // released so the other workers keep draining the queue.
        let message = {
            let receiver = receiver.lock().unwrap_or_else(PoisonError::into_inner);
            receiver.recv()
        };
        match message {
            Ok(job) => job(),
            // Every sender is gone and the queue is drained.
            Err(_) => break,
        }
    }
}
