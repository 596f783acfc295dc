//! Shared worker pool for test units.
//!
//! A fixed set of named worker threads pulling boxed jobs from a FIFO queue.
//! Jobs are isolated from each other: a panicking job is logged and the worker
//! keeps going.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, error};

/// Error returned when submitting to a pool that has been shut down.
#[derive(Debug, Error)]
#[error("worker pool has been shut down")]
pub struct PoolShutdown;

/// Pool metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of jobs waiting in the queue.
    pub queue_depth: usize,
    /// Number of jobs currently being executed by workers.
    pub active_jobs: usize,
    /// Total number of jobs completed since pool creation.
    pub jobs_completed: u64,
    /// Number of worker threads.
    pub worker_count: usize,
}

type Job = Box<dyn FnOnce() + Send>;

struct PoolInner {
    queue: Mutex<VecDeque<Job>>,
    work_ready: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    queue_depth: AtomicUsize,
    active_jobs: AtomicUsize,
    jobs_completed: AtomicU64,
}

/// A fixed-size pool of worker threads executing jobs in submission order.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    num_threads: usize,
}

impl WorkerPool {
    /// Create a pool with the given number of worker threads.
    ///
    /// Workers are named `{prefix}-0`, `{prefix}-1`, etc. At least one worker
    /// is always started.
    pub fn new(num_threads: usize, prefix: &str) -> std::io::Result<Self> {
        let num_threads = num_threads.max(1);
        let inner = Arc::new(PoolInner {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            drain_cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            queue_depth: AtomicUsize::new(0),
            active_jobs: AtomicUsize::new(0),
            jobs_completed: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(num_threads);
        for i in 0..num_threads {
            let inner_clone = Arc::clone(&inner);
            let handle = std::thread::Builder::new()
                .name(format!("{}-{}", prefix, i))
                .spawn(move || worker_loop(&inner_clone))?;
            workers.push(handle);
        }
        debug!(workers = num_threads, prefix, "worker pool started");

        Ok(Self {
            inner,
            workers: Mutex::new(workers),
            num_threads,
        })
    }

    /// Create a pool sized to the available parallelism of this machine.
    pub fn with_default_size(prefix: &str) -> std::io::Result<Self> {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(threads, prefix)
    }

    /// Submit a job.
    ///
    /// Returns `Err(PoolShutdown)` if the pool has been shut down.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<(), PoolShutdown> {
        // Reject after shutdown: workers have been joined, the job would never run
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(PoolShutdown);
        }

        {
            let mut queue = self.inner.queue.lock();
            queue.push_back(Box::new(job));
            self.inner.queue_depth.fetch_add(1, Ordering::Release);
        }

        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Block until all queued and in-flight jobs have completed.
    ///
    /// Workers remain running after drain completes.
    pub fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while self.inner.queue_depth.load(Ordering::Acquire) > 0
            || self.inner.active_jobs.load(Ordering::Acquire) > 0
        {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Shut down the pool: signal workers to exit and join all threads.
    ///
    /// Workers finish the remaining queued jobs before exiting.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);

        // Notify under the queue lock so a worker between its shutdown check
        // and its wait() cannot miss the wakeup.
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }

        let mut workers = self.workers.lock();
        let current = std::thread::current().id();
        for handle in workers.drain(..) {
            // A job holding the last reference may drop the pool on a worker
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }
    }

    /// True once `shutdown` has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Return a snapshot of pool metrics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queue_depth: self.inner.queue_depth.load(Ordering::Relaxed),
            active_jobs: self.inner.active_jobs.load(Ordering::Relaxed),
            jobs_completed: self.inner.jobs_completed.load(Ordering::Relaxed),
            worker_count: self.num_threads,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// RAII guard that decrements `active_jobs` and notifies drain waiters on drop,
/// so the bookkeeping stays right even if a job panics.
struct ActiveJobGuard<'a> {
    inner: &'a PoolInner,
}

impl<'a> Drop for ActiveJobGuard<'a> {
    fn drop(&mut self) {
        let prev_active = self.inner.active_jobs.fetch_sub(1, Ordering::Release);
        self.inner.jobs_completed.fetch_add(1, Ordering::Relaxed);

        // Lock before notifying: drain() checks the condition under this lock.
        if prev_active == 1 && self.inner.queue_depth.load(Ordering::Acquire) == 0 {
            let _queue = self.inner.queue.lock();
            self.inner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let job = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(job) = queue.pop_front() {
                    inner.queue_depth.fetch_sub(1, Ordering::Release);
                    inner.active_jobs.fetch_add(1, Ordering::Release);
                    break job;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveJobGuard { inner };

        // Execute outside the lock; a panicking job must not kill the worker.
        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
            error!(
                "worker job panicked: {:?}",
                e.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
            );
        }
    }
}
