//! One-shot deferred results
//!
//! A `Deferred<T>` owns a job that produces a `T` exactly once. The job can be
//! handed to a [`WorkerPool`] (eager start) or left suspended until someone
//! waits for it (lazy start). Whoever gets to a suspended job first runs it:
//! a waiter that arrives before any worker picked the job up runs it inline,
//! so waiting from inside the pool never deadlocks.
//!
//! State machine: `Suspended -> Running -> Done`, or `Suspended -> Cancelled`.
//! A job that unwinds leaves the cell `Abandoned` so waiters do not hang.

use crate::pool::{PoolShutdown, WorkerPool};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// When a scheduled unit begins running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPolicy {
    /// Start as soon as it is scheduled
    #[default]
    Eager,
    /// Stay suspended until the result is awaited or explicitly started
    Lazy,
}

/// Why a deferred value is not available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeferredError {
    /// Cancelled before the job started
    #[error("cancelled before start")]
    Cancelled,
    /// The job unwound without producing a value
    #[error("job terminated without producing a value")]
    Abandoned,
}

type Job<T> = Box<dyn FnOnce() -> T + Send>;

enum State<T> {
    Suspended(Job<T>),
    Running,
    Done(T),
    Cancelled,
    Abandoned,
}

struct Cell<T> {
    state: Mutex<State<T>>,
    done: Condvar,
}

/// Awaitable, cloneable handle to a value produced exactly once
pub struct Deferred<T> {
    cell: Arc<Cell<T>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.cell.state.lock() {
            State::Suspended(_) => "suspended",
            State::Running => "running",
            State::Done(_) => "done",
            State::Cancelled => "cancelled",
            State::Abandoned => "abandoned",
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}

/// Marks the cell abandoned if the job unwinds
struct RunGuard<'a, T> {
    cell: &'a Cell<T>,
    finished: bool,
}

impl<'a, T> Drop for RunGuard<'a, T> {
    fn drop(&mut self) {
        if !self.finished {
            *self.cell.state.lock() = State::Abandoned;
            self.cell.done.notify_all();
        }
    }
}

impl<T: Send + 'static> Deferred<T> {
    /// Create a suspended deferred around `job`
    pub fn new(job: impl FnOnce() -> T + Send + 'static) -> Self {
        Self {
            cell: Arc::new(Cell {
                state: Mutex::new(State::Suspended(Box::new(job))),
                done: Condvar::new(),
            }),
        }
    }

    /// Create an already completed deferred
    pub fn completed(value: T) -> Self {
        Self {
            cell: Arc::new(Cell {
                state: Mutex::new(State::Done(value)),
                done: Condvar::new(),
            }),
        }
    }

    /// Hand the job to `pool`.
    ///
    /// Harmless if the job already started or was cancelled.
    pub fn start_on(&self, pool: &WorkerPool) -> Result<(), PoolShutdown> {
        if !self.is_suspended() {
            return Ok(());
        }
        let this = self.clone();
        pool.submit(move || {
            this.run();
        })
    }

    /// Run the job on the current thread if it is still suspended.
    ///
    /// Returns true if this call ran the job.
    pub fn run(&self) -> bool {
        let job = {
            let mut state = self.cell.state.lock();
            match std::mem::replace(&mut *state, State::Running) {
                State::Suspended(job) => job,
                other => {
                    *state = other;
                    return false;
                }
            }
        };

        let mut guard = RunGuard {
            cell: &self.cell,
            finished: false,
        };
        let value = job();
        *self.cell.state.lock() = State::Done(value);
        guard.finished = true;
        self.cell.done.notify_all();
        true
    }

    /// Cancel the job if it has not started.
    ///
    /// The job is dropped without running. Returns true if it was cancelled.
    pub fn cancel(&self) -> bool {
        let job = {
            let mut state = self.cell.state.lock();
            match std::mem::replace(&mut *state, State::Cancelled) {
                State::Suspended(job) => job,
                other => {
                    *state = other;
                    return false;
                }
            }
        };
        self.cell.done.notify_all();
        // Dropped outside the lock; captured values may run cleanup on drop
        drop(job);
        true
    }

    /// True while nobody has started or cancelled the job
    pub fn is_suspended(&self) -> bool {
        matches!(&*self.cell.state.lock(), State::Suspended(_))
    }

    /// True once the job reached a terminal state
    pub fn is_done(&self) -> bool {
        matches!(
            &*self.cell.state.lock(),
            State::Done(_) | State::Cancelled | State::Abandoned
        )
    }
}

impl<T: Clone + Send + 'static> Deferred<T> {
    /// Wait for the value, running a suspended job inline first.
    pub fn wait(&self) -> Result<T, DeferredError> {
        self.run();
        let mut state = self.cell.state.lock();
        loop {
            match &*state {
                State::Done(value) => return Ok(value.clone()),
                State::Cancelled => return Err(DeferredError::Cancelled),
                State::Abandoned => return Err(DeferredError::Abandoned),
                State::Running | State::Suspended(_) => {}
            }
            self.cell.done.wait(&mut state);
        }
    }

    /// The value if it is already available; never runs or blocks
    pub fn try_get(&self) -> Option<Result<T, DeferredError>> {
        match &*self.cell.state.lock() {
            State::Done(value) => Some(Ok(value.clone())),
            State::Cancelled => Some(Err(DeferredError::Cancelled)),
            State::Abandoned => Some(Err(DeferredError::Abandoned)),
            State::Running | State::Suspended(_) => None,
        }
    }
}
