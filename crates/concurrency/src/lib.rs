//! Concurrency layer for canopy
//!
//! This crate provides the execution substrate for scheduled tests:
//! - WorkerPool: Fixed set of named worker threads with a FIFO job queue
//! - Deferred: One-shot awaitable result with eager or lazy start
//! - StartPolicy: Eager (submit on schedule) or Lazy (run when awaited)
//!
//! Nothing here knows about tests; the engine wraps test units in
//! `Deferred<TestOutcome>` and hands them to a shared `WorkerPool`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod deferred;
pub mod pool;

pub use deferred::{Deferred, DeferredError, StartPolicy};
pub use pool::{PoolShutdown, PoolStats, WorkerPool};
