//! Canopy - nested test contexts, discovered incrementally and run concurrently
//!
//! Tests are declared inside builder closures that may nest contexts
//! arbitrarily. Canopy finds the whole tree by running the builders
//! repeatedly, runs every test exactly once, and cleans up resources in
//! reverse acquisition order.
//!
//! # Quick Start
//!
//! ```ignore
//! use canopy::{describe, Suite};
//!
//! let root = describe("a stack", |dsl| {
//!     let stack = dsl.auto_close(Arc::new(Mutex::new(Vec::new())), |_| Ok(()));
//!     dsl.test("starts empty", move |_| {
//!         anyhow::ensure!(stack.lock().is_empty());
//!         Ok(())
//!     })?;
//!     dsl.context("after a push", |dsl| {
//!         dsl.it("is not empty", |_| Ok(()))
//!     })
//! });
//!
//! let result = Suite::from_roots(vec![root])?.run()?;
//! assert!(result.all_ok(), "{}", result.summary());
//! ```
//!
//! # Architecture
//!
//! Identity and result types live in `canopy-core`, the worker pool and
//! deferred results in `canopy-concurrency`, and discovery, replay and
//! scheduling in `canopy-engine`. This crate re-exports the engine API.

pub use canopy_engine::*;
