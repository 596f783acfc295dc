//! Core types for canopy
//!
//! This crate defines the identity and result primitives shared by every layer:
//! - SourceLocation: Declaration site captured once via `#[track_caller]`
//! - Context: Named node of the discovered tree (parent chain identity)
//! - ContextPath: Dedup key for declarations directly under a context
//! - TestDescription: Identity of one test inside its container
//! - TestResult / TestOutcome: Terminal result of a test
//! - Failure: Captured cause of a failed test, with teardown notes
//! - Error / BuildError: Structural errors and the builder result channel

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod failure;
pub mod location;
pub mod outcome;

pub use context::{Context, ContextPath};
pub use error::{BuildError, BuildResult, Error, Result};
pub use failure::{panic_message, Failure, FailureOrigin, TeardownError};
pub use location::SourceLocation;
pub use outcome::{TestDescription, TestOutcome, TestResult};
