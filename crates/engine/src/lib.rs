//! Test execution engine for canopy
//!
//! This crate turns root contexts into running tests:
//! - Discovery: repeated passes over a root builder until every context and
//!   test is known (`DiscoveryEngine`, `TreeVisitor`)
//! - Isolated replay: tests after the first one of a context re-run only the
//!   builders on their path (`IsolatedTestRunner`)
//! - Resources: LIFO cleanup registered next to acquisition (`ResourceRegistry`)
//! - Scheduling: eager or lazy units on a shared worker pool (`TestScheduler`)
//! - Suites: several roots, config file and result summary (`Suite`)
//!
//! The engine is the only component that runs user code; everything it
//! reports goes through `ExecutionListener`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod discovery;
pub mod dsl;
pub mod isolated;
pub mod listener;
pub mod resources;
pub mod root;
pub mod scheduler;
pub mod scope;
pub mod suite;
mod unit;
mod visitor;

pub use config::{SuiteConfig, CONFIG_FILE_NAME};
pub use discovery::{DiscoveryEngine, DiscoveryResult};
pub use dsl::{AfterSuiteCallback, ContextDsl, TestBody};
pub use isolated::IsolatedTestRunner;
pub use listener::{ExecutionListener, NullListener, TracingListener};
pub use resources::ResourceRegistry;
pub use root::{describe, BuilderFn, ContextProvider, RootContext};
pub use scheduler::{TestHandle, TestScheduler};
pub use scope::TestScope;
pub use suite::{Suite, SuiteResult};

pub use canopy_concurrency::{PoolStats, StartPolicy, WorkerPool};
pub use canopy_core::{
    BuildError, BuildResult, Context, ContextPath, Error, Failure, FailureOrigin, Result,
    SourceLocation, TeardownError, TestDescription, TestOutcome, TestResult,
};
