//! Multi-pass discovery of one root context
//!
//! The root builder is re-invoked until a pass leaves no unvisited
//! contexts. Each pass schedules at least one new test, finds a context, or
//! is the last one, so discovery terminates for every finite tree.

use crate::dsl::{AfterSuiteCallback, ContextDsl};
use crate::resources::ResourceRegistry;
use crate::root::RootContext;
use crate::scheduler::{TestHandle, TestScheduler};
use crate::visitor::{DiscoveryState, Pass, TreeVisitor};
use canopy_core::{
    panic_message, BuildError, Context, Error, Failure, FailureOrigin, Result, TestDescription,
    TestOutcome, TestResult,
};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Drives discovery passes over one root context
pub struct DiscoveryEngine {
    root: RootContext,
    scheduler: TestScheduler,
}

impl DiscoveryEngine {
    /// Create an engine for `root`
    pub fn new(root: RootContext, scheduler: TestScheduler) -> Self {
        Self { root, scheduler }
    }

    /// Discover every context and test of the root.
    ///
    /// Tests are scheduled while discovery runs. A duplicate name aborts
    /// discovery: handles that have not started are cancelled and the error
    /// is returned.
    pub fn execute(&self) -> Result<DiscoveryResult> {
        let root_context = self.root.context();
        let mut state = DiscoveryState::default();
        let mut passes = 0usize;

        loop {
            passes += 1;
            let registry = Arc::new(ResourceRegistry::new());
            let pass = Pass {
                builder: self.root.builder(),
                scheduler: &self.scheduler,
                registry: Arc::clone(&registry),
            };

            let (built, contexts_left) = {
                let mut visitor = TreeVisitor::new(&mut state, &pass, root_context.clone());
                let built = catch_unwind(AssertUnwindSafe(|| {
                    (pass.builder)(&mut ContextDsl::new(&mut visitor))
                }));
                (built, visitor.contexts_left)
            };
            let direct = state.direct.take();

            let failure = match built {
                Ok(Ok(())) => None,
                Ok(Err(BuildError::Structural(error))) => {
                    let error = state.fatal.take().unwrap_or(error);
                    return Err(self.abort(&state, &registry, error));
                }
                Ok(Err(BuildError::Failed(cause))) => {
                    Some(Failure::new(FailureOrigin::ContextBuild, cause))
                }
                Err(payload) => Some(Failure::from_panic(FailureOrigin::ContextBuild, payload)),
            };
            if let Some(error) = state.fatal.take() {
                return Err(self.abort(&state, &registry, error));
            }

            // Resources nobody claimed are done once the builder returned
            let teardown = match &direct {
                Some(handle) => {
                    self.scheduler.release(handle);
                    Vec::new()
                }
                None => registry.close_all(),
            };

            if let Some(failure) = failure {
                let test = TestDescription::new(
                    root_context.clone(),
                    self.root.name(),
                    self.root.location(),
                );
                let outcome =
                    TestOutcome::new(test, TestResult::Failed(failure.with_teardown(teardown)));
                state.tests.push(self.scheduler.completed(outcome));
                break;
            }
            for error in teardown {
                warn!(root = %root_context, "teardown after discovery pass failed: {}", error);
            }

            state.investigated.insert(root_context.clone());
            if !contexts_left {
                break;
            }
        }

        debug!(
            root = %root_context,
            passes,
            tests = state.tests.len(),
            contexts = state.found_contexts.len() + 1,
            "discovery finished"
        );

        let mut found = state.take_found_contexts();
        found.sort_by_key(|context| context.location());
        let mut contexts = Vec::with_capacity(found.len() + 1);
        contexts.push(root_context);
        contexts.extend(found);

        Ok(DiscoveryResult {
            contexts,
            tests: std::mem::take(&mut state.tests),
            after_suite: std::mem::take(&mut state.after_suite),
        })
    }

    fn abort(&self, state: &DiscoveryState, registry: &ResourceRegistry, error: Error) -> Error {
        let cancelled = state.tests.iter().filter(|handle| handle.cancel()).count();
        for teardown in registry.close_all() {
            warn!(root = %self.root.name(), "teardown after aborted discovery failed: {}", teardown);
        }
        debug!(root = %self.root.name(), cancelled, "discovery aborted: {}", error);
        error
    }
}

impl fmt::Debug for DiscoveryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryEngine")
            .field("root", &self.root)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// Everything discovery learned about one root
pub struct DiscoveryResult {
    /// Root first, then sub-contexts by declaration site
    pub contexts: Vec<Context>,
    /// One handle per test, in discovery order
    pub tests: Vec<TestHandle>,
    /// Callbacks to run once after all tests
    pub after_suite: Vec<AfterSuiteCallback>,
}

impl DiscoveryResult {
    /// The root context
    pub fn root(&self) -> &Context {
        &self.contexts[0]
    }

    /// Descriptions of all tests, in discovery order
    pub fn descriptions(&self) -> Vec<&TestDescription> {
        self.tests.iter().map(TestHandle::test).collect()
    }

    /// The handle of one test
    pub fn handle(&self, test: &TestDescription) -> Option<&TestHandle> {
        self.tests.iter().find(|handle| handle.test() == test)
    }

    /// Tests declared directly in `context`
    pub fn tests_in<'a>(&'a self, context: &'a Context) -> impl Iterator<Item = &'a TestHandle> {
        self.tests
            .iter()
            .filter(move |handle| &handle.test().container == context)
    }

    /// Discovered contexts whose parent is `context`
    pub fn child_contexts<'a>(&'a self, context: &'a Context) -> impl Iterator<Item = &'a Context> {
        self.contexts
            .iter()
            .filter(move |candidate| candidate.parent() == Some(context))
    }

    /// Start every suspended test on the pool
    pub fn start_all(&self) {
        for handle in &self.tests {
            handle.start();
        }
    }

    /// Wait for every test, in discovery order.
    ///
    /// Suspended tests are handed to the pool first so they run concurrently
    /// instead of one after another on this thread.
    pub fn wait_all(&self) -> Vec<TestOutcome> {
        self.start_all();
        self.tests.iter().map(TestHandle::wait).collect()
    }

    /// Cancel every test that has not started; returns how many were cancelled
    pub fn cancel_pending(&self) -> usize {
        self.tests.iter().filter(|handle| handle.cancel()).count()
    }

    /// Run the after-suite callbacks once and collect their failures
    pub fn run_after_suite(&mut self) -> Vec<anyhow::Error> {
        let mut failures = Vec::new();
        for callback in std::mem::take(&mut self.after_suite) {
            let error = match catch_unwind(AssertUnwindSafe(callback)) {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error,
                Err(payload) => anyhow::anyhow!("panicked: {}", panic_message(payload.as_ref())),
            };
            warn!(root = %self.root(), "after-suite callback failed: {:#}", error);
            failures.push(error);
        }
        failures
    }
}

impl fmt::Debug for DiscoveryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryResult")
            .field("contexts", &self.contexts)
            .field("tests", &self.tests.len())
            .field("after_suite", &self.after_suite.len())
            .finish()
    }
}
