//! One discovery pass over a context tree
//!
//! A [`TreeVisitor`] runs a context's builder once and classifies every
//! declaration against what earlier passes already saw:
//!
//! - the first new test of the pass runs directly, owning the resources the
//!   pass registered
//! - every later new test is replayed in isolation
//! - sub-contexts are entered only while no test ran at this level, the rest
//!   are left for the next pass
//!
//! Cross-pass bookkeeping lives in [`DiscoveryState`].

use crate::dsl::{AfterSuiteCallback, ContextDsl, Declarations, SubBuilder, TestBody};
use crate::isolated::IsolatedTestRunner;
use crate::resources::{RegistryGuard, ResourceRegistry};
use crate::root::BuilderFn;
use crate::scheduler::{TestHandle, TestScheduler};
use crate::scope::TestScope;
use crate::unit::{conclude, run_body};
use canopy_core::{
    BuildError, BuildResult, Context, ContextPath, Error, Failure, FailureOrigin, SourceLocation,
    TestDescription, TestOutcome, TestResult,
};
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// State carried from one pass to the next
#[derive(Default)]
pub(crate) struct DiscoveryState {
    /// Tests, pending tests and finished or failed contexts
    pub(crate) processed: HashSet<ContextPath>,
    /// Contexts whose builder completed at least once
    pub(crate) investigated: HashSet<Context>,
    /// Contexts fully discovered, in discovery order
    pub(crate) found_contexts: Vec<Context>,
    /// One handle per test, in discovery order
    pub(crate) tests: Vec<TestHandle>,
    pub(crate) after_suite: Vec<AfterSuiteCallback>,
    /// Same path, same node, across passes
    interned: HashMap<ContextPath, Context>,
    /// Contexts in the order they were first entered (pre-order)
    entered: Vec<Context>,
    /// Direct test of the current pass, held until the pass ends
    pub(crate) direct: Option<TestHandle>,
    /// First structural error, even if the builder swallowed it
    pub(crate) fatal: Option<Error>,
}

impl DiscoveryState {
    fn intern(&mut self, path: ContextPath, location: SourceLocation) -> Context {
        if let Some(context) = self.interned.get(&path) {
            return context.clone();
        }
        let context = path.container.child(path.name.clone(), location);
        self.entered.push(context.clone());
        self.interned.insert(path, context.clone());
        context
    }

    /// Found contexts, parents before children, siblings in declaration order
    pub(crate) fn take_found_contexts(&mut self) -> Vec<Context> {
        let found: HashSet<Context> = self.found_contexts.drain(..).collect();
        std::mem::take(&mut self.entered)
            .into_iter()
            .filter(|context| found.contains(context))
            .collect()
    }
}

/// Everything one pass shares between its visitors
pub(crate) struct Pass<'p> {
    pub(crate) builder: &'p BuilderFn,
    pub(crate) scheduler: &'p TestScheduler,
    pub(crate) registry: Arc<ResourceRegistry>,
}

/// Visits one context during one pass
pub(crate) struct TreeVisitor<'s, 'p> {
    state: &'s mut DiscoveryState,
    pass: &'s Pass<'p>,
    context: Context,
    /// Test and context names declared here, for duplicate detection
    names: HashSet<String>,
    context_investigated: bool,
    pub(crate) ran_a_test: bool,
    pub(crate) contexts_left: bool,
}

impl<'s, 'p> TreeVisitor<'s, 'p> {
    pub(crate) fn new(state: &'s mut DiscoveryState, pass: &'s Pass<'p>, context: Context) -> Self {
        let context_investigated = state.investigated.contains(&context);
        Self {
            state,
            pass,
            context,
            names: HashSet::new(),
            context_investigated,
            ran_a_test: false,
            contexts_left: false,
        }
    }

    fn claim_name(&mut self, name: &str) -> BuildResult {
        if self.names.insert(name.to_string()) {
            return Ok(());
        }
        if self.state.fatal.is_none() {
            self.state.fatal = Some(Error::duplicate_name(name, &self.context));
        }
        Err(BuildError::Structural(Error::duplicate_name(name, &self.context)))
    }

    fn schedule_direct(&mut self, test: TestDescription, body: TestBody) -> TestHandle {
        let guard = RegistryGuard::new(Arc::clone(&self.pass.registry));
        let listener = Arc::clone(self.pass.scheduler.listener());
        let described = test.clone();
        let handle = self.pass.scheduler.schedule_suspended(test, move || {
            let started = Instant::now();
            let scope = TestScope::new(described, Arc::clone(guard.registry()), listener);
            let outcome = run_body(body, &scope);
            conclude(outcome, guard.close(), started)
        });
        self.state.direct = Some(handle.clone());
        handle
    }

    fn schedule_isolated(&mut self, test: TestDescription) -> TestHandle {
        let runner = IsolatedTestRunner::new(
            Arc::clone(self.pass.builder),
            test.clone(),
            Arc::clone(self.pass.scheduler.listener()),
        );
        self.pass.scheduler.schedule(test, move || runner.execute())
    }
}

impl Declarations for TreeVisitor<'_, '_> {
    fn test(&mut self, name: String, location: SourceLocation, body: TestBody) -> BuildResult {
        self.claim_name(&name)?;
        let path = ContextPath::new(self.context.clone(), name.clone());
        if !self.state.processed.insert(path) {
            return Ok(());
        }

        let test = TestDescription::new(self.context.clone(), name, location);
        let handle = if self.ran_a_test {
            // The replay declares this test again with a fresh body
            drop(body);
            self.schedule_isolated(test)
        } else {
            self.ran_a_test = true;
            self.schedule_direct(test, body)
        };
        self.state.tests.push(handle);
        Ok(())
    }

    fn context(
        &mut self,
        name: String,
        location: SourceLocation,
        builder: SubBuilder<'_>,
    ) -> BuildResult {
        self.claim_name(&name)?;
        let path = ContextPath::new(self.context.clone(), name.clone());
        if self.state.processed.contains(&path) {
            return Ok(());
        }
        if self.ran_a_test {
            self.contexts_left = true;
            return Ok(());
        }

        let context = self.state.intern(path.clone(), location);
        let mark = self.pass.registry.mark();
        let (built, child_ran, child_left) = {
            let mut child = TreeVisitor::new(&mut *self.state, self.pass, context.clone());
            let built = catch_unwind(AssertUnwindSafe(|| builder(&mut ContextDsl::new(&mut child))));
            (built, child.ran_a_test, child.contexts_left)
        };

        let failure = match built {
            Ok(Ok(())) => None,
            Ok(Err(BuildError::Structural(error))) => return Err(BuildError::Structural(error)),
            Ok(Err(BuildError::Failed(cause))) => {
                Some(Failure::new(FailureOrigin::ContextBuild, cause))
            }
            Err(payload) => Some(Failure::from_panic(FailureOrigin::ContextBuild, payload)),
        };

        if let Some(failure) = failure {
            // A direct test started inside the failed context owns its resources
            let teardown = if self.state.direct.is_some() {
                Vec::new()
            } else {
                self.pass.registry.close_since(mark)
            };
            let test = TestDescription::new(self.context.clone(), name, location);
            let outcome = TestOutcome::new(test, TestResult::Failed(failure.with_teardown(teardown)));
            self.state.tests.push(self.pass.scheduler.completed(outcome));
            self.state.processed.insert(path);
            self.ran_a_test = true;
            return Ok(());
        }

        self.state.investigated.insert(context.clone());
        if child_left {
            self.contexts_left = true;
        } else {
            self.state.found_contexts.push(context);
            self.state.processed.insert(path);
        }
        if child_ran {
            self.ran_a_test = true;
        }
        Ok(())
    }

    fn pending(&mut self, name: String, location: SourceLocation) -> BuildResult {
        self.claim_name(&name)?;
        let path = ContextPath::new(self.context.clone(), name.clone());
        if self.state.processed.insert(path) {
            let test = TestDescription::new(self.context.clone(), name, location);
            let outcome = TestOutcome::new(test, TestResult::Pending);
            self.state.tests.push(self.pass.scheduler.completed(outcome));
        }
        Ok(())
    }

    fn after_suite(&mut self, callback: AfterSuiteCallback) {
        if !self.context_investigated {
            self.state.after_suite.push(callback);
        }
    }

    fn resources(&self) -> &ResourceRegistry {
        &self.pass.registry
    }

    fn current(&self) -> &Context {
        &self.context
    }
}
