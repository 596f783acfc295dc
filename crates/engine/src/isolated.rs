//! Isolated replay of a single test
//!
//! Every test after the first new one in a context runs through an
//! [`IsolatedTestRunner`]: the root builder is invoked again and only the
//! contexts on the path to the target test are entered. Every other test
//! body is dropped without running, pending tests and after-suite callbacks
//! are ignored. Resources registered along the path land in a registry owned
//! by this run and are closed after the target body, last registered first.

use crate::dsl::{AfterSuiteCallback, ContextDsl, Declarations, SubBuilder, TestBody};
use crate::listener::ExecutionListener;
use crate::resources::ResourceRegistry;
use crate::root::BuilderFn;
use crate::scope::TestScope;
use crate::unit::{conclude, run_body};
use canopy_core::{
    BuildResult, Context, Failure, FailureOrigin, SourceLocation, TestDescription, TestResult,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Replays the builder chain of one test and runs only that test
pub struct IsolatedTestRunner {
    builder: BuilderFn,
    target: TestDescription,
    listener: Arc<dyn ExecutionListener>,
}

impl IsolatedTestRunner {
    /// Prepare a replay of `target` through the root `builder`
    pub fn new(
        builder: BuilderFn,
        target: TestDescription,
        listener: Arc<dyn ExecutionListener>,
    ) -> Self {
        Self {
            builder,
            target,
            listener,
        }
    }

    /// The test this runner executes
    pub fn target(&self) -> &TestDescription {
        &self.target
    }

    /// Replay the path and run the target.
    ///
    /// Never panics; every failure on the way becomes a failed result.
    pub fn execute(self) -> TestResult {
        debug!(test = %self.target(), "replaying test");
        let started = Instant::now();
        let registry = Arc::new(ResourceRegistry::new());
        let chain = self.target.container.ancestry();
        let mut outcome = None;

        let built = {
            let mut replay = ReplayVisitor {
                registry: &registry,
                chain: &chain,
                depth: 0,
                target: &self.target,
                listener: &self.listener,
                outcome: &mut outcome,
            };
            catch_unwind(AssertUnwindSafe(|| {
                (self.builder)(&mut ContextDsl::new(&mut replay))
            }))
        };

        let outcome = match outcome {
            Some(outcome) => outcome,
            None => Err(match built {
                Ok(Ok(())) => Failure::new(
                    FailureOrigin::ReplayMismatch,
                    anyhow::anyhow!(
                        "test '{}' was not declared again in '{}' during replay",
                        self.target.name,
                        self.target.container
                    ),
                ),
                Ok(Err(error)) => Failure::new(FailureOrigin::ContextBuild, error.into_cause()),
                Err(payload) => Failure::from_panic(FailureOrigin::ContextBuild, payload),
            }),
        };

        conclude(outcome, registry.close_all(), started)
    }
}

struct ReplayVisitor<'r> {
    registry: &'r Arc<ResourceRegistry>,
    /// Root first, the target's container last
    chain: &'r [Context],
    depth: usize,
    target: &'r TestDescription,
    listener: &'r Arc<dyn ExecutionListener>,
    outcome: &'r mut Option<Result<(), Failure>>,
}

impl ReplayVisitor<'_> {
    fn at_target_container(&self) -> bool {
        self.depth + 1 == self.chain.len()
    }
}

impl Declarations for ReplayVisitor<'_> {
    fn test(&mut self, name: String, _location: SourceLocation, body: TestBody) -> BuildResult {
        if self.outcome.is_none() && self.at_target_container() && name == self.target.name {
            let scope = TestScope::new(
                self.target.clone(),
                Arc::clone(self.registry),
                Arc::clone(self.listener),
            );
            *self.outcome = Some(run_body(body, &scope));
        }
        Ok(())
    }

    fn context(
        &mut self,
        name: String,
        _location: SourceLocation,
        builder: SubBuilder<'_>,
    ) -> BuildResult {
        let depth = self.depth + 1;
        let on_path = self
            .chain
            .get(depth)
            .map_or(false, |context| context.name() == name);
        if self.outcome.is_some() || !on_path {
            return Ok(());
        }

        let built = {
            let mut child = ReplayVisitor {
                registry: self.registry,
                chain: self.chain,
                depth,
                target: self.target,
                listener: self.listener,
                outcome: &mut *self.outcome,
            };
            catch_unwind(AssertUnwindSafe(|| builder(&mut ContextDsl::new(&mut child))))
        };

        let failure = match built {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(Failure::new(FailureOrigin::ContextBuild, error.into_cause())),
            Err(payload) => Some(Failure::from_panic(FailureOrigin::ContextBuild, payload)),
        };
        // A context that fails after the target ran does not change its result
        if let Some(failure) = failure {
            if self.outcome.is_none() {
                *self.outcome = Some(Err(failure));
            }
        }
        Ok(())
    }

    fn pending(&mut self, _name: String, _location: SourceLocation) -> BuildResult {
        Ok(())
    }

    fn after_suite(&mut self, _callback: AfterSuiteCallback) {}

    fn resources(&self) -> &ResourceRegistry {
        self.registry
    }

    fn current(&self) -> &Context {
        &self.chain[self.depth]
    }
}
