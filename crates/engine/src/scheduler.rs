//! Scheduling of test units and the handles callers await
//!
//! Every discovered test is represented by a [`TestHandle`]. Under the eager
//! policy the unit is submitted to the shared worker pool as soon as it is
//! scheduled; under the lazy policy it stays suspended until someone awaits
//! or starts the handle. Either way the unit runs at most once.

use crate::listener::ExecutionListener;
use canopy_concurrency::{Deferred, DeferredError, StartPolicy, WorkerPool};
use canopy_core::{Failure, FailureOrigin, TestDescription, TestOutcome, TestResult};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns test units into handles according to a start policy
#[derive(Clone)]
pub struct TestScheduler {
    pool: Arc<WorkerPool>,
    policy: StartPolicy,
    listener: Arc<dyn ExecutionListener>,
}

impl TestScheduler {
    /// Create a scheduler over `pool`
    pub fn new(
        pool: Arc<WorkerPool>,
        policy: StartPolicy,
        listener: Arc<dyn ExecutionListener>,
    ) -> Self {
        Self {
            pool,
            policy,
            listener,
        }
    }

    /// The start policy
    pub fn policy(&self) -> StartPolicy {
        self.policy
    }

    /// The listener notified about scheduled units
    pub fn listener(&self) -> &Arc<dyn ExecutionListener> {
        &self.listener
    }

    /// The pool units run on
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Schedule `unit` for `test`.
    ///
    /// The unit must not panic; units catch their own failures and report a
    /// terminal result.
    pub fn schedule<F>(&self, test: TestDescription, unit: F) -> TestHandle
    where
        F: FnOnce() -> TestResult + Send + 'static,
    {
        let handle = self.schedule_suspended(test, unit);
        self.release(&handle);
        handle
    }

    /// Like [`schedule`](Self::schedule) but never starts the unit.
    ///
    /// Discovery holds back the direct test of a pass this way until the pass
    /// finished registering resources, then calls [`release`](Self::release).
    pub fn schedule_suspended<F>(&self, test: TestDescription, unit: F) -> TestHandle
    where
        F: FnOnce() -> TestResult + Send + 'static,
    {
        let listener = Arc::clone(&self.listener);
        let described = test.clone();
        let deferred = Deferred::new(move || {
            listener.test_started(&described);
            let outcome = TestOutcome::new(described, unit());
            listener.test_finished(&outcome);
            outcome
        });

        debug!(test = %test, policy = ?self.policy, "scheduled test");

        TestHandle {
            test,
            deferred,
            pool: Arc::clone(&self.pool),
            listener: Arc::clone(&self.listener),
        }
    }

    /// Start a suspended handle if the policy is eager
    pub fn release(&self, handle: &TestHandle) {
        if self.policy == StartPolicy::Eager {
            handle.start();
        }
    }

    /// A handle for a test whose result is already known
    pub fn completed(&self, outcome: TestOutcome) -> TestHandle {
        self.listener.test_finished(&outcome);
        TestHandle {
            test: outcome.test.clone(),
            deferred: Deferred::completed(outcome),
            pool: Arc::clone(&self.pool),
            listener: Arc::clone(&self.listener),
        }
    }
}

impl fmt::Debug for TestScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestScheduler")
            .field("policy", &self.policy)
            .field("pool", &self.pool.stats())
            .finish()
    }
}

/// Awaitable result of one test
#[derive(Clone)]
pub struct TestHandle {
    test: TestDescription,
    deferred: Deferred<TestOutcome>,
    pool: Arc<WorkerPool>,
    listener: Arc<dyn ExecutionListener>,
}

impl TestHandle {
    /// The test this handle resolves
    pub fn test(&self) -> &TestDescription {
        &self.test
    }

    /// Submit a suspended unit to the pool; no-op once started.
    ///
    /// If the pool is shut down the unit stays suspended and runs on the
    /// thread that awaits it.
    pub fn start(&self) {
        if self.deferred.start_on(&self.pool).is_err() {
            warn!(test = %self.test, "worker pool is shut down, test runs when awaited");
        }
    }

    /// Block until the test finished, running it inline if still suspended
    pub fn wait(&self) -> TestOutcome {
        match self.deferred.wait() {
            Ok(outcome) => outcome,
            Err(error) => self.unfinished(error),
        }
    }

    /// The outcome if already terminal; never blocks
    pub fn try_outcome(&self) -> Option<TestOutcome> {
        self.deferred.try_get().map(|got| match got {
            Ok(outcome) => outcome,
            Err(error) => self.unfinished(error),
        })
    }

    /// True once the handle reached a terminal state
    pub fn is_finished(&self) -> bool {
        self.deferred.is_done()
    }

    /// True while the unit has not started
    pub fn is_suspended(&self) -> bool {
        self.deferred.is_suspended()
    }

    /// Cancel the test if it has not started; returns true on success.
    ///
    /// A cancelled test never runs and resolves to a failure, which the
    /// listener sees as the test's terminal result.
    pub fn cancel(&self) -> bool {
        if !self.deferred.cancel() {
            return false;
        }
        debug!(test = %self.test, "cancelled test");
        self.listener.test_finished(&self.unfinished(DeferredError::Cancelled));
        true
    }

    fn unfinished(&self, error: DeferredError) -> TestOutcome {
        let origin = match error {
            DeferredError::Cancelled => FailureOrigin::Cancelled,
            DeferredError::Abandoned => FailureOrigin::Panic,
        };
        TestOutcome::new(
            self.test.clone(),
            TestResult::Failed(Failure::new(origin, anyhow::Error::new(error))),
        )
    }
}

impl fmt::Debug for TestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestHandle")
            .field("test", &self.test)
            .field("deferred", &self.deferred)
            .finish()
    }
}
