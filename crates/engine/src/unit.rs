//! Pieces shared by direct and isolated test units

use crate::dsl::TestBody;
use crate::scope::TestScope;
use canopy_core::{Failure, FailureOrigin, TeardownError, TestResult};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

/// Run a test body, turning `Err` returns and panics into failures
pub(crate) fn run_body(body: TestBody, scope: &TestScope) -> Result<(), Failure> {
    match catch_unwind(AssertUnwindSafe(|| body(scope))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(cause)) => Err(Failure::new(FailureOrigin::TestBody, cause)),
        Err(payload) => Err(Failure::from_panic(FailureOrigin::Panic, payload)),
    }
}

/// Combine the body outcome with the teardown errors of the unit.
///
/// The body's failure stays primary; teardown errors become notes. A body
/// that passed with a failing teardown fails with origin `Teardown`.
pub(crate) fn conclude(
    outcome: Result<(), Failure>,
    teardown: Vec<TeardownError>,
    started: Instant,
) -> TestResult {
    match outcome {
        Err(failure) => TestResult::Failed(failure.with_teardown(teardown)),
        Ok(()) => match Failure::from_teardown(teardown) {
            Some(failure) => TestResult::Failed(failure),
            None => TestResult::success(started.elapsed()),
        },
    }
}
