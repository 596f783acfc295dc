//! Execution listeners
//!
//! Reporters observe test progress through [`ExecutionListener`]. Callbacks
//! come from whichever worker runs the test, so implementations must be
//! thread-safe and should return quickly.

use canopy_core::{TestDescription, TestOutcome, TestResult};
use tracing::{debug, info, trace};

/// Receives test lifecycle notifications
///
/// `test_started` and `test_finished` are called exactly once per test and
/// transition. Pending tests and failed contexts only produce
/// `test_finished`; cancelled tests produce nothing.
pub trait ExecutionListener: Send + Sync {
    /// A test unit started running
    fn test_started(&self, _test: &TestDescription) {}

    /// A test reached its terminal result
    fn test_finished(&self, _outcome: &TestOutcome) {}

    /// A test published an event (log line, custom payload)
    fn test_event(&self, _test: &TestDescription, _kind: &str, _payload: &str) {}
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl ExecutionListener for NullListener {}

/// Listener that forwards lifecycle notifications to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl ExecutionListener for TracingListener {
    fn test_started(&self, test: &TestDescription) {
        debug!(test = %test, "test started");
    }

    fn test_finished(&self, outcome: &TestOutcome) {
        match &outcome.result {
            TestResult::Success { duration_micros } => {
                info!(test = %outcome.test, duration_micros = *duration_micros, "test passed")
            }
            TestResult::Failed(failure) => {
                info!(test = %outcome.test, origin = %failure.origin(), "test failed: {}", failure)
            }
            TestResult::Pending => info!(test = %outcome.test, "test pending"),
        }
    }

    fn test_event(&self, test: &TestDescription, kind: &str, payload: &str) {
        trace!(test = %test, kind, "{}", payload);
    }
}
