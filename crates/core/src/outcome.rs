//! Test identity and terminal results

use crate::context::{Context, ContextPath};
use crate::failure::Failure;
use crate::location::SourceLocation;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Identity of one test
///
/// Unique within its container. Equality and hashing use the container and
/// the name; the location is informational.
#[derive(Debug, Clone)]
pub struct TestDescription {
    /// The context the test is declared in
    pub container: Context,
    /// Test name
    pub name: String,
    /// Declaration site
    pub location: SourceLocation,
}

impl TestDescription {
    /// Create a description
    pub fn new(container: Context, name: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            container,
            name: name.into(),
            location,
        }
    }

    /// Dedup key of this test inside its container
    pub fn path(&self) -> ContextPath {
        ContextPath::new(self.container.clone(), self.name.clone())
    }
}

impl PartialEq for TestDescription {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.container == other.container
    }
}

impl Eq for TestDescription {}

impl Hash for TestDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.container.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for TestDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.container, self.name)
    }
}

/// Terminal result of a test, produced exactly once
#[derive(Debug, Clone)]
pub enum TestResult {
    /// The body completed and teardown succeeded
    Success {
        /// Wall time of the unit in microseconds
        duration_micros: u64,
    },
    /// Something failed; see the captured cause
    Failed(Failure),
    /// Declared but intentionally not run
    Pending,
}

impl TestResult {
    /// Success with the given elapsed time
    pub fn success(elapsed: Duration) -> Self {
        TestResult::Success {
            duration_micros: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
        }
    }

    /// Check if this result is a success
    pub fn is_success(&self) -> bool {
        matches!(self, TestResult::Success { .. })
    }

    /// Check if this result is a failure
    pub fn is_failed(&self) -> bool {
        matches!(self, TestResult::Failed(_))
    }

    /// Check if this result is pending
    pub fn is_pending(&self) -> bool {
        matches!(self, TestResult::Pending)
    }

    /// The failure, if any
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            TestResult::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Duration of a successful test
    pub fn duration(&self) -> Option<Duration> {
        match self {
            TestResult::Success { duration_micros } => Some(Duration::from_micros(*duration_micros)),
            _ => None,
        }
    }
}

/// A test together with its result
#[derive(Debug, Clone)]
pub struct TestOutcome {
    /// The test
    pub test: TestDescription,
    /// Its terminal result
    pub result: TestResult,
}

impl TestOutcome {
    /// Pair a description with its result
    pub fn new(test: TestDescription, result: TestResult) -> Self {
        Self { test, result }
    }

    /// Check if the test succeeded
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    /// Check if the test failed
    pub fn is_failed(&self) -> bool {
        self.result.is_failed()
    }

    /// Check if the test is pending
    pub fn is_pending(&self) -> bool {
        self.result.is_pending()
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            TestResult::Success { duration_micros } => {
                write!(f, "{} ... ok ({}us)", self.test, duration_micros)
            }
            TestResult::Failed(failure) => write!(f, "{} ... FAILED: {}", self.test, failure),
            TestResult::Pending => write!(f, "{} ... pending", self.test),
        }
    }
}
