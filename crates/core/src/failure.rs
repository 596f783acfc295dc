//! Captured failure causes
//!
//! Anything that goes wrong inside a test unit (an error returned by the body,
//! a panic, a broken context builder, a failing teardown) ends up as a
//! `Failure` attached to that test's `TestResult`. Nothing is re-thrown.
//!
//! When both the body and a teardown fail, the body's cause is primary and
//! the teardown errors are kept as secondary notes. A test whose body passed
//! but whose teardown failed is reported with origin `Teardown`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Where a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureOrigin {
    /// The test body returned an error
    TestBody,
    /// The test body panicked
    Panic,
    /// The builder of a context failed (error or panic)
    ContextBuild,
    /// A registered close callback failed
    Teardown,
    /// The test was cancelled before it started
    Cancelled,
    /// Replaying the tree did not reach the test
    ReplayMismatch,
}

impl fmt::Display for FailureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureOrigin::TestBody => "test body",
            FailureOrigin::Panic => "panic",
            FailureOrigin::ContextBuild => "context build",
            FailureOrigin::Teardown => "teardown",
            FailureOrigin::Cancelled => "cancelled",
            FailureOrigin::ReplayMismatch => "replay mismatch",
        };
        f.write_str(s)
    }
}

/// A close callback that failed
#[derive(Clone)]
pub struct TeardownError {
    /// Type name of the resource (or `"deferred"` for plain callbacks)
    pub resource: &'static str,
    /// What went wrong
    pub cause: Arc<anyhow::Error>,
}

impl TeardownError {
    /// Create a teardown error
    pub fn new(resource: &'static str, cause: anyhow::Error) -> Self {
        Self {
            resource,
            cause: Arc::new(cause),
        }
    }
}

impl fmt::Debug for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TeardownError({}: {:#})", self.resource, self.cause)
    }
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to close {}: {:#}", self.resource, self.cause)
    }
}

/// The captured cause of a failed test
#[derive(Clone)]
pub struct Failure {
    origin: FailureOrigin,
    cause: Arc<anyhow::Error>,
    teardown: Vec<TeardownError>,
}

impl Failure {
    /// Wrap an error with its origin
    pub fn new(origin: FailureOrigin, cause: anyhow::Error) -> Self {
        Self {
            origin,
            cause: Arc::new(cause),
            teardown: Vec::new(),
        }
    }

    /// Build a failure from a caught panic payload
    pub fn from_panic(origin: FailureOrigin, payload: Box<dyn Any + Send>) -> Self {
        let message = panic_message(payload.as_ref());
        Self::new(origin, anyhow::anyhow!("panicked: {}", message))
    }

    /// Turn teardown errors into a failure; the first one becomes the cause
    pub fn from_teardown(mut errors: Vec<TeardownError>) -> Option<Self> {
        if errors.is_empty() {
            return None;
        }
        let primary = errors.remove(0);
        Some(Self {
            origin: FailureOrigin::Teardown,
            cause: primary.cause,
            teardown: errors,
        })
    }

    /// Attach teardown errors as secondary notes
    pub fn with_teardown(mut self, errors: Vec<TeardownError>) -> Self {
        self.teardown.extend(errors);
        self
    }

    /// Origin of the primary cause
    pub fn origin(&self) -> FailureOrigin {
        self.origin
    }

    /// The primary cause
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    /// Secondary teardown errors
    pub fn teardown(&self) -> &[TeardownError] {
        &self.teardown
    }

    /// One-line message of the primary cause, including its context chain
    pub fn message(&self) -> String {
        format!("{:#}", self.cause)
    }

    /// Multi-line rendering: cause chain, then teardown notes
    pub fn pretty(&self) -> String {
        let mut out = format!("{} ({})", self.cause, self.origin);
        for cause in self.cause.chain().skip(1) {
            out.push_str("\n\tcaused by: ");
            out.push_str(&cause.to_string());
        }
        for error in &self.teardown {
            out.push_str("\n\tteardown: ");
            out.push_str(&error.to_string());
        }
        out
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("origin", &self.origin)
            .field("cause", &self.message())
            .field("teardown", &self.teardown)
            .finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "(non-string panic)".to_string()
    }
}
