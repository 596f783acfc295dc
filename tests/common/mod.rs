//! Shared test utilities for the integration test suites.
//!
//! Import via `mod common;` from a test's main.rs.

#![allow(dead_code)]

pub use canopy::*;
use parking_lot::Mutex;
use std::sync::{Arc, Once};

// ============================================================================
// Initialization
// ============================================================================

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging; the first call wins.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .with_thread_ids(true)
            .with_ansi(false)
            .try_init();
    });
}

// ============================================================================
// Journal - ordered record of side effects
// ============================================================================

/// Shared, ordered list of things that happened.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| e.as_str() == entry).count()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.count(entry) > 0
    }

    /// Close callback for `auto_close` that records `close <name>`.
    pub fn closer(&self) -> impl FnOnce(&'static str) -> anyhow::Result<()> + Send + 'static {
        let journal = self.clone();
        move |name| {
            journal.record(format!("close {}", name));
            Ok(())
        }
    }
}

// ============================================================================
// RecordingListener
// ============================================================================

/// Listener that keeps every notification as a line of text.
#[derive(Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

impl ExecutionListener for RecordingListener {
    fn test_started(&self, test: &TestDescription) {
        self.events.lock().push(format!("started {}", test.name));
    }

    fn test_finished(&self, outcome: &TestOutcome) {
        let verdict = match &outcome.result {
            TestResult::Success { .. } => "ok",
            TestResult::Failed(_) => "failed",
            TestResult::Pending => "pending",
        };
        self.events
            .lock()
            .push(format!("finished {} {}", outcome.test.name, verdict));
    }

    fn test_event(&self, test: &TestDescription, kind: &str, payload: &str) {
        self.events
            .lock()
            .push(format!("event {} {} {}", test.name, kind, payload));
    }
}

// ============================================================================
// Discovery helpers
// ============================================================================

pub fn scheduler(policy: StartPolicy, listener: Arc<dyn ExecutionListener>) -> TestScheduler {
    let pool = WorkerPool::new(4, "canopy-test").expect("Failed to create worker pool");
    TestScheduler::new(Arc::new(pool), policy, listener)
}

pub fn discover(root: RootContext, policy: StartPolicy) -> DiscoveryResult {
    try_discover(root, policy).expect("discovery failed")
}

pub fn try_discover(root: RootContext, policy: StartPolicy) -> Result<DiscoveryResult> {
    init_test_logging();
    DiscoveryEngine::new(root, scheduler(policy, Arc::new(TracingListener))).execute()
}

pub fn test_names(result: &DiscoveryResult) -> Vec<String> {
    result.tests.iter().map(|h| h.test().name.clone()).collect()
}

pub fn context_names(result: &DiscoveryResult) -> Vec<String> {
    result.contexts.iter().map(|c| c.name().to_string()).collect()
}

/// The single outcome named `name`
pub fn outcome_of(outcomes: &[TestOutcome], name: &str) -> TestOutcome {
    let mut matching = outcomes.iter().filter(|o| o.test.name == name);
    let found = matching.next().expect("no test with that name").clone();
    assert!(matching.next().is_none(), "more than one test named {}", name);
    found
}

/// Proptest config with a fixed number of cases.
pub fn test_proptest_config(cases: u32) -> proptest::test_runner::Config {
    proptest::test_runner::Config {
        cases,
        ..proptest::test_runner::Config::default()
    }
}
