//! Suites: discovery and execution of several root contexts

use crate::config::SuiteConfig;
use crate::discovery::{DiscoveryEngine, DiscoveryResult};
use crate::listener::{ExecutionListener, NullListener};
use crate::root::{ContextProvider, RootContext};
use crate::scheduler::TestScheduler;
use canopy_concurrency::WorkerPool;
use canopy_core::{Context, Error, Result, TestOutcome};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// A set of root contexts run together
pub struct Suite {
    roots: Vec<RootContext>,
    config: SuiteConfig,
    listener: Arc<dyn ExecutionListener>,
    pool: Option<Arc<WorkerPool>>,
}

impl Suite {
    /// Collect the root contexts of every provider.
    ///
    /// # Errors
    ///
    /// Returns `EmptySuite` if the providers supply no root context.
    pub fn new<I>(providers: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: ContextProvider,
    {
        let roots = providers
            .into_iter()
            .flat_map(|provider| provider.root_contexts())
            .collect();
        Self::from_roots(roots)
    }

    /// Create a suite from root contexts.
    ///
    /// # Errors
    ///
    /// Returns `EmptySuite` if `roots` is empty.
    pub fn from_roots(roots: Vec<RootContext>) -> Result<Self> {
        if roots.is_empty() {
            return Err(Error::EmptySuite);
        }
        Ok(Self {
            roots,
            config: SuiteConfig::default(),
            listener: Arc::new(NullListener),
            pool: None,
        })
    }

    /// Use `config` for scheduling.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the config does not validate.
    pub fn with_config(mut self, config: SuiteConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Report progress to `listener`
    pub fn with_listener(mut self, listener: Arc<dyn ExecutionListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Run tests on an existing pool instead of creating one per run
    pub fn with_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// The root contexts, including disabled ones
    pub fn roots(&self) -> &[RootContext] {
        &self.roots
    }

    /// The active configuration
    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    fn scheduler(&self) -> Result<TestScheduler> {
        let pool = match &self.pool {
            Some(pool) => Arc::clone(pool),
            None => {
                let prefix = &self.config.thread_name_prefix;
                let pool = match self.config.worker_threads {
                    Some(threads) => WorkerPool::new(threads, prefix)?,
                    None => WorkerPool::with_default_size(prefix)?,
                };
                Arc::new(pool)
            }
        };
        Ok(TestScheduler::new(
            pool,
            self.config.start_policy(),
            Arc::clone(&self.listener),
        ))
    }

    /// Discover every enabled root; roots are discovered in parallel.
    ///
    /// Tests start while discovery is still running unless the suite is
    /// lazy. Results are in root order.
    ///
    /// # Errors
    ///
    /// Returns the first structural error of any root. Tests of the other
    /// roots that have not started are cancelled.
    pub fn find_tests(&self) -> Result<Vec<DiscoveryResult>> {
        let scheduler = self.scheduler()?;
        let enabled: Vec<&RootContext> = self
            .roots
            .iter()
            .filter(|root| {
                if root.is_disabled() {
                    info!(root = root.name(), "skipping disabled root context");
                }
                !root.is_disabled()
            })
            .collect();

        let discovered: Vec<Result<DiscoveryResult>> = std::thread::scope(|s| {
            let handles: Vec<_> = enabled
                .iter()
                .map(|root| {
                    let engine = DiscoveryEngine::new((*root).clone(), scheduler.clone());
                    s.spawn(move || engine.execute())
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        });

        let mut results = Vec::with_capacity(discovered.len());
        let mut first_error = None;
        for outcome in discovered {
            match outcome {
                Ok(result) => results.push(result),
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }
        if let Some(error) = first_error {
            for result in &results {
                result.cancel_pending();
            }
            return Err(error);
        }
        Ok(results)
    }

    /// Discover and run every test, then the after-suite callbacks.
    ///
    /// # Errors
    ///
    /// Fails only on structural errors; failing tests are part of the result.
    pub fn run(&self) -> Result<SuiteResult> {
        let started = Instant::now();
        let mut discovered = self.find_tests()?;

        // Every root's tests share the pool before anything is awaited
        for result in &discovered {
            result.start_all();
        }

        let mut all_tests = Vec::new();
        let mut contexts = Vec::new();
        for result in &discovered {
            all_tests.extend(result.wait_all());
            contexts.extend(result.contexts.iter().cloned());
        }

        let after_suite_failures = discovered
            .iter_mut()
            .flat_map(|result| result.run_after_suite())
            .collect();

        let result = SuiteResult {
            all_tests,
            contexts,
            after_suite_failures,
        };
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "{}", result.summary());
        Ok(result)
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("roots", &self.roots)
            .field("config", &self.config)
            .finish()
    }
}

/// Results of a suite run
#[derive(Debug)]
pub struct SuiteResult {
    /// Every test of every root, discovery order within a root
    pub all_tests: Vec<TestOutcome>,
    /// Every discovered context
    pub contexts: Vec<Context>,
    /// Failures of after-suite callbacks
    pub after_suite_failures: Vec<anyhow::Error>,
}

impl SuiteResult {
    /// True if no test and no after-suite callback failed
    pub fn all_ok(&self) -> bool {
        self.after_suite_failures.is_empty() && !self.all_tests.iter().any(TestOutcome::is_failed)
    }

    /// Failed tests
    pub fn failed_tests(&self) -> Vec<&TestOutcome> {
        self.all_tests.iter().filter(|o| o.is_failed()).collect()
    }

    /// Pending tests
    pub fn pending_tests(&self) -> Vec<&TestOutcome> {
        self.all_tests.iter().filter(|o| o.is_pending()).collect()
    }

    /// The `n` slowest successful tests, slowest first
    pub fn slowest(&self, n: usize) -> Vec<&TestOutcome> {
        let mut timed: Vec<&TestOutcome> =
            self.all_tests.iter().filter(|o| o.is_success()).collect();
        timed.sort_by_key(|o| std::cmp::Reverse(o.result.duration()));
        timed.truncate(n);
        timed
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let failed = self.failed_tests().len();
        let pending = self.pending_tests().len();
        let passed = self.all_tests.len() - failed - pending;
        let mut summary = format!(
            "{} tests: {} passed, {} failed, {} pending",
            self.all_tests.len(),
            passed,
            failed,
            pending
        );
        if !self.after_suite_failures.is_empty() {
            summary.push_str(&format!(
                ", {} after-suite failures",
                self.after_suite_failures.len()
            ));
        }
        summary
    }
}
