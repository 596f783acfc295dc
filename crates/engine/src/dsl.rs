//! The declaration surface used inside context builders
//!
//! Builders receive a [`ContextDsl`] and declare tests, sub-contexts and
//! pending tests on it. What a declaration does depends on who is driving the
//! builder: the discovery visitor schedules and records, the isolated replay
//! ignores everything except the one test it is after.
//!
//! ```ignore
//! RootContext::new("parser", |dsl| {
//!     let input = dsl.auto_close(Arc::new(Fixture::load()?), |f| f.cleanup());
//!     dsl.test("parses numbers", move |_| {
//!         assert_eq!(parse(&input, "1")?, 1);
//!         Ok(())
//!     })?;
//!     dsl.context("errors", |dsl| {
//!         dsl.test("reports position", |_| Ok(()))?;
//!         Ok(())
//!     })
//! });
//! ```

use crate::resources::ResourceRegistry;
use crate::scope::TestScope;
use canopy_core::{BuildResult, Context, SourceLocation};

/// Body of a test; runs at most once, possibly on another thread
pub type TestBody = Box<dyn FnOnce(&TestScope) -> anyhow::Result<()> + Send>;

/// Callback run once after every test of the suite finished
pub type AfterSuiteCallback = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// Builder of a nested context, invoked at most once per pass
pub(crate) type SubBuilder<'b> = Box<dyn FnOnce(&mut ContextDsl<'_>) -> BuildResult + 'b>;

/// What a builder's declarations are forwarded to
pub(crate) trait Declarations {
    fn test(&mut self, name: String, location: SourceLocation, body: TestBody) -> BuildResult;

    fn context(
        &mut self,
        name: String,
        location: SourceLocation,
        builder: SubBuilder<'_>,
    ) -> BuildResult;

    fn pending(&mut self, name: String, location: SourceLocation) -> BuildResult;

    fn after_suite(&mut self, callback: AfterSuiteCallback);

    fn resources(&self) -> &ResourceRegistry;

    fn current(&self) -> &Context;
}

/// Declarations available inside a context builder
pub struct ContextDsl<'a> {
    sink: &'a mut dyn Declarations,
}

impl<'a> ContextDsl<'a> {
    pub(crate) fn new(sink: &'a mut dyn Declarations) -> Self {
        Self { sink }
    }

    /// The context being built
    pub fn current(&self) -> &Context {
        self.sink.current()
    }

    /// Declare a test.
    ///
    /// Fails with a structural error if the name is already taken in this
    /// context; propagate it with `?`.
    #[track_caller]
    pub fn test<F>(&mut self, name: impl Into<String>, body: F) -> BuildResult
    where
        F: FnOnce(&TestScope) -> anyhow::Result<()> + Send + 'static,
    {
        let location = SourceLocation::caller();
        self.sink.test(name.into(), location, Box::new(body))
    }

    /// Alias of [`test`](Self::test) for behaviour-style names
    #[track_caller]
    pub fn it<F>(&mut self, behavior: impl Into<String>, body: F) -> BuildResult
    where
        F: FnOnce(&TestScope) -> anyhow::Result<()> + Send + 'static,
    {
        let location = SourceLocation::caller();
        self.sink.test(behavior.into(), location, Box::new(body))
    }

    /// Declare a nested context
    #[track_caller]
    pub fn context<F>(&mut self, name: impl Into<String>, builder: F) -> BuildResult
    where
        F: FnOnce(&mut ContextDsl<'_>) -> BuildResult,
    {
        let location = SourceLocation::caller();
        self.sink.context(name.into(), location, Box::new(builder))
    }

    /// Alias of [`context`](Self::context)
    #[track_caller]
    pub fn describe<F>(&mut self, name: impl Into<String>, builder: F) -> BuildResult
    where
        F: FnOnce(&mut ContextDsl<'_>) -> BuildResult,
    {
        let location = SourceLocation::caller();
        self.sink.context(name.into(), location, Box::new(builder))
    }

    /// Declare a test that is reported as pending and never run
    #[track_caller]
    pub fn pending(&mut self, name: impl Into<String>) -> BuildResult {
        let location = SourceLocation::caller();
        self.sink.pending(name.into(), location)
    }

    /// Register cleanup for a resource acquired while building.
    ///
    /// The resource is closed after the test that this pass of the builder
    /// runs, in reverse registration order.
    pub fn auto_close<T, F>(&mut self, resource: T, close: F) -> T
    where
        T: Clone + Send + 'static,
        F: FnOnce(T) -> anyhow::Result<()> + Send + 'static,
    {
        self.sink.resources().auto_close(resource, close)
    }

    /// Register a cleanup callback without a resource
    pub fn defer<F>(&mut self, close: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.sink.resources().defer(close)
    }

    /// Register a callback to run once after all tests of the suite.
    ///
    /// Only the first pass through this context registers it.
    pub fn after_suite<F>(&mut self, callback: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.sink.after_suite(Box::new(callback))
    }
}
