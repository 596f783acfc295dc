//! The handle a test body receives

use crate::listener::ExecutionListener;
use crate::resources::ResourceRegistry;
use canopy_core::TestDescription;
use std::fmt;
use std::sync::Arc;

/// Per-test capabilities: resource registration and event publishing
pub struct TestScope {
    test: TestDescription,
    resources: Arc<ResourceRegistry>,
    listener: Arc<dyn ExecutionListener>,
}

impl TestScope {
    pub(crate) fn new(
        test: TestDescription,
        resources: Arc<ResourceRegistry>,
        listener: Arc<dyn ExecutionListener>,
    ) -> Self {
        Self {
            test,
            resources,
            listener,
        }
    }

    /// The running test
    pub fn description(&self) -> &TestDescription {
        &self.test
    }

    /// Register `close` for `resource`; it runs after the test, LIFO
    pub fn auto_close<T, F>(&self, resource: T, close: F) -> T
    where
        T: Clone + Send + 'static,
        F: FnOnce(T) -> anyhow::Result<()> + Send + 'static,
    {
        self.resources.auto_close(resource, close)
    }

    /// Register a cleanup callback that runs after the test
    pub fn defer<F>(&self, close: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.resources.defer(close)
    }

    /// Publish a log line for this test
    pub fn log(&self, message: impl AsRef<str>) {
        self.event("stdout", message);
    }

    /// Publish a custom event for this test
    pub fn event(&self, kind: &str, payload: impl AsRef<str>) {
        self.listener.test_event(&self.test, kind, payload.as_ref());
    }
}

impl fmt::Debug for TestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestScope").field("test", &self.test).finish()
    }
}
