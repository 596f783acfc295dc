//! Scoped cleanup registry ("autoClose")
//!
//! Builder and test code register cleanup next to the acquisition:
//!
//! ```ignore
//! let db = dsl.auto_close(Arc::new(TestDb::open()?), |db| db.close());
//! ```
//!
//! One sweep per executed test releases everything in reverse registration
//! order. Close callbacks may fail or panic; every failure is collected as a
//! `TeardownError` and the sweep keeps going.

use canopy_core::{panic_message, TeardownError};
use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

type CloseFn = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

struct Registration {
    resource: &'static str,
    close: CloseFn,
}

/// Registry of cleanup callbacks for one test unit
#[derive(Default)]
pub struct ResourceRegistry {
    entries: Mutex<Vec<Registration>>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `close` for `resource` and hand the resource back.
    ///
    /// The registry keeps a clone for the close callback, so shared handles
    /// (`Arc<_>`, pools, connection handles) are the natural fit.
    pub fn auto_close<T, F>(&self, resource: T, close: F) -> T
    where
        T: Clone + Send + 'static,
        F: FnOnce(T) -> anyhow::Result<()> + Send + 'static,
    {
        let held = resource.clone();
        self.push(
            std::any::type_name::<T>(),
            Box::new(move || close(held)),
        );
        resource
    }

    /// Register a cleanup callback that is not tied to a resource
    pub fn defer<F>(&self, close: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.push("deferred", Box::new(close));
    }

    fn push(&self, resource: &'static str, close: CloseFn) {
        self.entries.lock().push(Registration { resource, close });
    }

    /// Number of callbacks waiting to run
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current position; pass to [`close_since`](Self::close_since)
    pub fn mark(&self) -> usize {
        self.len()
    }

    /// Run every registered callback, last registered first
    pub fn close_all(&self) -> Vec<TeardownError> {
        self.close_since(0)
    }

    /// Run the callbacks registered after `mark`, last registered first.
    ///
    /// Earlier registrations stay in place.
    pub fn close_since(&self, mark: usize) -> Vec<TeardownError> {
        let drained = {
            let mut entries = self.entries.lock();
            if mark >= entries.len() {
                return Vec::new();
            }
            entries.split_off(mark)
        };

        let mut errors = Vec::new();
        for Registration { resource, close } in drained.into_iter().rev() {
            match catch_unwind(AssertUnwindSafe(close)) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(TeardownError::new(resource, e)),
                Err(payload) => errors.push(TeardownError::new(
                    resource,
                    anyhow::anyhow!("panicked: {}", panic_message(payload.as_ref())),
                )),
            }
        }
        errors
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        let names: Vec<_> = entries.iter().map(|r| r.resource).collect();
        f.debug_struct("ResourceRegistry")
            .field("resources", &names)
            .finish()
    }
}

/// Owns a registry on behalf of a test unit.
///
/// Closing is explicit on the normal path. If the unit is dropped without
/// running (cancelled, or a lazy handle nobody awaited), whatever is still
/// registered is closed on drop and failures are logged.
pub(crate) struct RegistryGuard {
    registry: Arc<ResourceRegistry>,
}

impl RegistryGuard {
    pub(crate) fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self { registry }
    }

    pub(crate) fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    pub(crate) fn close(&self) -> Vec<TeardownError> {
        self.registry.close_all()
    }
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        for error in self.registry.close_all() {
            warn!("teardown of an unfinished test failed: {}", error);
        }
    }
}
