//! Root contexts and where they come from

use crate::dsl::ContextDsl;
use canopy_core::{BuildResult, Context, SourceLocation};
use std::fmt;
use std::sync::Arc;

/// Root builder; re-invoked once per discovery pass and once per isolated
/// replay, possibly from several threads
pub type BuilderFn = Arc<dyn Fn(&mut ContextDsl<'_>) -> BuildResult + Send + Sync>;

/// Entry point of one test tree
#[derive(Clone)]
pub struct RootContext {
    name: String,
    disabled: bool,
    location: SourceLocation,
    builder: BuilderFn,
}

impl RootContext {
    /// Create a root context declared at the call site
    #[track_caller]
    pub fn new<F>(name: impl Into<String>, builder: F) -> Self
    where
        F: Fn(&mut ContextDsl<'_>) -> BuildResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            disabled: false,
            location: SourceLocation::caller(),
            builder: Arc::new(builder),
        }
    }

    /// Mark this root as disabled; suites skip it
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Name of the root context
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if suites should skip this root
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Declaration site
    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// The builder function
    pub fn builder(&self) -> &BuilderFn {
        &self.builder
    }

    /// The root node of this tree
    pub fn context(&self) -> Context {
        Context::root(self.name.clone(), self.location)
    }
}

impl fmt::Debug for RootContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootContext")
            .field("name", &self.name)
            .field("disabled", &self.disabled)
            .field("location", &self.location)
            .finish()
    }
}

/// Shorthand for [`RootContext::new`]
#[track_caller]
pub fn describe<F>(name: impl Into<String>, builder: F) -> RootContext
where
    F: Fn(&mut ContextDsl<'_>) -> BuildResult + Send + Sync + 'static,
{
    RootContext::new(name, builder)
}

/// Supplies root contexts to a suite (file or type scanning lives elsewhere)
pub trait ContextProvider: Send + Sync {
    /// The root contexts this provider contributes
    fn root_contexts(&self) -> Vec<RootContext>;
}

impl ContextProvider for RootContext {
    fn root_contexts(&self) -> Vec<RootContext> {
        vec![self.clone()]
    }
}

impl ContextProvider for Vec<RootContext> {
    fn root_contexts(&self) -> Vec<RootContext> {
        self.clone()
    }
}
