//! Context identity
//!
//! A `Context` is a named node of the discovered tree. Identity is the name
//! plus the parent chain: two contexts with the same names along the same
//! ancestry are equal, wherever they were created. The declaration location
//! is carried along but never participates in equality.
//!
//! Nodes are shared (`Arc`) so descriptions, handles and reports can hold
//! them cheaply; a discovery run interns them by `ContextPath` so every pass
//! reuses the node created on first sight.

use crate::location::SourceLocation;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

struct ContextNode {
    name: String,
    parent: Option<Context>,
    location: SourceLocation,
    depth: usize,
}

/// A named node in the test hierarchy
#[derive(Clone)]
pub struct Context(Arc<ContextNode>);

impl Context {
    /// Create a root context (no parent)
    pub fn root(name: impl Into<String>, location: SourceLocation) -> Self {
        Self(Arc::new(ContextNode {
            name: name.into(),
            parent: None,
            location,
            depth: 0,
        }))
    }

    /// Create a context nested directly under `self`
    pub fn child(&self, name: impl Into<String>, location: SourceLocation) -> Self {
        Self(Arc::new(ContextNode {
            name: name.into(),
            parent: Some(self.clone()),
            location,
            depth: self.0.depth + 1,
        }))
    }

    /// Name of this context
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Enclosing context, `None` for a root
    pub fn parent(&self) -> Option<&Context> {
        self.0.parent.as_ref()
    }

    /// Where this context was declared
    pub fn location(&self) -> SourceLocation {
        self.0.location
    }

    /// Number of ancestors (0 for a root)
    pub fn depth(&self) -> usize {
        self.0.depth
    }

    /// True if this context has no parent
    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    /// Ancestor chain from the root down to and including `self`
    pub fn ancestry(&self) -> Vec<Context> {
        let mut chain = Vec::with_capacity(self.depth() + 1);
        let mut current = Some(self);
        while let Some(context) = current {
            chain.push(context.clone());
            current = context.parent();
        }
        chain.reverse();
        chain
    }

    /// Names from the root down to and including `self`
    pub fn path(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(self.depth() + 1);
        let mut current = Some(self);
        while let Some(context) = current {
            names.push(context.name());
            current = context.parent();
        }
        names.reverse();
        names
    }

    /// Human readable path, e.g. `root > outer > inner`
    pub fn string_path(&self) -> String {
        self.path().join(" > ")
    }

    /// True if `self` is `other` or one of its ancestors
    pub fn contains(&self, other: &Context) -> bool {
        let mut current = Some(other);
        while let Some(context) = current {
            if context.depth() < self.depth() {
                return false;
            }
            if context == self {
                return true;
            }
            current = context.parent();
        }
        false
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.depth == other.0.depth
                && self.0.name == other.0.name
                && self.0.parent == other.0.parent)
    }
}

impl Eq for Context {}

impl Hash for Context {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
        self.0.parent.hash(state);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("path", &self.string_path())
            .field("location", &self.0.location)
            .finish()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_path())
    }
}

/// Dedup key for a declaration directly under a context
///
/// Used for tests and sub-contexts alike: once a path is processed it is
/// skipped by every later discovery pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextPath {
    /// The declaring context
    pub container: Context,
    /// Name of the declaration
    pub name: String,
}

impl ContextPath {
    /// Create a new path
    pub fn new(container: Context, name: impl Into<String>) -> Self {
        Self {
            container,
            name: name.into(),
        }
    }
}

impl fmt::Display for ContextPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} > {}", self.container, self.name)
    }
}
