//! Error types for canopy
//!
//! Two channels are kept apart:
//! - `Error`: structural problems (duplicate names, an empty suite, bad
//!   configuration). These abort discovery and are returned to the caller.
//! - `BuildError`: what a context builder returns. It carries either a
//!   structural `Error` (propagated) or an ordinary failure (turned into a
//!   failed test and never re-thrown).

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for canopy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Structural errors
#[derive(Debug, Error)]
pub enum Error {
    /// Two sibling declarations share a name
    #[error("duplicate name '{name}' in context '{context}'")]
    DuplicateName {
        /// The colliding name
        name: String,
        /// Path of the declaring context
        context: String,
    },

    /// A suite was built without any root context
    #[error("a suite needs at least one root context")]
    EmptySuite,

    /// Configuration could not be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error (config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a duplicate-name error
    pub fn duplicate_name(name: impl Into<String>, context: impl fmt::Display) -> Self {
        Error::DuplicateName {
            name: name.into(),
            context: context.to_string(),
        }
    }
}

/// Result of running a context builder
pub type BuildResult = std::result::Result<(), BuildError>;

/// Error returned by a context builder
///
/// Any error convertible into `anyhow::Error` converts with `?`. A
/// structural [`Error`] keeps its identity through the conversion.
///
/// This type deliberately does not implement `std::error::Error`, which is
/// what allows the blanket `From` impl.
pub enum BuildError {
    /// Authoring error; aborts discovery of the root
    Structural(Error),
    /// The builder failed; the context becomes a failed test
    Failed(anyhow::Error),
}

impl BuildError {
    /// True for authoring errors
    pub fn is_structural(&self) -> bool {
        matches!(self, BuildError::Structural(_))
    }

    /// Collapse into a plain cause, for reporting
    pub fn into_cause(self) -> anyhow::Error {
        match self {
            BuildError::Structural(e) => anyhow::Error::new(e),
            BuildError::Failed(e) => e,
        }
    }
}

impl<E> From<E> for BuildError
where
    E: Into<anyhow::Error>,
{
    fn from(error: E) -> Self {
        match error.into().downcast::<Error>() {
            Ok(structural) => BuildError::Structural(structural),
            Err(other) => BuildError::Failed(other),
        }
    }
}

impl fmt::Debug for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Structural(e) => f.debug_tuple("Structural").field(e).finish(),
            BuildError::Failed(e) => write!(f, "Failed({:#})", e),
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Structural(e) => write!(f, "{}", e),
            BuildError::Failed(e) => write!(f, "{:#}", e),
        }
    }
}
