//! Declaration-site locations
//!
//! Every context and test records where it was declared. The location is
//! captured once, at the declaration call, through `#[track_caller]`; it is
//! never recomputed later.

use std::fmt;
use std::panic::Location;

/// Source position of a declaration.
///
/// Ordered by file, then line, then column. Sibling contexts are reported in
/// this order, which matches declaration order for trees written in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceLocation {
    /// Source file as reported by the compiler
    pub file: &'static str,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

impl SourceLocation {
    /// Create a location from explicit parts
    pub const fn new(file: &'static str, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// Location of the caller of the enclosing `#[track_caller]` function
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }

    /// File name without its directory part
    pub fn file_name(&self) -> &'static str {
        self.file
            .rsplit(&['/', '\\'][..])
            .next()
            .unwrap_or(self.file)
    }
}

impl From<&'static Location<'static>> for SourceLocation {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
