//! Line identity resolution.
//!
//! A line is "the same line" across commits when it lives in the same file
//! and has exactly the same text. Two identical lines in one file collapse
//! onto a single identity; resolving that needs positional information the
//! diff chunks do not carry, so the strategy sits behind [`IdentityResolver`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a tracked line.
///
/// Path and content are kept apart, so `("a:b", "c")` and `("a", "b:c")`
/// stay distinct even though they render identically.
///
/// # Examples
///
/// ```
/// use halflife_lifecycle::identity::LineKey;
///
/// let key = LineKey::new("src/lib.rs", "pub mod tracker;");
/// assert_eq!(key.to_string(), "src/lib.rs:pub mod tracker;");
/// ```
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct LineKey {
    path: String,
    content: String,
}

impl LineKey {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.content)
    }
}

/// Maps a (file, line) pair to the identity used to correlate it across commits.
///
/// Returning `None` excludes the line from tracking entirely.
pub trait IdentityResolver {
    fn resolve(&self, path: &str, line: &str) -> Option<LineKey>;
}

/// The default resolver: exact, whitespace-sensitive content within one file.
/// Lines that are empty after trimming are never tracked.
///
/// # Examples
///
/// ```
/// use halflife_lifecycle::identity::{ContentIdentity, IdentityResolver};
///
/// let resolver = ContentIdentity;
/// assert!(resolver.resolve("main.go", "   ").is_none());
/// assert_ne!(
///     resolver.resolve("main.go", "x := 1"),
///     resolver.resolve("main.go", "  x := 1"),
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentIdentity;

impl IdentityResolver for ContentIdentity {
    fn resolve(&self, path: &str, line: &str) -> Option<LineKey> {
        if line.trim().is_empty() {
            return None;
        }
        Some(LineKey::new(path, line))
    }
}
