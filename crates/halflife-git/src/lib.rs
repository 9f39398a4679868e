//! Git history source for halflife.
//!
//! Walks one branch of a repository with git2 and exposes it as a
//! [`halflife_lifecycle::DiffSource`]: the commits oldest first, a full-tree
//! snapshot for the first one, and per-file diff chunks for the rest.

pub mod history;

pub use history::GitSource;
