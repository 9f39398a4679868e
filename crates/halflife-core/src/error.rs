/// Errors that can occur across halflife.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary reports it through `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use halflife_core::HalflifeError;
///
/// let err = HalflifeError::Config("time_points must be at least 1".into());
/// assert!(err.to_string().contains("time_points"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum HalflifeError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure (open repository, walk history, read objects).
    #[error("git error: {0}")]
    Git(String),

    /// None of the candidate branch names resolved to a local branch.
    #[error("could not resolve a primary branch (tried: {})", .tried.join(", "))]
    #[diagnostic(help("pass --branch NAME or set `branch` under [analysis] in .halflife.toml"))]
    BranchNotFound {
        /// Branch names that were tried, in order.
        tried: Vec<String>,
    },

    /// A file pattern could not be compiled.
    #[error("invalid file pattern '{pattern}': {reason}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A commit was applied with a timestamp older than its predecessor.
    #[error("commit {commit} at {timestamp} is older than the previously applied commit at {previous}")]
    OutOfOrder {
        /// Identifier of the rejected commit.
        commit: String,
        /// Its timestamp.
        timestamp: i64,
        /// Timestamp of the last applied commit.
        previous: i64,
    },

    /// The replay produced no record with a positive lifetime.
    #[error("failed to compute statistics: no valid lifetimes found")]
    #[diagnostic(help("check that the file pattern matches files with non-blank lines"))]
    NoLifetimes,

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
