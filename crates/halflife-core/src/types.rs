use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A commit on the replayed branch.
///
/// # Examples
///
/// ```
/// use halflife_core::CommitMeta;
///
/// let commit = CommitMeta::new("3f2a9c1", 1_700_000_000);
/// assert_eq!(commit.id, "3f2a9c1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMeta {
    /// Full commit hash.
    pub id: String,
    /// Unix timestamp (seconds) of the commit's author date.
    pub timestamp: i64,
}

impl CommitMeta {
    pub fn new(id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            timestamp,
        }
    }

    /// First seven characters of the hash, for display.
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(7)]
    }
}

/// Classification of a diff chunk.
///
/// # Examples
///
/// ```
/// use halflife_core::ChunkKind;
///
/// assert_eq!(ChunkKind::from_origin('+'), Some(ChunkKind::Added));
/// assert_eq!(ChunkKind::from_origin('='), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// Lines present only in the new version.
    Added,
    /// Lines present only in the old version.
    Deleted,
    /// Context lines present in both versions.
    Unchanged,
}

impl ChunkKind {
    /// Map a unified-diff line origin (`+`, `-`, space) to a chunk kind.
    pub fn from_origin(origin: char) -> Option<Self> {
        match origin {
            '+' => Some(ChunkKind::Added),
            '-' => Some(ChunkKind::Deleted),
            ' ' => Some(ChunkKind::Unchanged),
            _ => None,
        }
    }
}

/// A contiguous run of lines of one kind within a file diff.
///
/// # Examples
///
/// ```
/// use halflife_core::{ChunkKind, DiffChunk};
///
/// let chunk = DiffChunk::new(ChunkKind::Added, ["fn main() {", "}"]);
/// assert_eq!(chunk.lines.len(), 2);
/// assert_eq!(chunk.edit_size(), 14);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChunk {
    /// What happened to these lines.
    pub kind: ChunkKind,
    /// Raw line text without the trailing newline.
    pub lines: Vec<String>,
}

impl DiffChunk {
    pub fn new<I, S>(kind: ChunkKind, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Byte length of the chunk content, counting one newline per line.
    pub fn edit_size(&self) -> usize {
        self.lines.iter().map(|l| l.len() + 1).sum()
    }
}

/// The changes a commit made to a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Path relative to the repository root.
    pub path: String,
    /// Chunks in file order.
    pub chunks: Vec<DiffChunk>,
}

impl FileDiff {
    pub fn new(path: impl Into<String>, chunks: Vec<DiffChunk>) -> Self {
        Self {
            path: path.into(),
            chunks,
        }
    }
}

/// A file in a full tree snapshot.
///
/// # Examples
///
/// ```
/// use halflife_core::FileEntry;
///
/// let entry = FileEntry::new("main.go", "package main\n\nfunc main() {}\n");
/// assert_eq!(entry.lines().count(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the repository root.
    pub path: String,
    /// Full text content.
    pub content: String,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Split on `\n`, matching how diff lines are delimited.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.split('\n')
    }
}

/// Output format for CLI commands.
///
/// # Examples
///
/// ```
/// use halflife_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
