//! Commit history extraction via git2.
//!
//! Follows the first-parent chain of a single branch, so merges contribute
//! the combined change they introduced to that branch and nothing else.

use std::path::Path;

use git2::{BranchType, DiffOptions, ObjectType, Oid, Patch, Repository, Sort, TreeWalkMode};
use halflife_core::{ChunkKind, CommitMeta, DiffChunk, FileDiff, FileEntry, HalflifeError};
use halflife_lifecycle::DiffSource;
use tracing::debug;

/// Branches tried, in order, when none is configured.
const DEFAULT_BRANCHES: [&str; 2] = ["main", "master"];

/// A repository opened on one branch.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use halflife_git::GitSource;
/// use halflife_lifecycle::DiffSource;
///
/// let source = GitSource::open(Path::new("."), None).unwrap();
/// for commit in source.commits().unwrap() {
///     println!("{} {}", commit.short_id(), commit.timestamp);
/// }
/// ```
pub struct GitSource {
    repo: Repository,
    branch: String,
    tip: Oid,
}

impl GitSource {
    /// Open the repository at `path` and resolve the branch to replay.
    ///
    /// With `branch` set only that name is tried; otherwise `main`, then
    /// `master`.
    ///
    /// # Errors
    ///
    /// Returns [`HalflifeError::Git`] if the repository cannot be opened, or
    /// [`HalflifeError::BranchNotFound`] if no candidate branch exists.
    pub fn open(path: &Path, branch: Option<&str>) -> Result<Self, HalflifeError> {
        let repo = Repository::open(path)
            .map_err(|e| HalflifeError::Git(format!("failed to open repository: {e}")))?;

        let candidates: Vec<&str> = match branch {
            Some(name) => vec![name],
            None => DEFAULT_BRANCHES.to_vec(),
        };

        let mut resolved = None;
        for name in &candidates {
            if let Some(oid) = branch_tip(&repo, name) {
                resolved = Some((name.to_string(), oid));
                break;
            }
        }

        let Some((branch, tip)) = resolved else {
            return Err(HalflifeError::BranchNotFound {
                tried: candidates.iter().map(|s| s.to_string()).collect(),
            });
        };

        debug!(branch = %branch, tip = %tip, "resolved branch");
        Ok(Self { repo, branch, tip })
    }

    /// Name of the branch being replayed.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn tree_of(&self, commit: &CommitMeta) -> Result<git2::Tree<'_>, HalflifeError> {
        let oid = Oid::from_str(&commit.id)
            .map_err(|e| HalflifeError::Git(format!("invalid commit id '{}': {e}", commit.id)))?;
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|e| HalflifeError::Git(format!("failed to find commit: {e}")))?;
        commit
            .tree()
            .map_err(|e| HalflifeError::Git(format!("failed to get commit tree: {e}")))
    }
}

fn branch_tip(repo: &Repository, name: &str) -> Option<Oid> {
    repo.find_branch(name, BranchType::Local)
        .ok()
        .and_then(|b| b.get().target())
}

impl DiffSource for GitSource {
    fn commits(&self) -> Result<Vec<CommitMeta>, HalflifeError> {
        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| HalflifeError::Git(format!("failed to create revwalk: {e}")))?;

        revwalk
            .set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)
            .map_err(|e| HalflifeError::Git(format!("failed to set revwalk order: {e}")))?;
        revwalk
            .simplify_first_parent()
            .map_err(|e| HalflifeError::Git(format!("failed to simplify revwalk: {e}")))?;
        revwalk
            .push(self.tip)
            .map_err(|e| HalflifeError::Git(format!("failed to push oid: {e}")))?;

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result.map_err(|e| HalflifeError::Git(format!("revwalk error: {e}")))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| HalflifeError::Git(format!("failed to find commit: {e}")))?;
            commits.push(CommitMeta::new(oid.to_string(), commit.author().when().seconds()));
        }

        debug!(branch = %self.branch, commits = commits.len(), "walked history");
        Ok(commits)
    }

    fn diff(
        &self,
        parent: &CommitMeta,
        commit: &CommitMeta,
    ) -> Result<Vec<FileDiff>, HalflifeError> {
        let old_tree = self.tree_of(parent)?;
        let new_tree = self.tree_of(commit)?;

        let mut diff_opts = DiffOptions::new();
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut diff_opts))
            .map_err(|e| HalflifeError::Git(format!("failed to compute diff: {e}")))?;

        let mut files = Vec::new();
        for idx in 0..diff.deltas().len() {
            let patch = Patch::from_diff(&diff, idx)
                .map_err(|e| HalflifeError::Git(format!("failed to build patch: {e}")))?;
            // None for binary or unchanged files.
            let Some(patch) = patch else {
                continue;
            };

            let delta = patch.delta();
            let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) else {
                continue;
            };
            let path = path.to_string_lossy().into_owned();

            let chunks = patch_chunks(&patch)?;
            if !chunks.is_empty() {
                files.push(FileDiff::new(path, chunks));
            }
        }

        Ok(files)
    }

    fn snapshot(&self, commit: &CommitMeta) -> Result<Vec<FileEntry>, HalflifeError> {
        let tree = self.tree_of(commit)?;

        let mut blobs = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    blobs.push((format!("{dir}{name}"), entry.id()));
                }
            }
            git2::TreeWalkResult::Ok
        })
        .map_err(|e| HalflifeError::Git(format!("failed to walk tree: {e}")))?;

        let mut files = Vec::with_capacity(blobs.len());
        for (path, oid) in blobs {
            let blob = self
                .repo
                .find_blob(oid)
                .map_err(|e| HalflifeError::Git(format!("failed to read blob {path}: {e}")))?;
            if blob.is_binary() {
                continue;
            }
            files.push(FileEntry::new(
                path,
                String::from_utf8_lossy(blob.content()).into_owned(),
            ));
        }

        Ok(files)
    }
}

/// Group a patch's lines into runs of one kind. A run never spans two hunks.
fn patch_chunks(patch: &Patch<'_>) -> Result<Vec<DiffChunk>, HalflifeError> {
    let mut chunks: Vec<DiffChunk> = Vec::new();

    for hunk_idx in 0..patch.num_hunks() {
        let lines = patch
            .num_lines_in_hunk(hunk_idx)
            .map_err(|e| HalflifeError::Git(format!("failed to read hunk: {e}")))?;
        let mut current: Option<DiffChunk> = None;

        for line_idx in 0..lines {
            let line = patch
                .line_in_hunk(hunk_idx, line_idx)
                .map_err(|e| HalflifeError::Git(format!("failed to read diff line: {e}")))?;
            // EOF-newline markers carry no content.
            let Some(kind) = ChunkKind::from_origin(line.origin()) else {
                continue;
            };

            let text = String::from_utf8_lossy(line.content());
            let text = text.strip_suffix('\n').unwrap_or(&text).to_string();

            match current.as_mut() {
                Some(chunk) if chunk.kind == kind => chunk.lines.push(text),
                _ => {
                    chunks.extend(current.take());
                    current = Some(DiffChunk::new(kind, [text]));
                }
            }
        }
        chunks.extend(current);
    }

    Ok(chunks)
}
