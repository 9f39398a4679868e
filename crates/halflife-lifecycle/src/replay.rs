//! History replay: pull commits from a [`DiffSource`], filter paths, and feed
//! the tracker one commit at a time.
//!
//! A commit whose tree or diff cannot be read is skipped and reported as a
//! [`CommitSkip`]; the replay carries on with the next commit.

use halflife_core::{CommitMeta, FileDiff, FileEntry, HalflifeError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::filter::PathFilter;
use crate::identity::{ContentIdentity, IdentityResolver};
use crate::tracker::Tracker;

/// Supplies a linear history and per-commit changes.
pub trait DiffSource {
    /// Commits on the replayed branch, oldest first.
    ///
    /// # Errors
    ///
    /// Fails when the history cannot be enumerated at all; the replay aborts.
    fn commits(&self) -> Result<Vec<CommitMeta>, HalflifeError>;

    /// Changes `commit` made relative to `parent`, the previous commit in the
    /// linearized history.
    fn diff(&self, parent: &CommitMeta, commit: &CommitMeta)
        -> Result<Vec<FileDiff>, HalflifeError>;

    /// Every file in `commit`'s tree; used for the first commit only.
    fn snapshot(&self, commit: &CommitMeta) -> Result<Vec<FileEntry>, HalflifeError>;
}

/// A commit left out of the replay, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSkip {
    pub commit_id: String,
    pub timestamp: i64,
    pub reason: String,
}

impl CommitSkip {
    /// First seven characters of the commit id.
    pub fn short_id(&self) -> &str {
        &self.commit_id[..self.commit_id.len().min(7)]
    }
}

/// Outcome of a replay: the final tracker state plus skip diagnostics.
#[derive(Debug)]
pub struct Replay<R = ContentIdentity> {
    pub tracker: Tracker<R>,
    pub skipped: Vec<CommitSkip>,
    /// Commits the source reported, skipped ones included.
    pub commits_seen: usize,
}

/// Replay `source` into `tracker`.
///
/// Commits are stably sorted by timestamp first, so a source that hands back
/// slightly out-of-order author dates still replays in non-decreasing order.
/// `on_commit` is called after each commit with its 1-based position and the
/// total.
///
/// # Errors
///
/// Only a failure to list commits is fatal. Per-commit failures end up in
/// [`Replay::skipped`].
///
/// # Examples
///
/// ```
/// use halflife_core::{ChunkKind, CommitMeta, DiffChunk, FileDiff, FileEntry, HalflifeError};
/// use halflife_lifecycle::{replay_history, DiffSource, PathFilter, Tracker};
///
/// struct OneCommit;
///
/// impl DiffSource for OneCommit {
///     fn commits(&self) -> Result<Vec<CommitMeta>, HalflifeError> {
///         Ok(vec![CommitMeta::new("c1", 0)])
///     }
///     fn diff(&self, _: &CommitMeta, _: &CommitMeta) -> Result<Vec<FileDiff>, HalflifeError> {
///         Ok(Vec::new())
///     }
///     fn snapshot(&self, _: &CommitMeta) -> Result<Vec<FileEntry>, HalflifeError> {
///         Ok(vec![FileEntry::new("a.rs", "fn a() {}\n")])
///     }
/// }
///
/// let replay = replay_history(&OneCommit, &PathFilter::all(), Tracker::default(), |_, _| {}).unwrap();
/// assert_eq!(replay.tracker.records().len(), 1);
/// assert!(replay.skipped.is_empty());
/// ```
pub fn replay_history<S, R>(
    source: &S,
    filter: &PathFilter,
    mut tracker: Tracker<R>,
    mut on_commit: impl FnMut(usize, usize),
) -> Result<Replay<R>, HalflifeError>
where
    S: DiffSource + ?Sized,
    R: IdentityResolver,
{
    let mut commits = source.commits()?;
    commits.sort_by_key(|c| c.timestamp);

    let total = commits.len();
    let mut skipped = Vec::new();

    for (i, commit) in commits.iter().enumerate() {
        let applied = if i == 0 {
            source.snapshot(commit).and_then(|files| {
                let files: Vec<FileEntry> =
                    files.into_iter().filter(|f| filter.matches(&f.path)).collect();
                tracker.apply_snapshot(commit, &files)
            })
        } else {
            source.diff(&commits[i - 1], commit).and_then(|diffs| {
                let diffs: Vec<FileDiff> =
                    diffs.into_iter().filter(|d| filter.matches(&d.path)).collect();
                tracker.apply_diff(commit, &diffs)
            })
        };

        if let Err(e) = applied {
            warn!(commit = %commit.short_id(), error = %e, "skipping commit");
            skipped.push(CommitSkip {
                commit_id: commit.id.clone(),
                timestamp: commit.timestamp,
                reason: e.to_string(),
            });
        }
        on_commit(i + 1, total);
    }

    info!(
        commits = total,
        skipped = skipped.len(),
        records = tracker.records().len(),
        open = tracker.open_count(),
        "replay complete"
    );

    Ok(Replay {
        tracker,
        skipped,
        commits_seen: total,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use halflife_core::{ChunkKind, DiffChunk};

    use super::*;

    const DAY: i64 = 86_400;

    /// In-memory history: a snapshot for the first commit and diffs keyed by
    /// commit id for the rest. Ids listed in `broken` fail to load.
    #[derive(Default)]
    struct FakeSource {
        commits: Vec<CommitMeta>,
        snapshot: Vec<FileEntry>,
        diffs: HashMap<String, Vec<FileDiff>>,
        broken: HashSet<String>,
    }

    impl FakeSource {
        fn commit(mut self, id: &str, ts: i64, diffs: Vec<FileDiff>) -> Self {
            self.commits.push(CommitMeta::new(id, ts));
            self.diffs.insert(id.to_string(), diffs);
            self
        }
    }

    impl DiffSource for FakeSource {
        fn commits(&self) -> Result<Vec<CommitMeta>, HalflifeError> {
            Ok(self.commits.clone())
        }

        fn diff(
            &self,
            _parent: &CommitMeta,
            commit: &CommitMeta,
        ) -> Result<Vec<FileDiff>, HalflifeError> {
            if self.broken.contains(&commit.id) {
                return Err(HalflifeError::Git(format!("cannot read {}", commit.id)));
            }
            Ok(self.diffs.get(&commit.id).cloned().unwrap_or_default())
        }

        fn snapshot(&self, commit: &CommitMeta) -> Result<Vec<FileEntry>, HalflifeError> {
            if self.broken.contains(&commit.id) {
                return Err(HalflifeError::Git(format!("cannot read {}", commit.id)));
            }
            Ok(self.snapshot.clone())
        }
    }

    fn chunk(kind: ChunkKind, path: &str, lines: &[&str]) -> FileDiff {
        FileDiff::new(path, vec![DiffChunk::new(kind, lines.iter().copied())])
    }

    #[test]
    fn first_commit_uses_snapshot() {
        let source = FakeSource {
            snapshot: vec![FileEntry::new("a.go", "a\nb\n")],
            ..Default::default()
        }
        .commit("c1", 0, Vec::new());

        let replay = replay_history(&source, &PathFilter::all(), Tracker::default(), |_, _| {})
            .unwrap();
        assert_eq!(replay.tracker.records().len(), 2);
        assert_eq!(replay.commits_seen, 1);
    }

    #[test]
    fn broken_commit_is_skipped_and_replay_continues() {
        let mut source = FakeSource {
            snapshot: vec![FileEntry::new("a.go", "x\n")],
            ..Default::default()
        }
        .commit("c1", 0, Vec::new())
        .commit("c2", DAY, vec![chunk(ChunkKind::Added, "a.go", &["y"])])
        .commit("c3", 2 * DAY, vec![chunk(ChunkKind::Deleted, "a.go", &["x"])]);
        source.broken.insert("c2".into());

        let replay = replay_history(&source, &PathFilter::all(), Tracker::default(), |_, _| {})
            .unwrap();

        assert_eq!(replay.skipped.len(), 1);
        assert_eq!(replay.skipped[0].commit_id, "c2");
        assert!(replay.skipped[0].reason.contains("cannot read c2"));
        assert!(replay.tracker.find_open("a.go", "y").is_none());
        assert_eq!(replay.tracker.deleted_count(), 1);
        assert_eq!(replay.tracker.tally().commits_applied, 2);
    }

    #[test]
    fn unreadable_first_tree_leaves_later_diffs_on_an_empty_tracker() {
        let mut source = FakeSource {
            snapshot: vec![FileEntry::new("a.go", "x\n")],
            ..Default::default()
        }
        .commit("c1", 0, Vec::new())
        .commit(
            "c2",
            DAY,
            vec![
                chunk(ChunkKind::Deleted, "a.go", &["x"]),
                chunk(ChunkKind::Added, "a.go", &["y"]),
            ],
        );
        source.broken.insert("c1".into());

        let replay = replay_history(&source, &PathFilter::all(), Tracker::default(), |_, _| {})
            .unwrap();

        assert_eq!(replay.skipped.len(), 1);
        assert_eq!(replay.skipped[0].commit_id, "c1");
        assert_eq!(replay.skipped[0].timestamp, 0);
        assert!(replay.skipped[0].reason.contains("cannot read c1"));

        // x was never tracked, so its deletion is ignored; y starts at c2.
        let records = replay.tracker.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "y");
        assert_eq!(records[0].created_at, DAY);
        assert_eq!(replay.tracker.deleted_count(), 0);

        let tally = replay.tracker.tally();
        assert_eq!(tally.commits_applied, 1);
        assert_eq!(tally.first_commit, Some(DAY));
        assert_eq!(replay.commits_seen, 2);
    }

    #[test]
    fn skip_short_id_truncates_long_hashes() {
        let skip = CommitSkip {
            commit_id: "0123456789abcdef".into(),
            timestamp: 0,
            reason: String::new(),
        };
        assert_eq!(skip.short_id(), "0123456");
    }

    #[test]
    fn filter_applies_to_snapshot_and_diffs() {
        let source = FakeSource {
            snapshot: vec![
                FileEntry::new("main.go", "package main\n"),
                FileEntry::new("README.md", "# title\n"),
            ],
            ..Default::default()
        }
        .commit("c1", 0, Vec::new())
        .commit(
            "c2",
            DAY,
            vec![
                chunk(ChunkKind::Added, "util.go", &["func x() {}"]),
                chunk(ChunkKind::Added, "notes.txt", &["remember"]),
            ],
        );

        let filter = PathFilter::new("*.go", &[]).unwrap();
        let replay = replay_history(&source, &filter, Tracker::default(), |_, _| {}).unwrap();
        let files: Vec<&str> = replay
            .tracker
            .records()
            .iter()
            .map(|r| r.file.as_str())
            .collect();
        assert_eq!(files, vec!["main.go", "util.go"]);
    }

    #[test]
    fn commits_are_replayed_in_timestamp_order() {
        let source = FakeSource {
            snapshot: vec![FileEntry::new("a.go", "x\n")],
            ..Default::default()
        }
        .commit("c1", 0, Vec::new())
        .commit("c3", 5 * DAY, vec![chunk(ChunkKind::Deleted, "a.go", &["x"])])
        .commit("c2", 2 * DAY, vec![chunk(ChunkKind::Added, "a.go", &["y"])]);

        let replay = replay_history(&source, &PathFilter::all(), Tracker::default(), |_, _| {})
            .unwrap();
        assert!(replay.skipped.is_empty());
        let x = &replay.tracker.records()[0];
        assert_eq!(x.deleted_at, Some(5 * DAY));
        assert_eq!(replay.tracker.records()[1].created_at, 2 * DAY);
    }

    #[test]
    fn progress_callback_sees_every_commit() {
        let source = FakeSource::default()
            .commit("c1", 0, Vec::new())
            .commit("c2", DAY, Vec::new())
            .commit("c3", 2 * DAY, Vec::new());
        let mut seen = Vec::new();
        replay_history(&source, &PathFilter::all(), Tracker::default(), |done, total| {
            seen.push((done, total))
        })
        .unwrap();
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn empty_history_replays_nothing() {
        let replay = replay_history(
            &FakeSource::default(),
            &PathFilter::all(),
            Tracker::default(),
            |_, _| {},
        )
        .unwrap();
        assert_eq!(replay.commits_seen, 0);
        assert!(replay.tracker.records().is_empty());
    }
}
