//! The lifecycle tracker: replays commits in order and keeps one
//! [`LineRecord`] per line identity.
//!
//! The tracker is the explicit accumulator for the whole replay. Running
//! counters (records, deletions, edit sizes) live on it rather than in
//! ambient state, so a synthetic commit sequence is enough to drive it.

use std::collections::{HashMap, HashSet};

use halflife_core::{
    ChunkKind, CommitMeta, FileDiff, FileEntry, HalflifeError, ModificationPolicy,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identity::{ContentIdentity, IdentityResolver, LineKey};
use crate::record::{EventKind, LineRecord};
use crate::validation::TimelineEvent;

/// History-level counters accumulated while replaying.
///
/// # Examples
///
/// ```
/// use halflife_lifecycle::tracker::HistoryTally;
///
/// let tally = HistoryTally { total_edit_size: 30, edit_count: 4, ..Default::default() };
/// assert_eq!(tally.average_edit_size(), 7.5);
/// assert_eq!(HistoryTally::default().average_edit_size(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTally {
    /// Commits applied to the tracker.
    pub commits_applied: usize,
    /// Timestamp of the first applied commit.
    pub first_commit: Option<i64>,
    /// Timestamp of the last applied commit.
    pub last_commit: Option<i64>,
    /// Sum of the byte sizes of every added or deleted chunk.
    pub total_edit_size: usize,
    /// Number of added or deleted chunks.
    pub edit_count: usize,
}

impl HistoryTally {
    /// Mean chunk size in bytes; zero when nothing was edited.
    pub fn average_edit_size(&self) -> f64 {
        if self.edit_count == 0 {
            0.0
        } else {
            self.total_edit_size as f64 / self.edit_count as f64
        }
    }
}

/// Replays commits and maintains the identity → record map.
///
/// Commits must arrive in non-decreasing timestamp order; an older commit is
/// rejected with [`HalflifeError::OutOfOrder`] and leaves the state untouched.
///
/// # Examples
///
/// ```
/// use halflife_core::{ChunkKind, CommitMeta, DiffChunk, FileDiff, FileEntry};
/// use halflife_lifecycle::tracker::Tracker;
///
/// let mut tracker = Tracker::default();
/// let first = CommitMeta::new("c1", 0);
/// tracker.apply_snapshot(&first, &[FileEntry::new("a.go", "x\ny\n")]).unwrap();
///
/// let second = CommitMeta::new("c2", 86_400);
/// let diff = FileDiff::new("a.go", vec![DiffChunk::new(ChunkKind::Deleted, ["x"])]);
/// tracker.apply_diff(&second, &[diff]).unwrap();
///
/// assert_eq!(tracker.records().len(), 2);
/// assert_eq!(tracker.deleted_count(), 1);
/// assert_eq!(tracker.open_count(), 1);
/// ```
#[derive(Debug)]
pub struct Tracker<R = ContentIdentity> {
    resolver: R,
    policy: ModificationPolicy,
    records: Vec<LineRecord>,
    open: HashMap<LineKey, usize>,
    deleted: usize,
    tally: HistoryTally,
    timeline: Option<Vec<TimelineEvent>>,
}

impl Tracker<ContentIdentity> {
    pub fn new(policy: ModificationPolicy) -> Self {
        Self::with_resolver(ContentIdentity, policy)
    }
}

impl Default for Tracker<ContentIdentity> {
    fn default() -> Self {
        Self::new(ModificationPolicy::default())
    }
}

/// A deleted line paired with the added line that replaced it.
struct Replacement {
    old: (usize, usize),
    new: (usize, usize),
    old_key: LineKey,
    new_key: LineKey,
}

impl<R: IdentityResolver> Tracker<R> {
    pub fn with_resolver(resolver: R, policy: ModificationPolicy) -> Self {
        Self {
            resolver,
            policy,
            records: Vec::new(),
            open: HashMap::new(),
            deleted: 0,
            tally: HistoryTally::default(),
            timeline: None,
        }
    }

    /// Record a [`TimelineEvent`] for every lifecycle event from now on.
    pub fn with_timeline(mut self) -> Self {
        self.timeline = Some(Vec::new());
        self
    }

    /// Every record ever created, in creation order.
    pub fn records(&self) -> &[LineRecord] {
        &self.records
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted
    }

    pub fn tally(&self) -> HistoryTally {
        self.tally
    }

    pub fn timeline(&self) -> &[TimelineEvent] {
        self.timeline.as_deref().unwrap_or(&[])
    }

    /// The open record for `line` in `path`, if one exists.
    pub fn find_open(&self, path: &str, line: &str) -> Option<&LineRecord> {
        let key = self.resolver.resolve(path, line)?;
        self.open.get(&key).map(|&idx| &self.records[idx])
    }

    /// Seed the tracker from the first commit's full tree: every non-blank
    /// line is created at that commit.
    ///
    /// # Errors
    ///
    /// Returns [`HalflifeError::OutOfOrder`] if `commit` predates the last
    /// applied commit.
    pub fn apply_snapshot(
        &mut self,
        commit: &CommitMeta,
        files: &[FileEntry],
    ) -> Result<(), HalflifeError> {
        self.begin(commit)?;
        for file in files {
            for line in file.lines() {
                if let Some(key) = self.resolver.resolve(&file.path, line) {
                    self.observe_added(key, commit);
                }
            }
        }
        debug!(
            commit = %commit.short_id(),
            files = files.len(),
            records = self.records.len(),
            "applied tree snapshot"
        );
        Ok(())
    }

    /// Apply one commit's file diffs.
    ///
    /// Within each file, added lines are processed first, then deleted lines,
    /// then unchanged context lines (and, under
    /// [`ModificationPolicy::InPlace`], paired replacements).
    ///
    /// # Errors
    ///
    /// Returns [`HalflifeError::OutOfOrder`] if `commit` predates the last
    /// applied commit.
    pub fn apply_diff(
        &mut self,
        commit: &CommitMeta,
        diffs: &[FileDiff],
    ) -> Result<(), HalflifeError> {
        self.begin(commit)?;
        for diff in diffs {
            self.apply_file(commit, diff);
        }
        debug!(
            commit = %commit.short_id(),
            files = diffs.len(),
            open = self.open.len(),
            deleted = self.deleted,
            "applied diff"
        );
        Ok(())
    }

    fn begin(&mut self, commit: &CommitMeta) -> Result<(), HalflifeError> {
        if let Some(previous) = self.tally.last_commit {
            if commit.timestamp < previous {
                return Err(HalflifeError::OutOfOrder {
                    commit: commit.id.clone(),
                    timestamp: commit.timestamp,
                    previous,
                });
            }
        }
        self.tally.commits_applied += 1;
        self.tally.first_commit.get_or_insert(commit.timestamp);
        self.tally.last_commit = Some(commit.timestamp);
        Ok(())
    }

    fn apply_file(&mut self, commit: &CommitMeta, diff: &FileDiff) {
        for chunk in diff.chunks.iter().filter(|c| c.kind != ChunkKind::Unchanged) {
            self.tally.total_edit_size += chunk.edit_size();
            self.tally.edit_count += 1;
        }

        let replacements = match self.policy {
            ModificationPolicy::Replace => Vec::new(),
            ModificationPolicy::InPlace => self.replacements(diff),
        };
        let paired: HashSet<(usize, usize)> = replacements
            .iter()
            .flat_map(|r| [r.old, r.new])
            .collect();

        for kind in [ChunkKind::Added, ChunkKind::Deleted] {
            for (ci, chunk) in diff.chunks.iter().enumerate() {
                if chunk.kind != kind {
                    continue;
                }
                for (li, line) in chunk.lines.iter().enumerate() {
                    if paired.contains(&(ci, li)) {
                        continue;
                    }
                    let Some(key) = self.resolver.resolve(&diff.path, line) else {
                        continue;
                    };
                    if kind == ChunkKind::Added {
                        self.observe_added(key, commit);
                    } else {
                        self.observe_deleted(&key, commit);
                    }
                }
            }
        }

        for replacement in replacements {
            self.observe_replaced(replacement.old_key, replacement.new_key, commit);
        }

        for chunk in diff.chunks.iter().filter(|c| c.kind == ChunkKind::Unchanged) {
            for line in &chunk.lines {
                if let Some(key) = self.resolver.resolve(&diff.path, line) {
                    if let Some(&idx) = self.open.get(&key) {
                        self.records[idx].touch(commit.timestamp);
                    }
                }
            }
        }
    }

    /// Pair each deleted run that is directly followed by an added run,
    /// line by line. Pairs involving a blank line are left unpaired.
    fn replacements(&self, diff: &FileDiff) -> Vec<Replacement> {
        let mut pairs = Vec::new();
        for (ci, window) in diff.chunks.windows(2).enumerate() {
            let (old, new) = (&window[0], &window[1]);
            if old.kind != ChunkKind::Deleted || new.kind != ChunkKind::Added {
                continue;
            }
            for (li, (old_line, new_line)) in old.lines.iter().zip(&new.lines).enumerate() {
                let old_key = self.resolver.resolve(&diff.path, old_line);
                let new_key = self.resolver.resolve(&diff.path, new_line);
                if let (Some(old_key), Some(new_key)) = (old_key, new_key) {
                    pairs.push(Replacement {
                        old: (ci, li),
                        new: (ci + 1, li),
                        old_key,
                        new_key,
                    });
                }
            }
        }
        pairs
    }

    fn observe_added(&mut self, key: LineKey, commit: &CommitMeta) {
        if let Some(&idx) = self.open.get(&key) {
            self.records[idx].touch(commit.timestamp);
            return;
        }
        let idx = self.records.len();
        self.records
            .push(LineRecord::created(key.clone(), commit.timestamp, &commit.id));
        self.open.insert(key, idx);
        self.push_event(commit, EventKind::Created, idx);
    }

    fn observe_deleted(&mut self, key: &LineKey, commit: &CommitMeta) {
        let Some(idx) = self.open.remove(key) else {
            return;
        };
        self.records[idx].close(commit.timestamp, &commit.id);
        self.deleted += 1;
        self.push_event(commit, EventKind::Deleted, idx);
    }

    fn observe_replaced(&mut self, old_key: LineKey, new_key: LineKey, commit: &CommitMeta) {
        let Some(&idx) = self.open.get(&old_key) else {
            self.observe_added(new_key, commit);
            return;
        };
        if old_key == new_key {
            self.records[idx].touch(commit.timestamp);
            return;
        }
        if self.open.contains_key(&new_key) {
            // The new text already has an open identity; the old line is gone.
            self.observe_deleted(&old_key, commit);
            self.observe_added(new_key, commit);
            return;
        }
        self.open.remove(&old_key);
        let record = &mut self.records[idx];
        record.modify(commit.timestamp, &commit.id, new_key.content());
        record.key = new_key.clone();
        self.open.insert(new_key, idx);
        self.push_event(commit, EventKind::Modified, idx);
    }

    fn push_event(&mut self, commit: &CommitMeta, kind: EventKind, idx: usize) {
        let Some(timeline) = self.timeline.as_mut() else {
            return;
        };
        let record = &self.records[idx];
        timeline.push(TimelineEvent {
            timestamp: commit.timestamp,
            commit_id: commit.id.clone(),
            kind,
            file: record.file.clone(),
            line: record.current_content().to_string(),
            running_line_count: self.records.len(),
            running_deleted_count: self.deleted,
        });
    }
}
