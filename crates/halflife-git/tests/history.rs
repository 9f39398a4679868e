use std::path::Path;

use git2::{Oid, Repository, RepositoryInitOptions, Signature, Time};
use halflife_core::{ChunkKind, HalflifeError};
use halflife_git::GitSource;
use halflife_lifecycle::{run_analysis, AnalysisOptions, DiffSource, PathFilter};
use tempfile::TempDir;

const DAY: i64 = 86_400;
const T0: i64 = 1_700_000_000;
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0, 0, 1, 2];

struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    fn new(branch: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(branch);
        let repo = Repository::init_opts(dir.path(), &opts).unwrap();
        Self { dir, repo }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write (`Some`) or delete (`None`) files and commit at `when`.
    fn commit(&self, changes: &[(&str, Option<&[u8]>)], when: i64) -> Oid {
        let mut index = self.repo.index().unwrap();
        for (name, content) in changes {
            let file = self.dir.path().join(name);
            match content {
                Some(bytes) => {
                    std::fs::write(&file, bytes).unwrap();
                    index.add_path(Path::new(name)).unwrap();
                }
                None => {
                    std::fs::remove_file(&file).unwrap();
                    index.remove_path(Path::new(name)).unwrap();
                }
            }
        }
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();

        let sig = Signature::new("Test User", "test@example.com", &Time::new(when, 0)).unwrap();
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, "change", &tree, &parents)
            .unwrap()
    }
}

fn text(s: &str) -> Option<&[u8]> {
    Some(s.as_bytes())
}

#[test]
fn commits_come_back_oldest_first_with_author_time() {
    let repo = TestRepo::new("main");
    let first = repo.commit(&[("a.go", text("x\n"))], T0);
    let second = repo.commit(&[("a.go", text("x\ny\n"))], T0 + DAY);

    let source = GitSource::open(repo.path(), None).unwrap();
    assert_eq!(source.branch(), "main");

    let commits = source.commits().unwrap();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].id, first.to_string());
    assert_eq!(commits[0].timestamp, T0);
    assert_eq!(commits[1].id, second.to_string());
    assert_eq!(commits[1].timestamp, T0 + DAY);
}

#[test]
fn falls_back_to_master() {
    let repo = TestRepo::new("master");
    repo.commit(&[("a.go", text("x\n"))], T0);

    let source = GitSource::open(repo.path(), None).unwrap();
    assert_eq!(source.branch(), "master");
}

#[test]
fn missing_primary_branch_is_an_error() {
    let repo = TestRepo::new("trunk");
    repo.commit(&[("a.go", text("x\n"))], T0);

    let err = GitSource::open(repo.path(), None).err().unwrap();
    match err {
        HalflifeError::BranchNotFound { tried } => assert_eq!(tried, vec!["main", "master"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn configured_branch_is_used() {
    let repo = TestRepo::new("trunk");
    repo.commit(&[("a.go", text("x\n"))], T0);

    let source = GitSource::open(repo.path(), Some("trunk")).unwrap();
    assert_eq!(source.branch(), "trunk");

    let err = GitSource::open(repo.path(), Some("develop")).err().unwrap();
    assert!(err.to_string().contains("develop"));
}

#[test]
fn non_repository_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let err = GitSource::open(dir.path(), None).err().unwrap();
    assert!(matches!(err, HalflifeError::Git(_)));
    assert!(err.to_string().contains("failed to open repository"));
}

#[test]
fn snapshot_reads_text_files_and_skips_binaries() {
    let repo = TestRepo::new("main");
    std::fs::create_dir(repo.path().join("src")).unwrap();
    repo.commit(
        &[
            ("src/lib.rs", text("pub fn a() {}\n")),
            ("logo.png", Some(PNG)),
        ],
        T0,
    );

    let source = GitSource::open(repo.path(), None).unwrap();
    let commits = source.commits().unwrap();
    let files = source.snapshot(&commits[0]).unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "src/lib.rs");
    assert_eq!(files[0].content, "pub fn a() {}\n");
}

#[test]
fn edited_line_diffs_as_delete_then_add() {
    let repo = TestRepo::new("main");
    repo.commit(&[("a.go", text("one\ntwo\nthree\n"))], T0);
    repo.commit(&[("a.go", text("one\nTWO\nthree\n"))], T0 + DAY);

    let source = GitSource::open(repo.path(), None).unwrap();
    let commits = source.commits().unwrap();
    let diffs = source.diff(&commits[0], &commits[1]).unwrap();

    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].path, "a.go");
    let kinds: Vec<ChunkKind> = diffs[0].chunks.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ChunkKind::Unchanged,
            ChunkKind::Deleted,
            ChunkKind::Added,
            ChunkKind::Unchanged
        ]
    );
    assert_eq!(diffs[0].chunks[1].lines, vec!["two"]);
    assert_eq!(diffs[0].chunks[2].lines, vec!["TWO"]);
}

#[test]
fn removed_file_diffs_under_its_old_path() {
    let repo = TestRepo::new("main");
    repo.commit(&[("a.go", text("x\n")), ("b.go", text("y\nz\n"))], T0);
    repo.commit(&[("b.go", None)], T0 + DAY);

    let source = GitSource::open(repo.path(), None).unwrap();
    let commits = source.commits().unwrap();
    let diffs = source.diff(&commits[0], &commits[1]).unwrap();

    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].path, "b.go");
    assert_eq!(diffs[0].chunks.len(), 1);
    assert_eq!(diffs[0].chunks[0].kind, ChunkKind::Deleted);
    assert_eq!(diffs[0].chunks[0].lines, vec!["y", "z"]);
}

#[test]
fn analysis_over_a_real_repository() {
    let repo = TestRepo::new("main");
    repo.commit(&[("a.go", text("x\ny\n")), ("notes.md", text("todo\n"))], T0);
    repo.commit(&[("a.go", text("y\n"))], T0 + 10 * DAY);
    repo.commit(&[("a.go", text("y\nz\n"))], T0 + 20 * DAY);

    let source = GitSource::open(repo.path(), None).unwrap();
    let filter = PathFilter::new("*.go", &[]).unwrap();
    let options = AnalysisOptions::new(T0 + 30 * DAY);
    let analysis = run_analysis(&source, &filter, &options, |_, _| {}).unwrap();
    let stats = &analysis.stats;

    assert!(analysis.skipped.is_empty());
    assert_eq!(stats.total_tracked, 3);
    assert_eq!(stats.deleted_lines, 1);
    assert_eq!(stats.surviving_lines, 2);
    assert_eq!(stats.median_lifetime, 10.0);
    assert_eq!(stats.commits_processed, 3);
    assert_eq!(stats.first_commit, Some(T0));
    assert_eq!(stats.last_commit, Some(T0 + 20 * DAY));
}
