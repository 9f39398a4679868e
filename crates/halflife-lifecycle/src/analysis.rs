//! End-to-end analysis: replay a history and summarize it.

use halflife_core::{HalflifeConfig, HalflifeError, ModificationPolicy};
use serde::Serialize;

use crate::filter::PathFilter;
use crate::replay::{replay_history, CommitSkip, DiffSource};
use crate::stats::{AggregateStats, StatsOptions};
use crate::tracker::Tracker;
use crate::validation::{select_samples, ValidationReport};

/// Knobs for a single analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub policy: ModificationPolicy,
    pub time_points: usize,
    /// Unix timestamp surviving lines are aged against.
    pub now: i64,
    /// Collect a timeline and representative samples.
    pub validate: bool,
    pub sample_count: usize,
}

impl AnalysisOptions {
    pub fn new(now: i64) -> Self {
        Self::from_config(&HalflifeConfig::default(), now)
    }

    pub fn from_config(config: &HalflifeConfig, now: i64) -> Self {
        Self {
            policy: config.analysis.modification_policy,
            time_points: config.analysis.time_points,
            now,
            validate: false,
            sample_count: config.validation.sample_count,
        }
    }
}

/// Result of [`run_analysis`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub stats: AggregateStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<CommitSkip>,
    #[serde(skip)]
    pub commits_seen: usize,
}

/// Replay `source` through `filter` and compute survival statistics.
///
/// # Errors
///
/// Fails when the source cannot list its commits, or with
/// [`HalflifeError::NoLifetimes`] when nothing with a positive lifetime was
/// tracked.
pub fn run_analysis<S>(
    source: &S,
    filter: &PathFilter,
    options: &AnalysisOptions,
    on_commit: impl FnMut(usize, usize),
) -> Result<Analysis, HalflifeError>
where
    S: DiffSource + ?Sized,
{
    let mut tracker = Tracker::new(options.policy);
    if options.validate {
        tracker = tracker.with_timeline();
    }

    let replay = replay_history(source, filter, tracker, on_commit)?;
    let tracker = replay.tracker;

    let stats = AggregateStats::compute(
        tracker.records(),
        &tracker.tally(),
        &StatsOptions {
            time_points: options.time_points,
            now: options.now,
        },
    )?;

    let validation = options.validate.then(|| ValidationReport {
        samples: select_samples(tracker.records(), options.now, options.sample_count),
        timeline: tracker.timeline().to_vec(),
    });

    Ok(Analysis {
        stats,
        validation,
        skipped: replay.skipped,
        commits_seen: replay.commits_seen,
    })
}
