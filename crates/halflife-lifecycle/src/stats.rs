//! Survival statistics over the final set of lifecycle records.
//!
//! Each record contributes one lifetime: deletion time minus creation time,
//! or "now" minus creation time while the line survives. Lifetimes that are
//! not strictly positive are left out of the sample (they still count as
//! tracked lines).

use halflife_core::HalflifeError;
use serde::{Deserialize, Serialize};

use crate::record::{EventKind, LineRecord};
use crate::tracker::HistoryTally;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Inputs to [`AggregateStats::compute`] that are not part of the history.
///
/// # Examples
///
/// ```
/// use halflife_lifecycle::stats::StatsOptions;
///
/// let opts = StatsOptions::new(1_700_000_000);
/// assert_eq!(opts.time_points, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsOptions {
    /// Number of evenly spaced survival-curve samples.
    pub time_points: usize,
    /// Unix timestamp that surviving lines are aged against.
    pub now: i64,
}

impl StatsOptions {
    pub fn new(now: i64) -> Self {
        Self {
            time_points: 100,
            now,
        }
    }
}

/// One sampled point of the survival curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivalPoint {
    pub age_days: f64,
    /// Fraction of the sample with a lifetime of at least `age_days`.
    pub surviving: f64,
}

/// Lifecycle event counts across all records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFrequency {
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl ChangeFrequency {
    fn add(&mut self, kind: EventKind) {
        match kind {
            EventKind::Created => self.created += 1,
            EventKind::Modified => self.modified += 1,
            EventKind::Deleted => self.deleted += 1,
        }
    }
}

/// Population statistics derived from a completed replay.
///
/// All durations are in days.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub half_life: f64,
    /// `false` when the curve never reached 0.5 and the median was used.
    pub half_life_from_curve: bool,
    pub mean_lifetime: f64,
    pub median_lifetime: f64,
    /// Population standard deviation.
    pub std_dev_lifetime: f64,
    pub survival_curve: Vec<SurvivalPoint>,
    pub change_frequency: ChangeFrequency,
    pub total_tracked: usize,
    pub surviving_lines: usize,
    pub deleted_lines: usize,
    /// Records with at least one event after creation.
    pub lines_with_changes: usize,
    /// Number of positive lifetimes in the sample.
    pub sample_size: usize,
    /// Age of the oldest surviving line.
    pub oldest_age: Option<f64>,
    /// Age of the newest surviving line.
    pub newest_age: Option<f64>,
    pub oldest_line: Option<String>,
    pub newest_line: Option<String>,
    /// Mean byte size of added/deleted chunks.
    pub average_edit_size: f64,
    pub first_commit: Option<i64>,
    pub last_commit: Option<i64>,
    pub commits_processed: usize,
    /// The "now" lifetimes were measured against.
    pub measured_at: i64,
    /// Sorted lifetime sample.
    #[serde(skip)]
    pub lifetimes: Vec<f64>,
}

impl AggregateStats {
    /// Compute statistics for `records`.
    ///
    /// # Errors
    ///
    /// Returns [`HalflifeError::NoLifetimes`] when no record has a positive
    /// lifetime.
    ///
    /// # Examples
    ///
    /// ```
    /// use halflife_lifecycle::identity::LineKey;
    /// use halflife_lifecycle::record::LineRecord;
    /// use halflife_lifecycle::stats::{AggregateStats, StatsOptions};
    /// use halflife_lifecycle::tracker::HistoryTally;
    ///
    /// const DAY: i64 = 86_400;
    /// let mut gone = LineRecord::created(LineKey::new("a.rs", "x"), 0, "c1");
    /// gone.close(10 * DAY, "c2");
    /// let kept = LineRecord::created(LineKey::new("a.rs", "y"), 0, "c1");
    ///
    /// let stats = AggregateStats::compute(
    ///     &[gone, kept],
    ///     &HistoryTally::default(),
    ///     &StatsOptions::new(30 * DAY),
    /// )
    /// .unwrap();
    /// assert_eq!(stats.mean_lifetime, 20.0);
    /// assert_eq!(stats.median_lifetime, 20.0);
    /// assert_eq!(stats.deleted_lines, 1);
    /// ```
    pub fn compute(
        records: &[LineRecord],
        tally: &HistoryTally,
        options: &StatsOptions,
    ) -> Result<Self, HalflifeError> {
        let mut lifetimes: Vec<f64> = records
            .iter()
            .map(|r| r.lifetime_seconds(options.now) as f64 / SECONDS_PER_DAY)
            .filter(|&days| days > 0.0)
            .collect();

        if lifetimes.is_empty() {
            return Err(HalflifeError::NoLifetimes);
        }
        lifetimes.sort_by(f64::total_cmp);

        let mean = mean(&lifetimes);
        let std_dev = population_std_dev(&lifetimes, mean);
        let median = median(&lifetimes);
        let survival_curve = survival_curve(&lifetimes, options.time_points);
        let crossing = survival_curve
            .iter()
            .find(|p| p.surviving <= 0.5)
            .map(|p| p.age_days);

        let mut change_frequency = ChangeFrequency::default();
        for event in records.iter().flat_map(|r| &r.events) {
            change_frequency.add(event.kind);
        }

        let surviving_lines = records.iter().filter(|r| r.is_alive()).count();
        let (oldest, newest) = survivor_extremes(records, options.now);
        let age_of = |r: &LineRecord| r.lifetime_seconds(options.now) as f64 / SECONDS_PER_DAY;

        Ok(Self {
            half_life: crossing.unwrap_or(median),
            half_life_from_curve: crossing.is_some(),
            mean_lifetime: mean,
            median_lifetime: median,
            std_dev_lifetime: std_dev,
            survival_curve,
            change_frequency,
            total_tracked: records.len(),
            surviving_lines,
            deleted_lines: records.len() - surviving_lines,
            lines_with_changes: records.iter().filter(|r| r.events.len() > 1).count(),
            sample_size: lifetimes.len(),
            oldest_age: oldest.map(age_of),
            newest_age: newest.map(age_of),
            oldest_line: oldest.map(|r| r.current_content().to_string()),
            newest_line: newest.map(|r| r.current_content().to_string()),
            average_edit_size: tally.average_edit_size(),
            first_commit: tally.first_commit,
            last_commit: tally.last_commit,
            commits_processed: tally.commits_applied,
            measured_at: options.now,
            lifetimes,
        })
    }

    /// Fraction of tracked lines still alive.
    pub fn surviving_ratio(&self) -> f64 {
        ratio(self.surviving_lines, self.total_tracked)
    }

    /// Fraction of tracked lines that were deleted.
    pub fn deleted_ratio(&self) -> f64 {
        ratio(self.deleted_lines, self.total_tracked)
    }

    /// Days between the first and last processed commits.
    pub fn history_span_days(&self) -> f64 {
        match (self.first_commit, self.last_commit) {
            (Some(first), Some(last)) => (last - first) as f64 / SECONDS_PER_DAY,
            _ => 0.0,
        }
    }
}

/// Oldest and newest surviving records with a positive age.
pub(crate) fn survivor_extremes(
    records: &[LineRecord],
    now: i64,
) -> (Option<&LineRecord>, Option<&LineRecord>) {
    let mut oldest: Option<(&LineRecord, i64)> = None;
    let mut newest: Option<(&LineRecord, i64)> = None;

    for record in records.iter().filter(|r| r.is_alive()) {
        let age = record.lifetime_seconds(now);
        if age <= 0 {
            continue;
        }
        if oldest.map_or(true, |(_, a)| age > a) {
            oldest = Some((record, age));
        }
        if newest.map_or(true, |(_, a)| age < a) {
            newest = Some((record, age));
        }
    }

    (oldest.map(|(r, _)| r), newest.map(|(r, _)| r))
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn mean(sorted: &[f64]) -> f64 {
    sorted.iter().sum::<f64>() / sorted.len() as f64
}

fn population_std_dev(sample: &[f64], mean: f64) -> f64 {
    let variance = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / sample.len() as f64;
    variance.sqrt()
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample `time_points` ages `max * i / time_points` for `i` in `0..time_points`.
fn survival_curve(sorted: &[f64], time_points: usize) -> Vec<SurvivalPoint> {
    let max_age = sorted.last().copied().unwrap_or(0.0);
    let n = sorted.len() as f64;
    (0..time_points)
        .map(|i| {
            let age = max_age * i as f64 / time_points as f64;
            let dead = sorted.partition_point(|&lifetime| lifetime < age);
            SurvivalPoint {
                age_days: age,
                surviving: (sorted.len() - dead) as f64 / n,
            }
        })
        .collect()
}
