//! Validation output: a chronological event timeline and a handful of
//! representative records for manual spot-checking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::{EventKind, LineRecord};
use crate::stats::survivor_extremes;

/// One lifecycle event with the running totals at the moment it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub timestamp: i64,
    pub commit_id: String,
    pub kind: EventKind,
    pub file: String,
    pub line: String,
    /// Records created so far, deleted ones included.
    pub running_line_count: usize,
    /// Records deleted so far.
    pub running_deleted_count: usize,
}

/// Material for checking the statistics by hand.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// `oldest`, `newest`, and `sample_N` entries.
    pub samples: BTreeMap<String, LineRecord>,
    pub timeline: Vec<TimelineEvent>,
}

/// Pick representative records: the oldest and newest survivors, plus
/// `count` evenly spaced survivors when there are more than `count` of them.
///
/// # Examples
///
/// ```
/// use halflife_lifecycle::identity::LineKey;
/// use halflife_lifecycle::record::LineRecord;
/// use halflife_lifecycle::validation::select_samples;
///
/// let records = vec![
///     LineRecord::created(LineKey::new("a.rs", "old"), 0, "c1"),
///     LineRecord::created(LineKey::new("a.rs", "new"), 500, "c2"),
/// ];
/// let samples = select_samples(&records, 1_000, 5);
/// assert_eq!(samples["oldest"].content, "old");
/// assert_eq!(samples["newest"].content, "new");
/// assert!(!samples.contains_key("sample_0"));
/// ```
pub fn select_samples(
    records: &[LineRecord],
    now: i64,
    count: usize,
) -> BTreeMap<String, LineRecord> {
    let mut samples = BTreeMap::new();

    let (oldest, newest) = survivor_extremes(records, now);
    if let Some(record) = oldest {
        samples.insert("oldest".to_string(), record.clone());
    }
    if let Some(record) = newest {
        samples.insert("newest".to_string(), record.clone());
    }

    let survivors: Vec<&LineRecord> = records.iter().filter(|r| r.is_alive()).collect();
    if count > 0 && survivors.len() > count {
        for i in 0..count {
            let idx = i * survivors.len() / count;
            samples.insert(format!("sample_{i}"), survivors[idx].clone());
        }
    }

    samples
}
