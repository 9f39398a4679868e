//! Report rendering for `halflife analyze`.

use std::fmt;

use chrono::DateTime;
use halflife_lifecycle::{AggregateStats, Analysis, LineRecord, SurvivalPoint, TimelineEvent};

const SECONDS_PER_DAY: f64 = 86_400.0;
const CURVE_SUMMARY_POINTS: usize = 5;

/// `YYYY-MM-DD` in UTC.
pub fn format_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".into())
}

fn format_optional_date(timestamp: Option<i64>) -> String {
    timestamp.map_or_else(|| "n/a".into(), format_date)
}

/// Evenly spaced points from the survival curve, always starting at age zero.
pub fn curve_summary(curve: &[SurvivalPoint]) -> Vec<SurvivalPoint> {
    let step = (curve.len() / CURVE_SUMMARY_POINTS).max(1);
    curve
        .iter()
        .step_by(step)
        .take(CURVE_SUMMARY_POINTS)
        .copied()
        .collect()
}

/// Indices of the timeline events to print: the first `n`, then the last `n`
/// without overlapping the first run. The flag is set when events were left out.
pub fn timeline_preview(len: usize, n: usize) -> (Vec<usize>, bool) {
    let head = 0..n.min(len);
    let tail = n.max(len.saturating_sub(n))..len;
    (head.chain(tail).collect(), len > 2 * n)
}

/// An [`Analysis`] ready for printing.
///
/// `Display` renders the plain-text report; [`Report::to_markdown`] renders
/// GitHub-flavored Markdown. `preview` is how many timeline events are shown
/// from each end.
pub struct Report<'a> {
    analysis: &'a Analysis,
    preview: usize,
}

impl<'a> Report<'a> {
    pub fn new(analysis: &'a Analysis, preview: usize) -> Self {
        Self { analysis, preview }
    }

    pub fn to_markdown(&self) -> String {
        Markdown(self).to_string()
    }

    fn age_days(&self, record: &LineRecord) -> f64 {
        record.lifetime_seconds(self.analysis.stats.measured_at) as f64 / SECONDS_PER_DAY
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.analysis.stats;
        let freq = &stats.change_frequency;

        writeln!(f, "Code Half-Life Analysis Report")?;
        writeln!(f, "==============================")?;
        writeln!(f)?;
        writeln!(f, "Summary Statistics:")?;
        writeln!(f, "-------------------")?;
        writeln!(
            f,
            "- Code Half-Life: {:.1} days{}",
            stats.half_life,
            if stats.half_life_from_curve {
                ""
            } else {
                " (median; survival never fell to 50%)"
            }
        )?;
        writeln!(f, "- Median Lifetime: {:.1} days", stats.median_lifetime)?;
        writeln!(f, "- Mean Lifetime: {:.1} days", stats.mean_lifetime)?;
        writeln!(f, "- Std Deviation: {:.1} days", stats.std_dev_lifetime)?;
        writeln!(f, "- Total Lines Analyzed: {}", stats.total_tracked)?;
        writeln!(
            f,
            "- Currently Surviving: {} ({:.1}%)",
            stats.surviving_lines,
            stats.surviving_ratio() * 100.0
        )?;
        writeln!(
            f,
            "- Deleted: {} ({:.1}%)",
            stats.deleted_lines,
            stats.deleted_ratio() * 100.0
        )?;
        writeln!(f, "- Lines With Changes: {}", stats.lines_with_changes)?;
        writeln!(f, "- Average Edit Size: {:.1} bytes", stats.average_edit_size)?;
        writeln!(
            f,
            "- Change Frequency: {} created, {} modified, {} deleted",
            freq.created, freq.modified, freq.deleted
        )?;
        if let (Some(age), Some(line)) = (stats.oldest_age, &stats.oldest_line) {
            writeln!(f, "- Oldest Surviving Line: {age:.1} days `{}`", line.trim())?;
        }
        if let (Some(age), Some(line)) = (stats.newest_age, &stats.newest_line) {
            writeln!(f, "- Newest Surviving Line: {age:.1} days `{}`", line.trim())?;
        }

        writeln!(f)?;
        writeln!(f, "Repository Timespan:")?;
        writeln!(f, "-------------------")?;
        writeln!(f, "- First Commit: {}", format_optional_date(stats.first_commit))?;
        writeln!(f, "- Last Commit: {}", format_optional_date(stats.last_commit))?;
        writeln!(f, "- Total Age: {:.1} days", stats.history_span_days())?;
        writeln!(f, "- Commits Processed: {}", stats.commits_processed)?;

        writeln!(f)?;
        writeln!(f, "Survival Rate:")?;
        writeln!(f, "--------------")?;
        write_curve_text(f, stats)?;

        if let Some(validation) = &self.analysis.validation {
            writeln!(f)?;
            writeln!(f, "Sample Lines for Validation:")?;
            writeln!(f, "----------------------------")?;
            for (label, record) in &validation.samples {
                writeln!(f, "{label}:")?;
                writeln!(f, "  File: {}", record.file)?;
                writeln!(f, "  Content: {}", record.current_content())?;
                writeln!(f, "  Age: {:.1} days", self.age_days(record))?;
                writeln!(f, "  Created in: {}", record.origin_commit)?;
                writeln!(f, "  Created at: {}", format_date(record.created_at))?;
                if let Some(deleted_at) = record.deleted_at {
                    writeln!(f, "  Deleted at: {}", format_date(deleted_at))?;
                }
                writeln!(f)?;
            }

            let preview = self.preview;
            writeln!(
                f,
                "Timeline Sample (first {preview} and last {preview} events):"
            )?;
            writeln!(f, "----------------------------------------")?;
            let (indices, elided) = timeline_preview(validation.timeline.len(), preview);
            for (pos, idx) in indices.iter().enumerate() {
                if elided && pos == preview {
                    writeln!(f, "...")?;
                }
                writeln!(f, "{}", timeline_line(&validation.timeline[*idx]))?;
            }
        }

        let skipped = &self.analysis.skipped;
        if !skipped.is_empty() {
            writeln!(f)?;
            writeln!(f, "Skipped Commits ({}):", skipped.len())?;
            writeln!(f, "--------------------")?;
            for skip in skipped {
                writeln!(
                    f,
                    "- {} ({}): {}",
                    skip.short_id(),
                    format_date(skip.timestamp),
                    skip.reason
                )?;
            }
        }

        Ok(())
    }
}

fn write_curve_text(f: &mut fmt::Formatter<'_>, stats: &AggregateStats) -> fmt::Result {
    if stats.survival_curve.is_empty() {
        return writeln!(f, "No survival rate data available");
    }
    let max_age = stats.lifetimes.last().copied().unwrap_or(0.0);
    for point in curve_summary(&stats.survival_curve) {
        let share = if max_age > 0.0 {
            point.age_days / max_age * 100.0
        } else {
            0.0
        };
        writeln!(
            f,
            "  {share:.0}% of max age ({:.1} days): {:.1}% surviving",
            point.age_days,
            point.surviving * 100.0
        )?;
    }
    Ok(())
}

fn timeline_line(event: &TimelineEvent) -> String {
    format!(
        "{}: {} line in {} ({} lines total, {} deleted)",
        format_date(event.timestamp),
        event.kind,
        event.file,
        event.running_line_count,
        event.running_deleted_count
    )
}

struct Markdown<'r, 'a>(&'r Report<'a>);

impl fmt::Display for Markdown<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let stats = &report.analysis.stats;
        let freq = &stats.change_frequency;

        writeln!(f, "# Code Half-Life Analysis\n")?;
        writeln!(
            f,
            "**Commits processed:** {} ({} to {})\n",
            stats.commits_processed,
            format_optional_date(stats.first_commit),
            format_optional_date(stats.last_commit)
        )?;

        writeln!(f, "## Summary\n")?;
        writeln!(f, "| Metric | Value |")?;
        writeln!(f, "|--------|-------|")?;
        writeln!(f, "| Half-life | {:.1} days |", stats.half_life)?;
        writeln!(f, "| Median lifetime | {:.1} days |", stats.median_lifetime)?;
        writeln!(f, "| Mean lifetime | {:.1} days |", stats.mean_lifetime)?;
        writeln!(f, "| Std deviation | {:.1} days |", stats.std_dev_lifetime)?;
        writeln!(f, "| Lines tracked | {} |", stats.total_tracked)?;
        writeln!(
            f,
            "| Surviving | {} ({:.1}%) |",
            stats.surviving_lines,
            stats.surviving_ratio() * 100.0
        )?;
        writeln!(
            f,
            "| Deleted | {} ({:.1}%) |",
            stats.deleted_lines,
            stats.deleted_ratio() * 100.0
        )?;
        writeln!(f, "| Lines with changes | {} |", stats.lines_with_changes)?;
        writeln!(f, "| Average edit size | {:.1} bytes |", stats.average_edit_size)?;
        writeln!(
            f,
            "| Events | {} created / {} modified / {} deleted |",
            freq.created, freq.modified, freq.deleted
        )?;
        writeln!(f)?;

        writeln!(f, "## Survival Curve\n")?;
        writeln!(f, "| Age (days) | Surviving |")?;
        writeln!(f, "|------------|-----------|")?;
        for point in curve_summary(&stats.survival_curve) {
            writeln!(
                f,
                "| {:.1} | {:.1}% |",
                point.age_days,
                point.surviving * 100.0
            )?;
        }
        writeln!(f)?;

        if let Some(validation) = &report.analysis.validation {
            writeln!(f, "## Samples\n")?;
            if validation.samples.is_empty() {
                writeln!(f, "No surviving lines to sample.\n")?;
            } else {
                writeln!(f, "| Sample | File | Content | Age (days) | Created |")?;
                writeln!(f, "|--------|------|---------|------------|---------|")?;
                for (label, record) in &validation.samples {
                    writeln!(
                        f,
                        "| {label} | `{}` | `{}` | {:.1} | {} |",
                        record.file,
                        escape_cell(record.current_content().trim()),
                        report.age_days(record),
                        format_date(record.created_at)
                    )?;
                }
                writeln!(f)?;
            }

            writeln!(f, "## Timeline\n")?;
            writeln!(f, "| Date | Event | File | Lines | Deleted |")?;
            writeln!(f, "|------|-------|------|-------|---------|")?;
            let (indices, elided) = timeline_preview(validation.timeline.len(), report.preview);
            for (pos, idx) in indices.iter().enumerate() {
                if elided && pos == report.preview {
                    writeln!(f, "| ... | | | | |")?;
                }
                let event = &validation.timeline[*idx];
                writeln!(
                    f,
                    "| {} | {} | `{}` | {} | {} |",
                    format_date(event.timestamp),
                    event.kind,
                    event.file,
                    event.running_line_count,
                    event.running_deleted_count
                )?;
            }
            writeln!(f)?;
        }

        let skipped = &report.analysis.skipped;
        if !skipped.is_empty() {
            writeln!(f, "## Skipped Commits\n")?;
            writeln!(f, "| Commit | Date | Reason |")?;
            writeln!(f, "|--------|------|--------|")?;
            for skip in skipped {
                writeln!(
                    f,
                    "| `{}` | {} | {} |",
                    skip.short_id(),
                    format_date(skip.timestamp),
                    escape_cell(&skip.reason)
                )?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}
