//! Per-line lifecycle records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::LineKey;

/// What happened to a line at one point in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "create")]
    Created,
    #[serde(rename = "modify")]
    Modified,
    #[serde(rename = "delete")]
    Deleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Created => write!(f, "create"),
            EventKind::Modified => write!(f, "modify"),
            EventKind::Deleted => write!(f, "delete"),
        }
    }
}

/// A single entry in a record's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEvent {
    /// Unix timestamp of the commit.
    pub timestamp: i64,
    pub kind: EventKind,
    /// Commit that caused the event.
    pub commit: String,
    /// New line text for `Modified` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Lifecycle of one line identity, from creation to (optional) deletion.
///
/// Records are never dropped from the tracking set: a deleted line keeps its
/// record with `deleted_at` set so its lifetime can be measured.
///
/// # Examples
///
/// ```
/// use halflife_lifecycle::identity::LineKey;
/// use halflife_lifecycle::record::{EventKind, LineRecord};
///
/// let mut record = LineRecord::created(LineKey::new("a.go", "x := 1"), 100, "c1");
/// assert!(record.is_alive());
/// record.close(400, "c2");
/// assert_eq!(record.lifetime_seconds(1_000), 300);
/// assert_eq!(record.events.last().map(|e| e.kind), Some(EventKind::Deleted));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRecord {
    #[serde(skip)]
    pub key: LineKey,
    /// Path of the file the line belongs to.
    pub file: String,
    /// Line text at creation.
    pub content: String,
    pub created_at: i64,
    pub last_seen_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
    /// Commit that introduced the line.
    pub origin_commit: String,
    pub events: Vec<LineEvent>,
}

impl LineRecord {
    /// Open a record with its `Created` event.
    pub fn created(key: LineKey, timestamp: i64, commit: &str) -> Self {
        Self {
            file: key.path().to_string(),
            content: key.content().to_string(),
            key,
            created_at: timestamp,
            last_seen_at: timestamp,
            deleted_at: None,
            origin_commit: commit.to_string(),
            events: vec![LineEvent {
                timestamp,
                kind: EventKind::Created,
                commit: commit.to_string(),
                payload: None,
            }],
        }
    }

    pub fn is_alive(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Mark the line as still present at `timestamp`.
    pub fn touch(&mut self, timestamp: i64) {
        if timestamp > self.last_seen_at {
            self.last_seen_at = timestamp;
        }
    }

    /// Record an in-place edit to `new_content`; the record stays open.
    pub fn modify(&mut self, timestamp: i64, commit: &str, new_content: &str) {
        debug_assert!(self.is_alive());
        self.touch(timestamp);
        self.events.push(LineEvent {
            timestamp,
            kind: EventKind::Modified,
            commit: commit.to_string(),
            payload: Some(new_content.to_string()),
        });
    }

    /// Close the record. Nothing may follow the `Deleted` event.
    pub fn close(&mut self, timestamp: i64, commit: &str) {
        debug_assert!(self.is_alive());
        self.touch(timestamp);
        self.deleted_at = Some(timestamp);
        self.events.push(LineEvent {
            timestamp,
            kind: EventKind::Deleted,
            commit: commit.to_string(),
            payload: None,
        });
    }

    /// Text of the line after its latest modification.
    pub fn current_content(&self) -> &str {
        self.events
            .iter()
            .rev()
            .find_map(|e| e.payload.as_deref())
            .unwrap_or(&self.content)
    }

    /// Seconds from creation to deletion, or to `now` while alive.
    pub fn lifetime_seconds(&self, now: i64) -> i64 {
        self.deleted_at.unwrap_or(now) - self.created_at
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LineRecord {
        LineRecord::created(LineKey::new("f.rs", "let a = 1;"), 10, "c0")
    }

    #[test]
    fn created_record_has_single_created_event() {
        let r = record();
        assert_eq!(r.events.len(), 1);
        assert_eq!(r.events[0].kind, EventKind::Created);
        assert_eq!(r.created_at, r.last_seen_at);
        assert_eq!(r.origin_commit, "c0");
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut r = record();
        r.touch(50);
        r.touch(20);
        assert_eq!(r.last_seen_at, 50);
    }

    #[test]
    fn modify_keeps_creation_content() {
        let mut r = record();
        r.modify(30, "c1", "let a = 2;");
        assert!(r.is_alive());
        assert_eq!(r.content, "let a = 1;");
        assert_eq!(r.current_content(), "let a = 2;");
        assert_eq!(r.count(EventKind::Modified), 1);
    }

    #[test]
    fn close_sets_deleted_at_and_last_event() {
        let mut r = record();
        r.close(70, "c2");
        assert_eq!(r.deleted_at, Some(70));
        assert_eq!(r.last_seen_at, 70);
        assert_eq!(r.lifetime_seconds(1_000_000), 60);
        assert_eq!(r.events.last().unwrap().kind, EventKind::Deleted);
    }

    #[test]
    fn alive_lifetime_is_measured_against_now() {
        let r = record();
        assert_eq!(r.lifetime_seconds(110), 100);
    }
}
