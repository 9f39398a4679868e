//! Line lifecycle tracking and survival statistics.
//!
//! Replays a linear commit history one commit at a time, keeps a lifecycle
//! record for every distinct (file, content) line identity, and turns the
//! final set of records into survival statistics: half-life, mean/median
//! lifetime, a sampled survival curve, and change frequencies.
//!
//! The history itself comes from any [`replay::DiffSource`]; the git
//! implementation lives in `halflife-git`.

pub mod analysis;
pub mod filter;
pub mod identity;
pub mod record;
pub mod replay;
pub mod stats;
pub mod tracker;
pub mod validation;

pub use analysis::{run_analysis, Analysis, AnalysisOptions};
pub use filter::PathFilter;
pub use identity::{ContentIdentity, IdentityResolver, LineKey};
pub use record::{EventKind, LineEvent, LineRecord};
pub use replay::{replay_history, CommitSkip, DiffSource, Replay};
pub use stats::{AggregateStats, ChangeFrequency, StatsOptions, SurvivalPoint};
pub use tracker::{HistoryTally, Tracker};
pub use validation::{TimelineEvent, ValidationReport};
