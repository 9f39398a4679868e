//! Core types, configuration, and error handling for halflife.
//!
//! This crate provides the shared foundation used by the other halflife crates:
//! - [`HalflifeError`] — unified error type using `thiserror`
//! - [`HalflifeConfig`] — configuration loaded from `.halflife.toml`
//! - The diff data model exchanged between a history source and the
//!   lifecycle engine: [`CommitMeta`], [`FileDiff`], [`DiffChunk`],
//!   [`FileEntry`], plus [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{AnalysisConfig, HalflifeConfig, ModificationPolicy, ValidationConfig};
pub use error::HalflifeError;
pub use types::{ChunkKind, CommitMeta, DiffChunk, FileDiff, FileEntry, OutputFormat};
