use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HalflifeError;

/// Top-level configuration loaded from `.halflife.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use halflife_core::HalflifeConfig;
///
/// let config = HalflifeConfig::default();
/// assert_eq!(config.analysis.pattern, "*");
/// assert_eq!(config.analysis.time_points, 100);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HalflifeConfig {
    /// History replay and statistics settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Validation report settings.
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl HalflifeConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HalflifeError::Io`] if the file cannot be read,
    /// [`HalflifeError::Toml`] if the content is not valid TOML, or
    /// [`HalflifeError::Config`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, HalflifeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`HalflifeError::Toml`] if parsing fails, or
    /// [`HalflifeError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use halflife_core::{HalflifeConfig, ModificationPolicy};
    ///
    /// let toml = r#"
    /// [analysis]
    /// pattern = "*.rs"
    /// modification_policy = "in-place"
    /// "#;
    /// let config = HalflifeConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.analysis.pattern, "*.rs");
    /// assert_eq!(config.analysis.modification_policy, ModificationPolicy::InPlace);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, HalflifeError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`HalflifeError::Config`] naming the offending key.
    pub fn validate(&self) -> Result<(), HalflifeError> {
        if self.analysis.time_points == 0 {
            return Err(HalflifeError::Config(
                "analysis.time_points must be at least 1".into(),
            ));
        }
        if self.analysis.pattern.trim().is_empty() {
            return Err(HalflifeError::Config(
                "analysis.pattern must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// History replay and statistics configuration.
///
/// # Examples
///
/// ```
/// use halflife_core::{AnalysisConfig, ModificationPolicy};
///
/// let config = AnalysisConfig::default();
/// assert!(config.branch.is_none());
/// assert!(config.exclude.is_empty());
/// assert_eq!(config.modification_policy, ModificationPolicy::Replace);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// File pattern to track (default: `"*"`).
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Additional glob patterns whose files are never tracked.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Branch to replay. When unset, `main` then `master` are tried.
    pub branch: Option<String>,
    /// Number of evenly spaced survival-curve samples (default: 100).
    #[serde(default = "default_time_points")]
    pub time_points: usize,
    /// How an edited line is accounted for (default: `replace`).
    #[serde(default)]
    pub modification_policy: ModificationPolicy,
}

fn default_pattern() -> String {
    "*".into()
}

fn default_time_points() -> usize {
    100
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            exclude: Vec::new(),
            branch: None,
            time_points: default_time_points(),
            modification_policy: ModificationPolicy::default(),
        }
    }
}

/// Validation report configuration.
///
/// # Examples
///
/// ```
/// use halflife_core::ValidationConfig;
///
/// let config = ValidationConfig::default();
/// assert_eq!(config.sample_count, 5);
/// assert_eq!(config.timeline_preview, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Evenly spaced surviving lines to include as samples (default: 5).
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    /// Timeline events shown from each end in text output (default: 5).
    #[serde(default = "default_timeline_preview")]
    pub timeline_preview: usize,
}

fn default_sample_count() -> usize {
    5
}

fn default_timeline_preview() -> usize {
    5
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            timeline_preview: default_timeline_preview(),
        }
    }
}

/// Strategy for attributing an in-place line edit.
///
/// With [`Replace`](ModificationPolicy::Replace) an edit closes the old
/// line and opens a new one. With [`InPlace`](ModificationPolicy::InPlace)
/// a deleted run directly followed by an added run is paired line by line
/// and each pair is recorded as a modification of the surviving record.
///
/// # Examples
///
/// ```
/// use halflife_core::ModificationPolicy;
///
/// let policy: ModificationPolicy = "in-place".parse().unwrap();
/// assert_eq!(policy, ModificationPolicy::InPlace);
/// assert_eq!(policy.to_string(), "in-place");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModificationPolicy {
    /// Every edit is a deletion plus a creation.
    #[default]
    Replace,
    /// Paired replacements become `Modified` events.
    InPlace,
}

impl fmt::Display for ModificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModificationPolicy::Replace => write!(f, "replace"),
            ModificationPolicy::InPlace => write!(f, "in-place"),
        }
    }
}

impl FromStr for ModificationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(ModificationPolicy::Replace),
            "in-place" | "inplace" | "in_place" => Ok(ModificationPolicy::InPlace),
            other => Err(format!("unknown modification policy: {other}")),
        }
    }
}
