//! File pattern filtering applied before any content reaches the tracker.

use halflife_core::{AnalysisConfig, HalflifeError};

/// Decides which file paths take part in the analysis.
///
/// The include pattern follows three forms: `*` matches every file, `*.ext`
/// matches by suffix, and anything else is a glob matched against the file's
/// base name. Exclude patterns are globs matched against the full path.
///
/// # Examples
///
/// ```
/// use halflife_lifecycle::filter::PathFilter;
///
/// let filter = PathFilter::new("*.go", &["vendor/*".to_string()]).unwrap();
/// assert!(filter.matches("cmd/main.go"));
/// assert!(!filter.matches("vendor/lib/x.go"));
/// assert!(!filter.matches("README.md"));
/// ```
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Include,
    exclude: Vec<glob::Pattern>,
}

#[derive(Debug, Clone)]
enum Include {
    All,
    Suffix(String),
    BaseName(glob::Pattern),
}

impl PathFilter {
    /// Build a filter from an include pattern and exclude globs.
    ///
    /// # Errors
    ///
    /// Returns [`HalflifeError::Pattern`] if any pattern is not a valid glob.
    pub fn new(pattern: &str, exclude: &[String]) -> Result<Self, HalflifeError> {
        let include = if pattern == "*" {
            Include::All
        } else if let Some(ext) = pattern.strip_prefix('*').filter(|p| p.starts_with('.')) {
            Include::Suffix(ext.to_string())
        } else {
            Include::BaseName(compile(pattern)?)
        };

        let exclude = exclude
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { include, exclude })
    }

    /// A filter that accepts every path.
    pub fn all() -> Self {
        Self {
            include: Include::All,
            exclude: Vec::new(),
        }
    }

    /// Build a filter from the `[analysis]` section.
    ///
    /// # Errors
    ///
    /// Returns [`HalflifeError::Pattern`] if any configured pattern is invalid.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, HalflifeError> {
        Self::new(&config.pattern, &config.exclude)
    }

    pub fn matches(&self, path: &str) -> bool {
        if self.exclude.iter().any(|p| p.matches(path)) {
            return false;
        }
        match &self.include {
            Include::All => true,
            Include::Suffix(ext) => path.ends_with(ext.as_str()),
            Include::BaseName(glob) => glob.matches(base_name(path)),
        }
    }
}

fn compile(pattern: &str) -> Result<glob::Pattern, HalflifeError> {
    glob::Pattern::new(pattern).map_err(|e| HalflifeError::Pattern {
        pattern: pattern.to_string(),
        reason: e.msg.to_string(),
    })
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_everything() {
        let f = PathFilter::new("*", &[]).unwrap();
        assert!(f.matches("a"));
        assert!(f.matches("deep/nested/file.txt"));
    }

    #[test]
    fn extension_pattern_matches_suffix_anywhere() {
        let f = PathFilter::new("*.go", &[]).unwrap();
        assert!(f.matches("main.go"));
        assert!(f.matches("pkg/server/handler.go"));
        assert!(!f.matches("main.gone"));
        assert!(!f.matches("go.mod"));
    }

    #[test]
    fn glob_pattern_matches_base_name() {
        let f = PathFilter::new("test_*.py", &[]).unwrap();
        assert!(f.matches("tests/test_parser.py"));
        assert!(!f.matches("tests/parser.py"));
    }

    #[test]
    fn excludes_win_over_include() {
        let f = PathFilter::new("*.rs", &["target/*".into(), "*_generated.rs".into()]).unwrap();
        assert!(f.matches("src/lib.rs"));
        assert!(!f.matches("target/debug/build.rs"));
        assert!(!f.matches("src/proto_generated.rs"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let err = PathFilter::new("[abc", &[]).unwrap_err();
        assert!(matches!(err, HalflifeError::Pattern { .. }));
        assert!(PathFilter::new("*", &["[".into()]).is_err());
    }

    #[test]
    fn from_config_uses_analysis_section() {
        let config = AnalysisConfig {
            pattern: "*.md".into(),
            ..AnalysisConfig::default()
        };
        let f = PathFilter::from_config(&config).unwrap();
        assert!(f.matches("README.md"));
        assert!(!f.matches("main.rs"));
    }
}
