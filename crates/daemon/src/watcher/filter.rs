// File-name glob policy: which changed files count as document saves.

use std::path::Path;

use glob::{MatchOptions, Pattern, PatternError};
use thiserror::Error;

use crate::config::WatchConfig;

#[derive(Debug, Error)]
#[error("invalid watch pattern `{pattern}`: {source}")]
pub struct WatchFilterError {
    pub pattern: String,
    #[source]
    pub source: PatternError,
}

/// Matches file names against watch and ignore globs.
///
/// A path qualifies when its file name matches at least one watch pattern
/// and no ignore pattern. Case sensitivity follows the host filesystem.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    patterns: Vec<Pattern>,
    ignore_patterns: Vec<Pattern>,
    options: MatchOptions,
}

impl WatchFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S], ignore_patterns: &[S]) -> Result<Self, WatchFilterError> {
        Ok(Self {
            patterns: compile(patterns)?,
            ignore_patterns: compile(ignore_patterns)?,
            options: MatchOptions {
                case_sensitive: host_is_case_sensitive(),
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
        })
    }

    pub fn from_config(config: &WatchConfig) -> Result<Self, WatchFilterError> {
        Self::new(&config.patterns, &config.ignore_patterns)
    }

    /// True if the file name of `path` passes the policy.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        self.patterns.iter().any(|p| p.matches_with(name, self.options))
            && !self.ignore_patterns.iter().any(|p| p.matches_with(name, self.options))
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>, WatchFilterError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern.as_ref()).map_err(|source| WatchFilterError {
                pattern: pattern.as_ref().to_string(),
                source,
            })
        })
        .collect()
}

const fn host_is_case_sensitive() -> bool {
    !cfg!(any(target_os = "macos", windows))
}
