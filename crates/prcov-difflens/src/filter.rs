//! Exclusion of diff paths before correlation.
//!
//! Lets a project leave generated code, fixtures, or test suites out of the
//! new-code coverage figure via `[report].exclude` globs.

use prcov_core::{PrcovError, ReportConfig};

use crate::index::AddedLineSet;

/// Glob-based filter over repository-relative diff paths.
///
/// # Examples
///
/// ```
/// use prcov_difflens::filter::PathFilter;
///
/// let filter = PathFilter::new(&["tests/**", "*.min.js"]).unwrap();
/// assert!(filter.is_excluded("tests/unit/test_cart.py"));
/// assert!(filter.is_excluded("static/app.min.js"));
/// assert!(!filter.is_excluded("src/cart.py"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<glob::Pattern>,
}

impl PathFilter {
    /// Compile a filter from glob patterns.
    ///
    /// # Errors
    ///
    /// Returns [`PrcovError::Config`] naming the first invalid pattern.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PrcovError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                glob::Pattern::new(p).map_err(|e| {
                    PrcovError::Config(format!("invalid exclude pattern '{p}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Create a filter from report configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use prcov_core::ReportConfig;
    /// use prcov_difflens::filter::PathFilter;
    ///
    /// let filter = PathFilter::from_config(&ReportConfig::default()).unwrap();
    /// assert!(filter.is_empty());
    /// ```
    pub fn from_config(config: &ReportConfig) -> Result<Self, PrcovError> {
        Self::new(&config.exclude)
    }

    /// Returns `true` when no pattern is configured.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check whether `path` matches any exclude pattern.
    ///
    /// `*` does not cross directory separators; use `**` for that.
    pub fn is_excluded(&self, path: &str) -> bool {
        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.patterns.iter().any(|p| {
            p.matches_with(path, options)
                || path
                    .rsplit('/')
                    .next()
                    .is_some_and(|name| p.matches_with(name, options))
        })
    }

    /// Drop excluded files from `added`, returning the number removed.
    pub fn apply(&self, added: &mut AddedLineSet) -> usize {
        if self.is_empty() {
            return 0;
        }
        let before = added.len();
        added.retain_files(|path| {
            let excluded = self.is_excluded(path);
            if excluded {
                tracing::debug!(path, "excluded from coverage");
            }
            !excluded
        });
        before - added.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn added(paths: &[&str]) -> AddedLineSet {
        paths
            .iter()
            .map(|p| (p.to_string(), BTreeSet::from([1])))
            .collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let filter = PathFilter::default();
        let mut set = added(&["a.py", "tests/b.py"]);
        assert_eq!(filter.apply(&mut set), 0);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn directory_glob_excludes_nested_files() {
        let filter = PathFilter::new(&["tests/**"]).unwrap();
        let mut set = added(&["src/cart.py", "tests/unit/test_cart.py", "tests/conftest.py"]);
        assert_eq!(filter.apply(&mut set), 2);
        assert!(set.contains_file("src/cart.py"));
    }

    #[test]
    fn bare_file_pattern_matches_any_directory() {
        let filter = PathFilter::new(&["*_pb2.py"]).unwrap();
        assert!(filter.is_excluded("proto/gen/user_pb2.py"));
        assert!(!filter.is_excluded("proto/user.py"));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let result = PathFilter::new(&["src/[unclosed"]);
        assert!(matches!(result, Err(PrcovError::Config(_))));
    }
}
