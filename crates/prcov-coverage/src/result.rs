use serde::Serialize;

use crate::correlate::FileCoverage;

/// Coverage of the statements a pull request adds.
///
/// Percentages are plain `f64` division with no rounding. A scope with no
/// tracked statements reports 100: there is nothing in it to leave uncovered.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use prcov_coverage::correlate::FileCoverage;
/// use prcov_coverage::result::CoverageResult;
///
/// let mut files = FileCoverage::new();
/// files.insert("foo.py".into(), BTreeMap::from([(10, false), (12, true)]));
/// let result = CoverageResult::new(files);
///
/// assert_eq!(result.per_file_coverage_percent("foo.py"), 50.0);
/// assert_eq!(result.uncovered_lines("foo.py"), vec![10]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageResult {
    files: FileCoverage,
}

impl CoverageResult {
    /// Wrap a correlation output.
    pub fn new(files: FileCoverage) -> Self {
        Self { files }
    }

    /// The underlying per-file, per-line coverage map.
    pub fn file_coverage(&self) -> &FileCoverage {
        &self.files
    }

    /// Statements tracked across all files.
    pub fn tracked_count(&self) -> usize {
        self.files.values().map(|lines| lines.len()).sum()
    }

    /// Tracked statements that executed.
    pub fn covered_count(&self) -> usize {
        self.files
            .values()
            .map(|lines| lines.values().filter(|&&covered| covered).count())
            .sum()
    }

    /// Covered over tracked statements across all files, times 100.
    ///
    /// Exactly `100.0` when nothing is tracked.
    pub fn total_coverage_percent(&self) -> f64 {
        percent(self.covered_count(), self.tracked_count())
    }

    /// Coverage percentage of a single file.
    ///
    /// Files with no tracked statements, and files not in the diff at all,
    /// report `100.0`.
    pub fn per_file_coverage_percent(&self, file: &str) -> f64 {
        match self.files.get(file) {
            Some(lines) => {
                let covered = lines.values().filter(|&&c| c).count();
                percent(covered, lines.len())
            }
            None => 100.0,
        }
    }

    /// Uncovered added statements of `file`, ascending.
    pub fn uncovered_lines(&self, file: &str) -> Vec<u32> {
        self.files
            .get(file)
            .map(|lines| {
                lines
                    .iter()
                    .filter(|&(_, &covered)| !covered)
                    .map(|(&num, _)| num)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of tracked statements in `file`.
    pub fn tracked_lines(&self, file: &str) -> usize {
        self.files.get(file).map_or(0, |lines| lines.len())
    }

    /// Files with at least one tracked statement, in path order.
    ///
    /// Files whose added lines hold no statement (tests, docs, config) are
    /// left out of textual reports.
    pub fn reported_files(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(|(_, lines)| !lines.is_empty())
            .map(|(path, _)| path.as_str())
    }

    /// Returns `true` if total coverage is at least `threshold` percent.
    ///
    /// # Examples
    ///
    /// ```
    /// use prcov_coverage::result::CoverageResult;
    ///
    /// let empty = CoverageResult::default();
    /// assert!(empty.meets_threshold(100.0));
    /// ```
    pub fn meets_threshold(&self, threshold: f64) -> bool {
        self.total_coverage_percent() >= threshold
    }

    /// Serializable view for JSON output.
    pub fn summary(&self) -> CoverageSummary {
        let files = self
            .files
            .iter()
            .map(|(path, lines)| {
                let uncovered_lines = self.uncovered_lines(path);
                FileSummary {
                    path: path.clone(),
                    percent: self.per_file_coverage_percent(path),
                    tracked_lines: lines.len(),
                    covered_lines: lines.len() - uncovered_lines.len(),
                    uncovered_lines,
                }
            })
            .collect();

        CoverageSummary {
            total_percent: self.total_coverage_percent(),
            tracked_lines: self.tracked_count(),
            covered_lines: self.covered_count(),
            files,
        }
    }
}

fn percent(covered: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    covered as f64 / total as f64 * 100.0
}

/// Aggregate figures of a [`CoverageResult`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSummary {
    /// Coverage across all files.
    pub total_percent: f64,
    /// Added statements across all files.
    pub tracked_lines: usize,
    /// Added statements that executed.
    pub covered_lines: usize,
    /// Every file in the diff, in path order, including those with nothing tracked.
    pub files: Vec<FileSummary>,
}

/// Per-file figures of a [`CoverageResult`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    /// Repository-relative path.
    pub path: String,
    /// Coverage of this file's added statements.
    pub percent: f64,
    /// Added statements in this file.
    pub tracked_lines: usize,
    /// Added statements that executed.
    pub covered_lines: usize,
    /// Added statements that did not execute, ascending.
    pub uncovered_lines: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn result(entries: Vec<(&str, Vec<(u32, bool)>)>) -> CoverageResult {
        CoverageResult::new(
            entries
                .into_iter()
                .map(|(p, lines)| (p.to_string(), lines.into_iter().collect()))
                .collect(),
        )
    }

    #[test]
    fn empty_result_is_fully_covered() {
        assert_eq!(CoverageResult::default().total_coverage_percent(), 100.0);

        let only_empty_files = result(vec![("a.py", vec![]), ("b.py", vec![])]);
        assert_eq!(only_empty_files.total_coverage_percent(), 100.0);
        assert_eq!(only_empty_files.reported_files().count(), 0);
    }

    #[test]
    fn total_sums_across_files() {
        let r = result(vec![
            ("a.py", vec![(1, true), (2, false)]),
            ("b.py", vec![(5, true), (6, true)]),
            ("tests/test_a.py", vec![]),
        ]);
        assert_eq!(r.tracked_count(), 4);
        assert_eq!(r.covered_count(), 3);
        assert_eq!(r.total_coverage_percent(), 75.0);
    }

    #[test]
    fn percentages_are_plain_division() {
        let r = result(vec![("a.py", vec![(1, true), (2, false), (3, false)])]);
        assert_eq!(r.per_file_coverage_percent("a.py"), 1.0 / 3.0 * 100.0);
    }

    #[test]
    fn empty_or_unknown_files_are_queryable() {
        let r = result(vec![("empty.py", vec![])]);
        assert_eq!(r.per_file_coverage_percent("empty.py"), 100.0);
        assert!(r.uncovered_lines("empty.py").is_empty());
        assert_eq!(r.per_file_coverage_percent("never-in-diff.py"), 100.0);
        assert!(r.uncovered_lines("never-in-diff.py").is_empty());
        assert_eq!(r.tracked_lines("never-in-diff.py"), 0);
    }

    #[test]
    fn uncovered_lines_ascend() {
        let r = result(vec![(
            "a.py",
            vec![(40, false), (3, false), (17, true), (9, false)],
        )]);
        assert_eq!(r.uncovered_lines("a.py"), vec![3, 9, 40]);
    }

    #[test]
    fn reported_files_skip_untracked() {
        let r = result(vec![
            ("z.py", vec![(1, true)]),
            ("docs.md", vec![]),
            ("a.py", vec![(1, false)]),
        ]);
        assert_eq!(r.reported_files().collect::<Vec<_>>(), vec!["a.py", "z.py"]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let r = result(vec![("a.py", vec![(1, true), (2, false)])]);
        assert!(r.meets_threshold(50.0));
        assert!(!r.meets_threshold(50.1));
    }

    #[test]
    fn summary_serializes_camel_case() {
        let r = result(vec![("foo.py", vec![(10, false), (12, true)])]);
        let json = serde_json::to_value(r.summary()).unwrap();
        assert_eq!(json["totalPercent"], 50.0);
        assert_eq!(json["trackedLines"], 2);
        assert_eq!(json["files"][0]["path"], "foo.py");
        assert_eq!(json["files"][0]["uncoveredLines"], serde_json::json!([10]));
        assert!(json.get("total_percent").is_none());
    }

    #[test]
    fn file_coverage_is_exposed() {
        let r = result(vec![("foo.py", vec![(10, false)])]);
        let expected: FileCoverage =
            BTreeMap::from([("foo.py".to_string(), BTreeMap::from([(10, false)]))]);
        assert_eq!(r.file_coverage(), &expected);
    }
}
