use std::collections::BTreeMap;

use prcov_core::{CoverageConfig, PrcovError};
use prcov_difflens::index::AddedLineSet;
use prcov_difflens::model::DiffDocument;

use crate::clover::CoverageDocument;
use crate::result::CoverageResult;

/// Per-file map from added statement line to "was it executed".
///
/// Every file from the [`AddedLineSet`] has an entry. Inner keys are only
/// ever added lines that the report marks as statements.
pub type FileCoverage = BTreeMap<String, BTreeMap<u32, bool>>;

/// Correlate added lines with the coverage report.
///
/// Each added line is looked up at `base_repo_path + path`. The two strings
/// are concatenated verbatim, so a missing or doubled separator makes every
/// lookup for that file miss. A line is kept only when the report has a
/// statement record for it; lines with no record (blank lines, comments,
/// braces) and non-statement records are left out rather than counted as
/// uncovered.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
///
/// use prcov_core::CoverageConfig;
/// use prcov_coverage::clover::CoverageDocument;
/// use prcov_coverage::correlate::correlate;
/// use prcov_difflens::index::AddedLineSet;
///
/// let added: AddedLineSet = [("foo.py".to_string(), BTreeSet::from([10, 11, 12]))]
///     .into_iter()
///     .collect();
/// let xml = r#"<coverage><file name="/repo/foo.py">
///   <line num="10" type="stmt" count="0"/>
///   <line num="12" type="stmt" count="3"/>
/// </file></coverage>"#;
/// let report = CoverageDocument::parse(xml, &CoverageConfig::default()).unwrap();
///
/// let coverage = correlate(&added, &report, "/repo/");
/// let foo = &coverage["foo.py"];
/// assert_eq!(foo.len(), 2);
/// assert!(!foo[&10]);
/// assert!(foo[&12]);
/// ```
pub fn correlate(
    added: &AddedLineSet,
    report: &CoverageDocument,
    base_repo_path: &str,
) -> FileCoverage {
    let mut coverage = FileCoverage::new();

    for (path, lines) in added.files() {
        let report_path = format!("{base_repo_path}{path}");
        if !lines.is_empty() && !report.contains_file(&report_path) {
            tracing::debug!(path, report_path = %report_path, "file absent from coverage report");
        }

        let mut tracked = BTreeMap::new();
        let mut skipped = 0usize;
        for &num in lines {
            match report.line(&report_path, num) {
                Some(record) if record.kind.is_statement() => {
                    tracked.insert(num, record.is_covered());
                }
                _ => skipped += 1,
            }
        }

        tracing::debug!(
            path,
            added = lines.len(),
            tracked = tracked.len(),
            skipped,
            "correlated file"
        );
        coverage.insert(path.to_string(), tracked);
    }

    coverage
}

/// Build a [`CoverageResult`] from a pull-request diff and a parsed report.
///
/// # Examples
///
/// ```
/// use prcov_coverage::clover::CoverageDocument;
/// use prcov_coverage::correlate::build_coverage_result;
/// use prcov_difflens::model::DiffDocument;
///
/// let result = build_coverage_result(
///     &DiffDocument::default(),
///     &CoverageDocument::default(),
///     "/repo/",
/// );
/// assert_eq!(result.total_coverage_percent(), 100.0);
/// ```
pub fn build_coverage_result(
    diff: &DiffDocument,
    report: &CoverageDocument,
    base_repo_path: &str,
) -> CoverageResult {
    let added = AddedLineSet::from_diff(diff);
    CoverageResult::new(correlate(&added, report, base_repo_path))
}

/// Parse `xml` as a Clover report and build a [`CoverageResult`].
///
/// The report is parsed in full before any correlation happens.
///
/// # Errors
///
/// Returns [`PrcovError::Parse`] if the report is malformed.
pub fn build_coverage_result_from_xml(
    diff: &DiffDocument,
    xml: &str,
    base_repo_path: &str,
    config: &CoverageConfig,
) -> Result<CoverageResult, PrcovError> {
    let report = CoverageDocument::parse(xml, config)?;
    Ok(build_coverage_result(diff, &report, base_repo_path))
}
