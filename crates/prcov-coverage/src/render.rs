//! Text and Markdown rendering of a [`CoverageResult`].

use std::fmt;
use std::fmt::Write as _;

use crate::result::CoverageResult;

/// Plain-text report.
///
/// The first line carries the total. Each file with tracked statements
/// follows on a tab-indented line, and files with uncovered statements add
/// a doubly indented, comma-separated list of their line numbers.
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
/// files.insert("bar.py".into(), BTreeMap::new());
/// let text = CoverageResult::new(files).to_string();
///
/// assert_eq!(
///     text,
///     "Total Coverage Pct: 50\n\tfoo.py: 50\n\t\tUncovered Line Numbers: 10"
/// );
/// ```
impl fmt::Display for CoverageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Total Coverage Pct: {}", self.total_coverage_percent())?;
        for file in self.reported_files() {
            write!(f, "\n\t{}: {}", file, self.per_file_coverage_percent(file))?;
            let uncovered = self.uncovered_lines(file);
            if !uncovered.is_empty() {
                write!(f, "\n\t\tUncovered Line Numbers: {}", join_lines(&uncovered))?;
            }
        }
        Ok(())
    }
}

impl CoverageResult {
    /// Render the report as a markdown string.
    ///
    /// # Examples
    ///
    /// ```
    /// use prcov_coverage::result::CoverageResult;
    ///
    /// let md = CoverageResult::default().to_markdown();
    /// assert!(md.contains("# New Code Coverage"));
    /// assert!(md.contains("No added statements"));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# New Code Coverage\n\n");
        let _ = writeln!(
            out,
            "**Total:** {:.1}% ({}/{} added statements covered)\n",
            self.total_coverage_percent(),
            self.covered_count(),
            self.tracked_count()
        );

        let mut files = self.reported_files().peekable();
        if files.peek().is_none() {
            out.push_str("No added statements to evaluate.\n");
            return out;
        }

        out.push_str("| File | Coverage | Statements | Uncovered lines |\n");
        out.push_str("|------|---------:|-----------:|-----------------|\n");
        for file in files {
            let uncovered = self.uncovered_lines(file);
            let uncovered = if uncovered.is_empty() {
                "-".to_string()
            } else {
                join_lines(&uncovered)
            };
            let _ = writeln!(
                out,
                "| `{}` | {:.1}% | {} | {} |",
                file,
                self.per_file_coverage_percent(file),
                self.tracked_lines(file),
                uncovered
            );
        }
        out
    }
}

fn join_lines(lines: &[u32]) -> String {
    lines
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
