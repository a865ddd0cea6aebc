use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use prcov_core::{CoverageConfig, PrcovError};

/// Classification of a Clover `line` record.
///
/// # Examples
///
/// ```
/// use prcov_coverage::clover::LineKind;
///
/// let kind = LineKind::from_type_attr("stmt", "stmt");
/// assert!(kind.is_statement());
/// assert!(!LineKind::from_type_attr("method", "stmt").is_statement());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// An executable statement; the only kind that counts toward coverage.
    Statement,
    /// Anything else (`method`, `cond`, class markers), with the raw tag.
    Other(String),
}

impl LineKind {
    /// Classify a raw `type` attribute against the configured statement tag.
    pub fn from_type_attr(raw: &str, statement_type: &str) -> Self {
        if raw == statement_type {
            LineKind::Statement
        } else {
            LineKind::Other(raw.to_string())
        }
    }

    /// Returns `true` for executable statements.
    pub fn is_statement(&self) -> bool {
        matches!(self, LineKind::Statement)
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineKind::Statement => write!(f, "statement"),
            LineKind::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// One `line` element of a Clover report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// 1-based line number.
    pub num: u32,
    /// Statement or other marker.
    pub kind: LineKind,
    /// Times the line executed during the test run.
    pub count: u64,
}

impl LineRecord {
    /// Returns `true` if the line executed at least once.
    pub fn is_covered(&self) -> bool {
        self.count > 0
    }
}

/// A Clover statement-coverage report, indexed by file path and line number.
///
/// The report is parsed once and every `file` element anywhere in the tree
/// (Clover nests them under `project` and, optionally, `package`) is folded
/// into a `path -> line -> record` map, so each lookup is a pair of hash
/// probes instead of a document query.
///
/// When the report holds several records for the same path and line, the
/// first one in document order wins and later ones are ignored.
///
/// # Examples
///
/// ```
/// use prcov_core::CoverageConfig;
/// use prcov_coverage::clover::CoverageDocument;
///
/// let xml = r#"<coverage><project>
///   <file name="/repo/foo.py">
///     <line num="10" type="stmt" count="0"/>
///     <line num="12" type="stmt" count="3"/>
///   </file>
/// </project></coverage>"#;
/// let doc = CoverageDocument::parse(xml, &CoverageConfig::default()).unwrap();
/// assert!(!doc.line("/repo/foo.py", 10).unwrap().is_covered());
/// assert!(doc.line("/repo/foo.py", 12).unwrap().is_covered());
/// assert!(doc.line("/repo/foo.py", 11).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoverageDocument {
    files: HashMap<String, HashMap<u32, LineRecord>>,
    line_count: usize,
}

impl CoverageDocument {
    /// Parse a Clover XML report.
    ///
    /// # Errors
    ///
    /// Returns [`PrcovError::Parse`] if the XML is not well-formed, or if a
    /// `line` element has a missing or non-positive `num`, or a `count`
    /// that is not a non-negative integer. Nothing is kept from a report
    /// that fails to parse.
    pub fn parse(xml: &str, config: &CoverageConfig) -> Result<Self, PrcovError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let tree = roxmltree::Document::parse_with_options(xml, options)
            .map_err(|e| PrcovError::Parse(format!("malformed coverage report: {e}")))?;

        let mut files: HashMap<String, HashMap<u32, LineRecord>> = HashMap::new();
        let mut line_count = 0;
        let mut duplicates = 0;

        for file in tree.descendants().filter(|n| n.has_tag_name("file")) {
            let Some(name) = file.attribute("name") else {
                tracing::debug!(
                    position = %tree.text_pos_at(file.range().start),
                    "skipping file element without a name"
                );
                continue;
            };
            let lines = files.entry(name.to_string()).or_default();

            for line in file.children().filter(|n| n.has_tag_name("line")) {
                let record = parse_line(&tree, line, &config.statement_type)?;
                line_count += 1;
                if lines.contains_key(&record.num) {
                    duplicates += 1;
                    continue;
                }
                lines.insert(record.num, record);
            }
        }

        if duplicates > 0 {
            tracing::warn!(
                duplicates,
                "coverage report repeats line records; keeping the first of each"
            );
        }
        tracing::debug!(files = files.len(), lines = line_count, "indexed coverage report");

        Ok(Self { files, line_count })
    }

    /// Read and parse a Clover XML report from disk.
    ///
    /// # Errors
    ///
    /// Returns [`PrcovError::FileNotFound`] if `path` does not exist,
    /// [`PrcovError::Io`] if it cannot be read, or [`PrcovError::Parse`]
    /// as for [`CoverageDocument::parse`].
    pub fn from_file(path: &Path, config: &CoverageConfig) -> Result<Self, PrcovError> {
        if !path.exists() {
            return Err(PrcovError::FileNotFound(path.to_path_buf()));
        }
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml, config)
    }

    /// Look up the record for `path` at `num`.
    ///
    /// `path` must match the report's `file[@name]` exactly.
    pub fn line(&self, path: &str, num: u32) -> Option<&LineRecord> {
        self.files.get(path)?.get(&num)
    }

    /// Whether the report has a `file` element named `path`.
    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Number of distinct file names in the report.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of `line` elements read, duplicates included.
    pub fn line_count(&self) -> usize {
        self.line_count
    }
}

fn parse_line(
    tree: &roxmltree::Document<'_>,
    node: roxmltree::Node<'_, '_>,
    statement_type: &str,
) -> Result<LineRecord, PrcovError> {
    let position = || tree.text_pos_at(node.range().start);

    let num = node
        .attribute("num")
        .ok_or_else(|| PrcovError::Parse(format!("line without num at {}", position())))?;
    let num: u32 = num
        .trim()
        .parse()
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| PrcovError::Parse(format!("invalid line num '{num}' at {}", position())))?;

    let count = match node.attribute("count") {
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            PrcovError::Parse(format!("invalid line count '{raw}' at {}", position()))
        })?,
        None => 0,
    };

    let kind = LineKind::from_type_attr(node.attribute("type").unwrap_or(""), statement_type);

    Ok(LineRecord { num, kind, count })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Result<CoverageDocument, PrcovError> {
        CoverageDocument::parse(xml, &CoverageConfig::default())
    }

    const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<coverage generated="1700000000">
  <project timestamp="1700000000">
    <package name="App">
      <file name="/srv/app/src/Cart.php">
        <class name="Cart" namespace="App">
          <metrics methods="2" coveredmethods="1" statements="3" coveredstatements="2"/>
        </class>
        <line num="5" type="method" name="add" visibility="public" complexity="1" crap="1" count="4"/>
        <line num="7" type="stmt" count="4"/>
        <line num="8" type="stmt" count="0"/>
        <line num="9" type="cond" truecount="1" falsecount="0"/>
        <metrics loc="20" ncloc="15" statements="3" coveredstatements="2"/>
      </file>
    </package>
    <file name="/srv/app/bootstrap.php">
      <line num="1" type="stmt" count="1"/>
    </file>
  </project>
</coverage>"#;

    #[test]
    fn indexes_files_at_any_depth() {
        let doc = parse(REPORT).unwrap();
        assert_eq!(doc.file_count(), 2);
        assert_eq!(doc.line_count(), 5);
        assert!(doc.contains_file("/srv/app/src/Cart.php"));
        assert!(doc.contains_file("/srv/app/bootstrap.php"));
    }

    #[test]
    fn classifies_lines() {
        let doc = parse(REPORT).unwrap();
        let method = doc.line("/srv/app/src/Cart.php", 5).unwrap();
        assert_eq!(method.kind, LineKind::Other("method".into()));
        assert_eq!(method.count, 4);

        let stmt = doc.line("/srv/app/src/Cart.php", 7).unwrap();
        assert!(stmt.kind.is_statement());
        assert!(stmt.is_covered());

        assert!(!doc.line("/srv/app/src/Cart.php", 8).unwrap().is_covered());
    }

    #[test]
    fn missing_count_defaults_to_zero() {
        let doc = parse(REPORT).unwrap();
        let cond = doc.line("/srv/app/src/Cart.php", 9).unwrap();
        assert_eq!(cond.count, 0);
        assert_eq!(cond.kind.to_string(), "cond");
    }

    #[test]
    fn first_duplicate_in_document_order_wins() {
        let xml = r#"<coverage><project>
            <file name="a.py">
                <line num="3" type="stmt" count="0"/>
                <line num="3" type="stmt" count="9"/>
            </file>
            <file name="a.py">
                <line num="3" type="method" count="1"/>
                <line num="4" type="stmt" count="2"/>
            </file>
        </project></coverage>"#;
        let doc = parse(xml).unwrap();
        let line = doc.line("a.py", 3).unwrap();
        assert_eq!(line.count, 0);
        assert!(line.kind.is_statement());
        assert_eq!(doc.line("a.py", 4).unwrap().count, 2);
        assert_eq!(doc.file_count(), 1);
        assert_eq!(doc.line_count(), 4);
    }

    #[test]
    fn custom_statement_type() {
        let config = CoverageConfig {
            statement_type: "statement".into(),
        };
        let xml = r#"<coverage><file name="x"><line num="1" type="statement" count="1"/><line num="2" type="stmt" count="1"/></file></coverage>"#;
        let doc = CoverageDocument::parse(xml, &config).unwrap();
        assert!(doc.line("x", 1).unwrap().kind.is_statement());
        assert!(!doc.line("x", 2).unwrap().kind.is_statement());
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let result = parse("<coverage><project><file name=\"a\"></project></coverage>");
        assert!(matches!(result, Err(PrcovError::Parse(_))));

        let result = parse("not xml at all");
        assert!(matches!(result, Err(PrcovError::Parse(_))));
    }

    #[test]
    fn negative_count_is_rejected() {
        let xml = r#"<coverage><file name="a"><line num="1" type="stmt" count="-1"/></file></coverage>"#;
        let err = parse(xml).unwrap_err();
        assert!(err.to_string().contains("invalid line count '-1'"));
    }

    #[test]
    fn bad_line_number_is_rejected() {
        for num in ["0", "ten", ""] {
            let xml = format!(
                r#"<coverage><file name="a"><line num="{num}" type="stmt" count="1"/></file></coverage>"#
            );
            assert!(matches!(parse(&xml), Err(PrcovError::Parse(_))), "num={num:?}");
        }

        let xml = r#"<coverage><file name="a"><line type="stmt" count="1"/></file></coverage>"#;
        assert!(matches!(parse(xml), Err(PrcovError::Parse(_))));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = CoverageDocument::from_file(
            Path::new("/nonexistent/clover.xml"),
            &CoverageConfig::default(),
        );
        assert!(matches!(result, Err(PrcovError::FileNotFound(_))));
    }
}
