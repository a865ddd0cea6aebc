use std::fmt;

use prcov_core::PrcovError;
use serde::{Deserialize, Serialize};

/// A structural pull-request diff: one entry per changed file.
///
/// Mirrors the shape of the Bitbucket Server `pull-requests/{id}/diff`
/// response. Fields the correlation does not need are ignored on input.
///
/// # Examples
///
/// ```
/// use prcov_difflens::model::DiffDocument;
///
/// let json = r#"{"diffs":[{"destination":{"toString":"src/app.py"},"hunks":[]}]}"#;
/// let doc = DiffDocument::from_json(json).unwrap();
/// assert_eq!(doc.diffs.len(), 1);
/// assert_eq!(doc.diffs[0].destination_path(), Some("src/app.py"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffDocument {
    /// Per-file diff entries in server order.
    #[serde(default)]
    pub diffs: Vec<FileDiff>,
}

impl DiffDocument {
    /// Deserialize a diff document from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`PrcovError::Serialization`] if the JSON does not match the
    /// expected shape.
    pub fn from_json(input: &str) -> Result<Self, PrcovError> {
        Ok(serde_json::from_str(input)?)
    }
}

/// The diff of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    /// Path before the change; absent for newly created files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<DiffPath>,
    /// Path after the change; absent for deleted files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<DiffPath>,
    /// Contiguous change regions. Binary files carry none.
    #[serde(default)]
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    /// Repository-relative path in the new version, if the file still exists.
    pub fn destination_path(&self) -> Option<&str> {
        self.destination.as_ref().map(|d| d.path.as_str())
    }
}

impl fmt::Display for FileDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self
            .destination_path()
            .or_else(|| self.source.as_ref().map(|s| s.path.as_str()))
            .unwrap_or("<unknown>");
        write!(f, "{} ({} hunks)", path, self.hunks.len())
    }
}

/// A file path as reported by the diff endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffPath {
    /// Full repository-relative path.
    #[serde(rename = "toString")]
    pub path: String,
}

impl DiffPath {
    /// Wrap a repository-relative path.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// A contiguous change region, split into runs of same-kind lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    /// Line runs in document order.
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// A run of lines sharing one [`SegmentKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Whether the run was added, removed, or left as context.
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    /// Lines in document order.
    #[serde(default)]
    pub lines: Vec<SegmentLine>,
}

/// Classification of a segment.
///
/// # Examples
///
/// ```
/// use prcov_difflens::model::SegmentKind;
///
/// let kind: SegmentKind = serde_json::from_str("\"ADDED\"").unwrap();
/// assert_eq!(kind, SegmentKind::Added);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SegmentKind {
    /// Lines that exist only in the new version.
    Added,
    /// Lines that exist only in the old version.
    Removed,
    /// Unchanged lines shown for context.
    Context,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKind::Added => write!(f, "ADDED"),
            SegmentKind::Removed => write!(f, "REMOVED"),
            SegmentKind::Context => write!(f, "CONTEXT"),
        }
    }
}

/// One line inside a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentLine {
    /// 1-based line number in the old version.
    #[serde(default)]
    pub source: u32,
    /// 1-based line number in the new version. Only meaningful for
    /// added and context lines.
    #[serde(default)]
    pub destination: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const STASH_DIFF: &str = r#"{
        "fromHash": "a1b2c3",
        "toHash": "d4e5f6",
        "contextLines": 0,
        "whitespace": "IGNORE_ALL",
        "diffs": [
            {
                "source": {"components": ["src", "cart.php"], "name": "cart.php", "toString": "src/cart.php"},
                "destination": {"components": ["src", "cart.php"], "name": "cart.php", "toString": "src/cart.php"},
                "hunks": [
                    {
                        "sourceLine": 9, "sourceSpan": 1, "destinationLine": 10, "destinationSpan": 3,
                        "segments": [
                            {"type": "REMOVED", "lines": [{"source": 9, "destination": 10, "line": "old", "truncated": false}], "truncated": false},
                            {"type": "ADDED", "lines": [
                                {"source": 10, "destination": 10, "line": "new", "truncated": false},
                                {"source": 10, "destination": 11, "line": "newer", "truncated": false}
                            ], "truncated": false}
                        ],
                        "truncated": false
                    }
                ],
                "truncated": false
            },
            {
                "source": {"toString": "src/legacy.php"},
                "destination": null,
                "hunks": []
            }
        ],
        "truncated": false
    }"#;

    #[test]
    fn parses_server_payload() {
        let doc = DiffDocument::from_json(STASH_DIFF).unwrap();
        assert_eq!(doc.diffs.len(), 2);

        let first = &doc.diffs[0];
        assert_eq!(first.destination_path(), Some("src/cart.php"));
        assert_eq!(first.hunks.len(), 1);
        let segments = &first.hunks[0].segments;
        assert_eq!(segments[0].kind, SegmentKind::Removed);
        assert_eq!(segments[1].kind, SegmentKind::Added);
        assert_eq!(segments[1].lines[1].destination, 11);
    }

    #[test]
    fn deleted_file_has_no_destination() {
        let doc = DiffDocument::from_json(STASH_DIFF).unwrap();
        assert_eq!(doc.diffs[1].destination_path(), None);
        assert_eq!(doc.diffs[1].to_string(), "src/legacy.php (0 hunks)");
    }

    #[test]
    fn missing_hunks_default_to_empty() {
        let doc =
            DiffDocument::from_json(r#"{"diffs":[{"destination":{"toString":"logo.png"}}]}"#)
                .unwrap();
        assert!(doc.diffs[0].hunks.is_empty());
    }

    #[test]
    fn unknown_segment_type_is_rejected() {
        let json = r#"{"diffs":[{"destination":{"toString":"a.py"},"hunks":[{"segments":[{"type":"MOVED","lines":[]}]}]}]}"#;
        assert!(matches!(
            DiffDocument::from_json(json),
            Err(PrcovError::Serialization(_))
        ));
    }

    #[test]
    fn serializes_wire_field_names() {
        let segment = Segment {
            kind: SegmentKind::Context,
            lines: vec![],
        };
        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["type"], "CONTEXT");

        let path = serde_json::to_value(DiffPath::new("a.py")).unwrap();
        assert_eq!(path["toString"], "a.py");
    }
}
