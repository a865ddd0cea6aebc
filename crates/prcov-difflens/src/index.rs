use std::collections::{BTreeMap, BTreeSet};

use crate::model::{DiffDocument, SegmentKind};

/// Added line numbers per destination file.
///
/// Only `ADDED` segments contribute; removed and context lines never appear.
/// Every file that still exists after the change keeps an entry, even when
/// it gained no lines, so callers can tell "present with nothing to check"
/// apart from "not in the diff".
///
/// # Examples
///
/// ```
/// use prcov_difflens::index::AddedLineSet;
/// use prcov_difflens::model::DiffDocument;
///
/// let json = r#"{"diffs":[{"destination":{"toString":"foo.py"},"hunks":[
///     {"segments":[
///         {"type":"CONTEXT","lines":[{"destination":9}]},
///         {"type":"ADDED","lines":[{"destination":10},{"destination":12}]}
///     ]}
/// ]}]}"#;
/// let added = AddedLineSet::from_diff(&DiffDocument::from_json(json).unwrap());
/// let lines: Vec<u32> = added.lines("foo.py").unwrap().iter().copied().collect();
/// assert_eq!(lines, vec![10, 12]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddedLineSet {
    files: BTreeMap<String, BTreeSet<u32>>,
}

impl AddedLineSet {
    /// Extract the added lines of every file in `diff`.
    ///
    /// Entries without a destination (deleted files) are skipped since they
    /// cannot contain added lines. A path listed more than once merges into
    /// a single set.
    pub fn from_diff(diff: &DiffDocument) -> Self {
        let mut files: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();

        for file in &diff.diffs {
            let Some(path) = file.destination_path() else {
                continue;
            };
            let lines = files.entry(path.to_string()).or_default();
            for hunk in &file.hunks {
                for segment in &hunk.segments {
                    if segment.kind != SegmentKind::Added {
                        continue;
                    }
                    lines.extend(segment.lines.iter().map(|l| l.destination));
                }
            }
        }

        tracing::debug!(
            files = files.len(),
            added_lines = files.values().map(BTreeSet::len).sum::<usize>(),
            "indexed added lines"
        );

        Self { files }
    }

    /// Paths in lexicographic order, paired with their added lines.
    pub fn files(&self) -> impl Iterator<Item = (&str, &BTreeSet<u32>)> {
        self.files.iter().map(|(path, lines)| (path.as_str(), lines))
    }

    /// Added lines for `path`, or `None` if the file is not in the diff.
    pub fn lines(&self, path: &str) -> Option<&BTreeSet<u32>> {
        self.files.get(path)
    }

    /// Whether `path` appears in the diff.
    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Number of files, including those with no added lines.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if the diff touched no surviving file.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total added lines across all files.
    pub fn total_lines(&self) -> usize {
        self.files.values().map(BTreeSet::len).sum()
    }

    /// Keep only the files for which `keep` returns `true`.
    pub fn retain_files(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.files.retain(|path, _| keep(path));
    }
}

impl FromIterator<(String, BTreeSet<u32>)> for AddedLineSet {
    fn from_iter<I: IntoIterator<Item = (String, BTreeSet<u32>)>>(iter: I) -> Self {
        let mut files: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
        for (path, lines) in iter {
            files.entry(path).or_default().extend(lines);
        }
        Self { files }
    }
}
