use prcov_core::PrcovError;

use crate::model::{DiffDocument, DiffPath, FileDiff, Hunk, Segment, SegmentKind, SegmentLine};

const DEV_NULL: &str = "/dev/null";

/// Parse a unified diff string (as produced by `git diff`) into a [`DiffDocument`].
///
/// Consecutive `+`, `-` and ` ` lines inside a hunk become `ADDED`,
/// `REMOVED` and `CONTEXT` segments, with source and destination line
/// numbers tracked from the hunk header. New files get no source path,
/// deleted files no destination path, and binary files are skipped.
///
/// # Errors
///
/// Returns [`PrcovError::Parse`] if a hunk header is malformed.
///
/// # Examples
///
/// ```
/// use prcov_difflens::parser::parse_unified_diff;
/// use prcov_difflens::model::SegmentKind;
///
/// let diff = "--- a/hello.py\n+++ b/hello.py\n@@ -1,2 +1,3 @@\n def main():\n+    print(1)\n     pass\n";
/// let doc = parse_unified_diff(diff).unwrap();
/// assert_eq!(doc.diffs.len(), 1);
/// let segments = &doc.diffs[0].hunks[0].segments;
/// assert_eq!(segments[1].kind, SegmentKind::Added);
/// assert_eq!(segments[1].lines[0].destination, 2);
/// ```
pub fn parse_unified_diff(input: &str) -> Result<DiffDocument, PrcovError> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<PendingFile> = None;
    let mut current_hunk: Option<PendingHunk> = None;

    for line in input.lines() {
        if let Some(header) = line.strip_prefix("diff --git ") {
            flush_hunk(&mut current, &mut current_hunk);
            if let Some(file) = current.take() {
                file.finish_into(&mut files);
            }
            current = Some(PendingFile::from_git_header(header));
            continue;
        }

        // Patches without a "diff --git" line start directly at the "---" header,
        // and so does every further file once the previous one has hunks.
        if line.starts_with("--- ")
            && current_hunk.is_none()
            && current.as_ref().map_or(true, |file| !file.hunks.is_empty())
        {
            if let Some(file) = current.take() {
                file.finish_into(&mut files);
            }
            current = Some(PendingFile::default());
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if line.starts_with("Binary files ") && line.ends_with(" differ") {
            file.is_binary = true;
            continue;
        }

        if current_hunk.is_none() {
            if line.starts_with("new file mode") {
                file.is_new_file = true;
                continue;
            }
            if line.starts_with("deleted file mode") {
                file.is_deleted_file = true;
                continue;
            }
            if let Some(path) = line.strip_prefix("rename from ") {
                file.old_path = parse_path(path);
                continue;
            }
            if let Some(path) = line.strip_prefix("rename to ") {
                file.new_path = parse_path(path);
                continue;
            }
            if let Some(path) = line.strip_prefix("--- ") {
                file.old_path = parse_path(path);
                if file.old_path == DEV_NULL {
                    file.is_new_file = true;
                }
                continue;
            }
            if let Some(path) = line.strip_prefix("+++ ") {
                file.new_path = parse_path(path);
                if file.new_path == DEV_NULL {
                    file.is_deleted_file = true;
                }
                continue;
            }
        }

        if line.starts_with("@@ ") {
            flush_hunk(&mut current, &mut current_hunk);
            let (old, new) = parse_hunk_header(line)?;
            current_hunk = Some(PendingHunk::new(old, new));
            continue;
        }

        if line == "\\ No newline at end of file" {
            continue;
        }

        let Some(hunk) = current_hunk.as_mut() else {
            continue;
        };
        match line.as_bytes().first() {
            Some(b'+') => hunk.push(SegmentKind::Added, line)?,
            Some(b'-') => hunk.push(SegmentKind::Removed, line)?,
            Some(b' ') => hunk.push(SegmentKind::Context, line)?,
            // git emits a bare empty line for blank context lines in some modes
            None => hunk.push(SegmentKind::Context, line)?,
            _ => {}
        }
        // A hunk ends once the header's line counts are used up; whatever
        // follows ("--- " included) is a header again.
        if hunk.is_complete() {
            flush_hunk(&mut current, &mut current_hunk);
        }
    }

    flush_hunk(&mut current, &mut current_hunk);
    if let Some(file) = current.take() {
        file.finish_into(&mut files);
    }

    tracing::debug!(files = files.len(), "parsed unified diff");
    Ok(DiffDocument { diffs: files })
}

#[derive(Default)]
struct PendingFile {
    old_path: String,
    new_path: String,
    hunks: Vec<Hunk>,
    is_new_file: bool,
    is_deleted_file: bool,
    is_binary: bool,
}

impl PendingFile {
    fn from_git_header(header: &str) -> Self {
        let (old_path, new_path) = header
            .split_once(" b/")
            .map(|(old, new)| (parse_path(old), new.trim_matches('"').to_string()))
            .unwrap_or_default();
        Self {
            old_path,
            new_path,
            ..Self::default()
        }
    }

    fn finish_into(self, files: &mut Vec<FileDiff>) {
        if self.is_binary {
            return;
        }
        let source = (!self.is_new_file && !self.old_path.is_empty())
            .then(|| DiffPath::new(self.old_path));
        let destination = (!self.is_deleted_file && !self.new_path.is_empty())
            .then(|| DiffPath::new(self.new_path));
        if source.is_none() && destination.is_none() {
            return;
        }
        files.push(FileDiff {
            source,
            destination,
            hunks: self.hunks,
        });
    }
}

/// One side of a hunk header, `-start,count` or `+start,count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkRange {
    start: u32,
    count: u32,
}

struct PendingHunk {
    hunk: Hunk,
    old_line: u32,
    new_line: u32,
    old_left: u32,
    new_left: u32,
}

impl PendingHunk {
    fn new(old: HunkRange, new: HunkRange) -> Self {
        Self {
            hunk: Hunk::default(),
            old_line: old.start,
            new_line: new.start,
            old_left: old.count,
            new_left: new.count,
        }
    }

    fn is_complete(&self) -> bool {
        self.old_left == 0 && self.new_left == 0
    }

    fn push(&mut self, kind: SegmentKind, raw: &str) -> Result<(), PrcovError> {
        let line = SegmentLine {
            source: self.old_line,
            destination: self.new_line,
        };
        let advance = |n: u32| {
            n.checked_add(1)
                .ok_or_else(|| PrcovError::Parse(format!("line number out of range at: {raw}")))
        };
        match kind {
            SegmentKind::Added => {
                self.new_line = advance(self.new_line)?;
                self.new_left = self.new_left.saturating_sub(1);
            }
            SegmentKind::Removed => {
                self.old_line = advance(self.old_line)?;
                self.old_left = self.old_left.saturating_sub(1);
            }
            SegmentKind::Context => {
                self.old_line = advance(self.old_line)?;
                self.new_line = advance(self.new_line)?;
                self.old_left = self.old_left.saturating_sub(1);
                self.new_left = self.new_left.saturating_sub(1);
            }
        }

        match self.hunk.segments.last_mut() {
            Some(segment) if segment.kind == kind => segment.lines.push(line),
            _ => self.hunk.segments.push(Segment {
                kind,
                lines: vec![line],
            }),
        }
        Ok(())
    }
}

fn flush_hunk(current: &mut Option<PendingFile>, hunk: &mut Option<PendingHunk>) {
    if let Some(h) = hunk.take() {
        if let Some(file) = current.as_mut() {
            file.hunks.push(h.hunk);
        }
    }
}

fn parse_path(raw: &str) -> String {
    // git appends a tab and timestamp to ---/+++ lines in some modes
    let raw = raw.split('\t').next().unwrap_or(raw);
    let normalized = raw.trim_matches('"');

    if normalized == DEV_NULL {
        return DEV_NULL.to_string();
    }

    normalized
        .strip_prefix("a/")
        .or_else(|| normalized.strip_prefix("b/"))
        .unwrap_or(normalized)
        .to_string()
}

fn parse_hunk_header(line: &str) -> Result<(HunkRange, HunkRange), PrcovError> {
    let inner = line
        .strip_prefix("@@ ")
        .and_then(|s| {
            let end = s.find(" @@")?;
            Some(&s[..end])
        })
        .ok_or_else(|| PrcovError::Parse(format!("invalid hunk header: {line}")))?;

    let Some((old, new)) = inner.split_once(' ') else {
        return Err(PrcovError::Parse(format!("invalid hunk header: {line}")));
    };

    let old = old
        .strip_prefix('-')
        .ok_or_else(|| PrcovError::Parse(format!("invalid old range in hunk: {line}")))?;
    let new = new
        .strip_prefix('+')
        .ok_or_else(|| PrcovError::Parse(format!("invalid new range in hunk: {line}")))?;

    Ok((parse_range(old, line)?, parse_range(new, line)?))
}

fn parse_range(range: &str, context: &str) -> Result<HunkRange, PrcovError> {
    let (start, count) = match range.split_once(',') {
        Some((start, count)) => (start, Some(count)),
        None => (range, None),
    };
    let count = match count {
        Some(count) => count
            .parse::<u32>()
            .map_err(|_| PrcovError::Parse(format!("invalid range count in: {context}")))?,
        None => 1,
    };
    let start: u32 = start
        .parse()
        .map_err(|_| PrcovError::Parse(format!("invalid range number in: {context}")))?;
    if start.checked_add(count).is_none() {
        return Err(PrcovError::Parse(format!("hunk range out of bounds in: {context}")));
    }
    Ok(HunkRange { start, count })
}
