//! Structured diff output.
//!
//! A [`DiffResult`] is created once per completed request and never mutated
//! afterwards. Totals are derived from the file list at construction time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::RequestId;

/// How a file differs between the two branches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    /// Present only in the `into` branch.
    Added,
    /// Present in both branches with different content.
    Modified,
    /// Present only in the `from` branch.
    Deleted,
}

/// Classification of a single diff line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineType {
    Addition,
    Deletion,
    Context,
    HunkHeader,
}

/// One line of a file diff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDiff {
    /// Deletions carry the old-file line number; additions, context lines and
    /// hunk headers carry the new-file line number (1-based).
    pub line_number: usize,
    pub content: String,
    #[serde(rename = "type")]
    pub line_type: LineType,
}

impl LineDiff {
    pub fn new(line_number: usize, content: impl Into<String>, line_type: LineType) -> Self {
        Self {
            line_number,
            content: content.into(),
            line_type,
        }
    }

    pub fn addition(line_number: usize, content: impl Into<String>) -> Self {
        Self::new(line_number, content, LineType::Addition)
    }

    pub fn deletion(line_number: usize, content: impl Into<String>) -> Self {
        Self::new(line_number, content, LineType::Deletion)
    }

    pub fn context(line_number: usize, content: impl Into<String>) -> Self {
        Self::new(line_number, content, LineType::Context)
    }

    pub fn hunk_header(line_number: usize, content: impl Into<String>) -> Self {
        Self::new(line_number, content, LineType::HunkHeader)
    }
}

/// Changes to a single file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    pub file_path: String,
    pub change_type: ChangeType,
    pub lines: Vec<LineDiff>,
    pub additions: usize,
    pub deletions: usize,
    /// Binary files carry no lines and zero counts.
    #[serde(default)]
    pub is_binary: bool,
}

impl FileDiff {
    /// Build a text file diff, counting additions and deletions from `lines`.
    pub fn new(file_path: impl Into<String>, change_type: ChangeType, lines: Vec<LineDiff>) -> Self {
        let additions = lines
            .iter()
            .filter(|l| l.line_type == LineType::Addition)
            .count();
        let deletions = lines
            .iter()
            .filter(|l| l.line_type == LineType::Deletion)
            .count();
        Self {
            file_path: file_path.into(),
            change_type,
            lines,
            additions,
            deletions,
            is_binary: false,
        }
    }

    /// Build a binary file diff.
    pub fn binary(file_path: impl Into<String>, change_type: ChangeType) -> Self {
        Self {
            file_path: file_path.into(),
            change_type,
            lines: Vec::new(),
            additions: 0,
            deletions: 0,
            is_binary: true,
        }
    }
}

/// The computed outcome of a completed comparison request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub request_id: RequestId,
    pub file_diffs: Vec<FileDiff>,
    pub total_additions: usize,
    pub total_deletions: usize,
    pub total_modifications: usize,
    pub generated_at: DateTime<Utc>,
}

impl DiffResult {
    /// Assemble a result: files are ordered by path (byte-wise ascending) and
    /// the totals are summed over them.
    pub fn new(request_id: RequestId, mut file_diffs: Vec<FileDiff>) -> Self {
        file_diffs.sort_by(|a, b| a.file_path.as_bytes().cmp(b.file_path.as_bytes()));

        let total_additions = file_diffs.iter().map(|f| f.additions).sum();
        let total_deletions = file_diffs.iter().map(|f| f.deletions).sum();
        let total_modifications = file_diffs
            .iter()
            .filter(|f| f.change_type == ChangeType::Modified)
            .count();

        Self {
            request_id,
            file_diffs,
            total_additions,
            total_deletions,
            total_modifications,
            generated_at: Utc::now(),
        }
    }

    /// Returns `true` if no file differs.
    pub fn is_empty(&self) -> bool {
        self.file_diffs.is_empty()
    }

    /// Number of files changed.
    pub fn files_changed(&self) -> usize {
        self.file_diffs.len()
    }

    /// One-line human summary, e.g. `"2 files changed, 3 additions, 1 deletion"`.
    pub fn summary(&self) -> String {
        fn plural(n: usize, word: &str) -> String {
            if n == 1 {
                format!("{n} {word}")
            } else {
                format!("{n} {word}s")
            }
        }
        format!(
            "{} changed, {}, {}",
            plural(self.files_changed(), "file"),
            plural(self.total_additions, "addition"),
            plural(self.total_deletions, "deletion"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modified(path: &str, adds: usize, dels: usize) -> FileDiff {
        let mut lines = vec![LineDiff::hunk_header(1, "@@ -1 +1 @@")];
        lines.extend((0..dels).map(|i| LineDiff::deletion(i + 1, "old")));
        lines.extend((0..adds).map(|i| LineDiff::addition(i + 1, "new")));
        FileDiff::new(path, ChangeType::Modified, lines)
    }

    #[test]
    fn file_diff_counts_lines() {
        let fd = modified("a.txt", 3, 2);
        assert_eq!(fd.additions, 3);
        assert_eq!(fd.deletions, 2);
        assert!(!fd.is_binary);
    }

    #[test]
    fn result_totals_sum_over_files() {
        let added = FileDiff::new(
            "new.txt",
            ChangeType::Added,
            vec![LineDiff::addition(1, "x"), LineDiff::addition(2, "y")],
        );
        let result = DiffResult::new(
            RequestId::new(),
            vec![modified("a.txt", 1, 1), added, modified("b.txt", 0, 4)],
        );
        assert_eq!(result.total_additions, 3);
        assert_eq!(result.total_deletions, 5);
        assert_eq!(result.total_modifications, 2);
    }

    #[test]
    fn result_orders_files_bytewise() {
        let result = DiffResult::new(
            RequestId::new(),
            vec![
                modified("b.txt", 1, 0),
                modified("B.txt", 1, 0),
                modified("a/z.txt", 1, 0),
                modified("a.txt", 1, 0),
            ],
        );
        let paths: Vec<&str> = result.file_diffs.iter().map(|f| f.file_path.as_str()).collect();
        assert_eq!(paths, vec!["B.txt", "a.txt", "a/z.txt", "b.txt"]);
    }

    #[test]
    fn empty_result_has_zero_totals() {
        let result = DiffResult::new(RequestId::new(), Vec::new());
        assert!(result.is_empty());
        assert_eq!(result.total_additions, 0);
        assert_eq!(result.total_deletions, 0);
        assert_eq!(result.total_modifications, 0);
    }

    #[test]
    fn binary_file_has_no_lines() {
        let fd = FileDiff::binary("logo.png", ChangeType::Modified);
        assert!(fd.is_binary);
        assert!(fd.lines.is_empty());
        assert_eq!(fd.additions + fd.deletions, 0);
    }

    #[test]
    fn summary_pluralizes() {
        let result = DiffResult::new(RequestId::new(), vec![modified("a.txt", 1, 2)]);
        assert_eq!(result.summary(), "1 file changed, 1 addition, 2 deletions");
    }

    #[test]
    fn line_type_serializes_as_type() {
        let line = LineDiff::addition(4, "hello");
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["type"], "Addition");
        assert_eq!(json["lineNumber"], 4);
    }
}
