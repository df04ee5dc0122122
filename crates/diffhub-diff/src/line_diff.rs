//! Line-level diff: align two file versions and emit hunks with context.
//!
//! Uses the `similar` crate to compute the alignment. Each hunk starts with a
//! `HunkHeader` line in unified-diff form (`@@ -a,b +c,d @@`), followed by the
//! context, deletion, and addition lines in file order.

use similar::{ChangeTag, TextDiff};

use diffhub_types::LineDiff;

use crate::config::LineAlgorithm;

/// Interpret `bytes` as text. Returns `None` for binary content (invalid UTF-8
/// or containing NUL bytes).
pub fn decode_text(bytes: &[u8]) -> Option<&str> {
    if bytes.contains(&0) {
        return None;
    }
    std::str::from_utf8(bytes).ok()
}

/// Compute the line diff between `old` and `new`.
///
/// Returns an empty list when the contents are identical.
pub fn diff_lines(old: &str, new: &str, context: usize, algorithm: LineAlgorithm) -> Vec<LineDiff> {
    if old == new {
        return Vec::new();
    }

    let text_diff = TextDiff::configure()
        .algorithm(algorithm.into())
        .diff_lines(old, new);

    let mut lines = Vec::new();
    for group in text_diff.grouped_ops(context) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_start = first.old_range().start;
        let new_start = first.new_range().start;
        let old_len = last.old_range().end - old_start;
        let new_len = last.new_range().end - new_start;

        lines.push(LineDiff::hunk_header(
            new_start + 1,
            hunk_header(old_start, old_len, new_start, new_len),
        ));

        for op in &group {
            for change in text_diff.iter_changes(op) {
                let text = strip_newline(change.value());
                let line = match change.tag() {
                    ChangeTag::Equal => {
                        LineDiff::context(change.new_index().unwrap_or_default() + 1, text)
                    }
                    ChangeTag::Delete => {
                        LineDiff::deletion(change.old_index().unwrap_or_default() + 1, text)
                    }
                    ChangeTag::Insert => {
                        LineDiff::addition(change.new_index().unwrap_or_default() + 1, text)
                    }
                };
                lines.push(line);
            }
        }
    }
    lines
}

/// Diff of a file that exists on one side only: every line is an addition
/// (`added == true`) or a deletion.
pub fn whole_file(content: &str, added: bool) -> Vec<LineDiff> {
    let body: Vec<&str> = content.lines().collect();
    if body.is_empty() {
        return Vec::new();
    }

    let count = body.len();
    let mut lines = Vec::with_capacity(count + 1);
    if added {
        lines.push(LineDiff::hunk_header(1, hunk_header(0, 0, 0, count)));
        lines.extend(
            body.iter()
                .enumerate()
                .map(|(i, text)| LineDiff::addition(i + 1, *text)),
        );
    } else {
        lines.push(LineDiff::hunk_header(0, hunk_header(0, count, 0, 0)));
        lines.extend(
            body.iter()
                .enumerate()
                .map(|(i, text)| LineDiff::deletion(i + 1, *text)),
        );
    }
    lines
}

/// Unified-diff header. Ranges use 1-based starts; an empty range reports the
/// line before it, as `diff -u` does.
fn hunk_header(old_start: usize, old_len: usize, new_start: usize, new_len: usize) -> String {
    let start = |start: usize, len: usize| if len == 0 { start } else { start + 1 };
    format!(
        "@@ -{},{} +{},{} @@",
        start(old_start, old_len),
        old_len,
        start(new_start, new_len),
        new_len
    )
}

fn strip_newline(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
